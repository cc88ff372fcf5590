//! Page-Lens main entry point
//!
//! This is the command-line interface for the Page-Lens web page analyzer.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use page_lens::config::{load_config_with_hash, Config};
use page_lens::output::{
    generate_markdown_report, print_analysis, print_batch_report, print_deep_analysis,
    print_statistics,
};
use page_lens::storage::open_storage;
use page_lens::{Analyzer, AnalysisService};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Page-Lens: a web page analyzer
///
/// Page-Lens fetches pages, extracts their structure and content signals,
/// and checks every link they contain. Results are stored in SQLite.
#[derive(Parser, Debug)]
#[command(name = "page-lens")]
#[command(version = "1.0.0")]
#[command(about = "A web page analyzer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one page and store the result
    Analyze {
        url: String,

        /// Owner recorded with the analysis
        #[arg(long)]
        owner: Option<String>,

        /// Skip link reachability probes
        #[arg(long)]
        no_probe: bool,

        /// Write a markdown report to this path
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Analyze many pages and store every success
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Owner recorded with every analysis
        #[arg(long)]
        owner: Option<String>,

        /// Skip link reachability probes
        #[arg(long)]
        no_probe: bool,
    },

    /// Show a stored analysis
    Show { id: i64 },

    /// Run (or load the cached) deep analysis of a stored analysis
    Deep {
        id: i64,

        /// Write a markdown report to this path
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// List the most recent analyses
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List the most recent analyses of one owner
    Mine {
        owner: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show statistics from the database
    Stats,

    /// Validate the configuration and print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("reading {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_lens=info,warn"),
            1 => EnvFilter::new("page_lens=debug,info"),
            2 => EnvFilter::new("page_lens=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels the returned token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight work");
            trigger.cancel();
        }
    });
    cancel
}

fn build_service(config: Config, no_probe: bool) -> anyhow::Result<AnalysisService> {
    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("opening database {}", config.storage.database_path))?;
    let analyzer = if no_probe {
        Analyzer::without_link_checks(config)?
    } else {
        Analyzer::new(config)?
    };
    Ok(AnalysisService::new(analyzer, storage))
}

async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::CheckConfig => {
            handle_check_config(&config);
            Ok(())
        }
        Command::Analyze {
            url,
            owner,
            no_probe,
            report,
        } => {
            let service = build_service(config, no_probe)?;
            let cancel = cancel_on_ctrl_c();
            let result = service
                .analyze_and_store(&cancel, &url, owner.as_deref())
                .await?;
            print_analysis(&result);
            if let Some(path) = report {
                generate_markdown_report(&result, None, &path)?;
                println!("\nReport written to: {}", path.display());
            }
            Ok(())
        }
        Command::Batch {
            urls,
            owner,
            no_probe,
        } => {
            let service = build_service(config, no_probe)?;
            let cancel = cancel_on_ctrl_c();
            let report = service
                .analyze_batch_and_store(&cancel, urls, owner.as_deref())
                .await?;
            print_batch_report(&report);
            Ok(())
        }
        Command::Show { id } => {
            let service = build_service(config, true)?;
            match service.get_analysis(id)? {
                Some(result) => print_analysis(&result),
                None => bail!("analysis {} not found", id),
            }
            Ok(())
        }
        Command::Deep { id, report } => {
            let service = build_service(config, false)?;
            let cancel = cancel_on_ctrl_c();
            let Some(deep) = service.deep_analysis(&cancel, id).await? else {
                bail!("analysis {} not found", id);
            };
            print_deep_analysis(&deep);
            if let Some(path) = report {
                if let Some(result) = service.get_analysis(id)? {
                    generate_markdown_report(&result, Some(&deep), &path)?;
                    println!("\nReport written to: {}", path.display());
                }
            }
            Ok(())
        }
        Command::Recent { limit } => {
            let service = build_service(config, true)?;
            print_listing(&service.recent(limit)?);
            Ok(())
        }
        Command::Mine { owner, limit } => {
            let service = build_service(config, true)?;
            print_listing(&service.owner_analyses(&owner, limit)?);
            Ok(())
        }
        Command::Stats => {
            let service = build_service(config, true)?;
            println!("Database: {}\n", service.analyzer().config().storage.database_path);
            print_statistics(&service.stats()?);
            Ok(())
        }
    }
}

fn print_listing(results: &[page_lens::AnalysisResult]) {
    if results.is_empty() {
        println!("No analyses found");
        return;
    }
    for result in results {
        println!(
            "{:>6}  {}  {}  {}",
            result.id.map(|id| format!("#{}", id)).unwrap_or_default(),
            result.created_at.format("%Y-%m-%d %H:%M"),
            result.url,
            result.title
        );
    }
}

/// Prints the effective configuration
fn handle_check_config(config: &Config) {
    println!("=== Page-Lens Configuration ===\n");

    println!("Analyzer:");
    println!("  Request timeout: {}s", config.analyzer.request_timeout_secs);
    println!("  Probe timeout: {}ms", config.analyzer.probe_timeout_ms);
    println!("  User agent: {}", config.analyzer.user_agent);
    println!(
        "  Deep freshness window: {}s",
        config.analyzer.freshness_window_secs
    );
    println!(
        "  Probe links in deep analysis: {}",
        config.analyzer.probe_links_in_deep
    );

    println!("\nSingle-page checker:");
    println!("  Probe workers: {}", config.single.probe_workers);
    println!("  Probe queue capacity: {}", config.single.probe_queue_capacity);

    println!("\nBatch:");
    println!(
        "  Max concurrent analyses: {}",
        config.batch.max_concurrent_analyses
    );
    println!("  URL queue capacity: {}", config.batch.url_queue_capacity);
    println!("  Probe workers: {}", config.batch.probe_workers);
    println!("  Probe queue capacity: {}", config.batch.probe_queue_capacity);
    println!("  Probe timeout: {}ms", config.batch.probe_timeout_ms);

    println!("\nLimits:");
    println!(
        "  Rate: {} req/s (burst {})",
        config.limits.requests_per_second, config.limits.burst
    );
    println!(
        "  Memory budget: {} MB (x{} overhead)",
        config.limits.max_memory_mb, config.limits.overhead_multiplier
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
}
