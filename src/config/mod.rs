//! Configuration module for Page-Lens
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use page_lens::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("page-lens.toml")).unwrap();
//! println!("Probe workers: {}", config.single.probe_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AnalyzerConfig, BatchConfig, CheckerConfig, Config, LimitsConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
