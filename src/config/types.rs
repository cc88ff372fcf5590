use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Page-Lens
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub single: CheckerConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Primary fetch and deep-analysis behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalyzerConfig {
    /// Timeout for the primary page fetch (seconds)
    pub request_timeout_secs: u64,

    /// Timeout for a single-page link probe (milliseconds)
    pub probe_timeout_ms: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// How long a stored deep analysis stays fresh (seconds)
    pub freshness_window_secs: u64,

    /// Whether deep analysis probes links to count broken ones
    pub probe_links_in_deep: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            probe_timeout_ms: 3000,
            user_agent: "WebAnalyzer/1.0".to_string(),
            freshness_window_secs: 3600,
            probe_links_in_deep: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }
}

/// Link-checker pool sizing for single-page analysis
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckerConfig {
    /// Number of probe workers draining the link queue
    pub probe_workers: usize,

    /// Capacity of the pending-probe queue before producers block
    pub probe_queue_capacity: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            probe_workers: 20,
            probe_queue_capacity: 100,
        }
    }
}

/// Batch orchestrator sizing and its own checker policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BatchConfig {
    /// Number of pages analyzed concurrently
    pub max_concurrent_analyses: usize,

    /// Capacity of the pending-URL queue
    pub url_queue_capacity: usize,

    /// Number of probe workers per page
    pub probe_workers: usize,

    /// Capacity of the pending-probe queue per page
    pub probe_queue_capacity: usize,

    /// Timeout for a batch link probe (milliseconds)
    pub probe_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: 10,
            url_queue_capacity: 100,
            probe_workers: 20,
            probe_queue_capacity: 100,
            probe_timeout_ms: 2000,
        }
    }
}

impl BatchConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Process-wide governors shared by every analysis
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LimitsConfig {
    /// Token refill rate for outbound probes and batch fetches
    pub requests_per_second: u32,

    /// Token bucket capacity
    pub burst: u32,

    /// Memory budget for concurrently admitted work (megabytes)
    pub max_memory_mb: u64,

    /// Parsing overhead applied to every byte estimate
    pub overhead_multiplier: u64,

    /// Content length assumed when a response does not declare one (bytes)
    pub assumed_content_length: u64,

    /// Footprint assumed for one HEAD probe before the multiplier (bytes)
    pub probe_cost_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst: 1,
            max_memory_mb: 1024,
            overhead_multiplier: 5,
            assumed_content_length: 1024 * 1024,
            probe_cost_bytes: 16 * 1024,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./page-lens.db".to_string(),
        }
    }
}
