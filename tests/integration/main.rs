//! Integration tests for Page-Lens
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! analyzer, the batch orchestrator and the service end-to-end.

mod analyze_tests;
mod batch_tests;
mod deep_tests;
mod storage_tests;

use page_lens::config::{AnalyzerConfig, BatchConfig, CheckerConfig, Config, LimitsConfig, StorageConfig};
use wiremock::MockServer;

/// Creates a test configuration with fast governors and short timeouts
pub fn test_config(db_path: &str) -> Config {
    Config {
        analyzer: AnalyzerConfig {
            request_timeout_secs: 5,
            probe_timeout_ms: 1000,
            user_agent: "PageLensTest/1.0".to_string(),
            freshness_window_secs: 3600,
            probe_links_in_deep: true,
        },
        single: CheckerConfig {
            probe_workers: 4,
            probe_queue_capacity: 2,
        },
        batch: BatchConfig {
            max_concurrent_analyses: 3,
            url_queue_capacity: 2,
            probe_workers: 4,
            probe_queue_capacity: 2,
            probe_timeout_ms: 1000,
        },
        limits: LimitsConfig {
            requests_per_second: 1000,
            burst: 100,
            ..LimitsConfig::default()
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
        },
    }
}

/// Same mock server reached through a different host name
///
/// `127.0.0.1` and `localhost` are distinct hosts, so links written with
/// this base are external to pages served from `server.uri()`.
pub fn other_host_uri(server: &MockServer) -> String {
    format!("http://localhost:{}", server.address().port())
}
