//! Page-Lens: a web page analyzer
//!
//! This crate fetches a page, walks its markup once to collect structural and
//! content signals, and probes every discovered link under shared rate and
//! memory governors. Batches of pages run through a second, fixed-size worker
//! pool built on the same engine.

pub mod analyzer;
pub mod config;
pub mod models;
pub mod output;
pub mod service;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Page-Lens operations
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error for {url}: status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("{failed} batch entries failed ({succeeded} succeeded): {summary}")]
    PartialBatchFailure {
        succeeded: usize,
        failed: usize,
        summary: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl AnalyzerError {
    /// Returns true if this error was caused by cancellation of the caller's token
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true for errors raised while talking to the remote host
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Empty URL")]
    Empty,
}

/// Result type alias for Page-Lens operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

// Re-export commonly used types
pub use analyzer::{Analyzer, BatchReport};
pub use config::Config;
pub use models::{AnalysisResult, DeepAnalysisResult};
pub use service::AnalysisService;
pub use url::{classify_link, normalize_target, LinkClass, LinkResolver};
