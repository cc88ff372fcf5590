//! Output module for rendering analyses and reports
//!
//! This module handles:
//! - Console rendering of analyses, deep analyses and batch reports
//! - Markdown report files for a single analysis
//! - Printing aggregate statistics

mod console;
mod markdown;
pub mod stats;

pub use console::{
    format_analysis, format_batch_report, format_deep_analysis, print_analysis,
    print_batch_report, print_deep_analysis,
};
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{format_statistics, print_statistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Renders a flag as yes/no
pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Renders an empty string as a dash
pub(crate) fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
