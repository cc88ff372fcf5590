//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::models::{AnalysisResult, DeepAnalysisResult};
use crate::storage::Stats;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This is the persistence capability the analysis service consumes. Lookups
/// return `Ok(None)` for unknown identifiers.
pub trait Storage {
    // ===== Analyses =====

    /// Saves an analysis and returns its new identifier
    ///
    /// The `id` field of `result` is ignored.
    fn save_analysis(&mut self, result: &AnalysisResult) -> StorageResult<i64>;

    /// Saves several analyses atomically, returning their identifiers in order
    ///
    /// Either every analysis is stored or none is.
    fn save_analyses(&mut self, results: &[AnalysisResult]) -> StorageResult<Vec<i64>>;

    /// Gets an analysis by ID
    fn get_analysis(&self, id: i64) -> StorageResult<Option<AnalysisResult>>;

    /// Most recent analyses first
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum rows, already clamped by the caller
    fn recent_analyses(&self, limit: usize) -> StorageResult<Vec<AnalysisResult>>;

    /// Most recent analyses of one owner first
    fn owner_analyses(&self, owner_id: &str, limit: usize) -> StorageResult<Vec<AnalysisResult>>;

    // ===== Deep Analyses =====

    /// Inserts or replaces the deep analysis of `result.analysis_id`
    ///
    /// At most one deep analysis exists per analysis.
    fn save_deep(&mut self, result: &DeepAnalysisResult) -> StorageResult<()>;

    /// Gets the deep analysis belonging to an analysis
    fn get_deep(&self, analysis_id: i64) -> StorageResult<Option<DeepAnalysisResult>>;

    // ===== Statistics =====

    /// Aggregate counts over every stored analysis
    fn stats(&self) -> StorageResult<Stats>;
}
