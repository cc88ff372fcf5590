//! Storage module for persisting analyses
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Analysis persistence and listing
//! - Deep analysis upserts, one per analysis
//! - Aggregate statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Rows returned by a listing when the caller gives no limit
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Largest listing a caller may request
pub const MAX_LIST_LIMIT: usize = 100;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Resolves a requested listing size to 1..=100, 10 when absent
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

/// Aggregate statistics over stored analyses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_analyses: u64,
    pub unique_urls: u64,
    pub distinct_owners: u64,
    pub analyses_last_24h: u64,
    pub analyses_last_7d: u64,
    pub analyses_last_30d: u64,

    /// Host with the most analyses; ties go to the lexically first host
    pub most_analyzed_host: Option<String>,

    pub generated_at: DateTime<Utc>,
}
