//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Deep analyses are stored as a JSON payload next to their analysis id.

use crate::models::{AnalysisResult, DeepAnalysisResult, HeadingCounts, LinkStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::Stats;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const ANALYSIS_COLUMNS: &str = "id, url, html_version, title, h1, h2, h3, h4, h5, h6, \
     internal_count, internal_inaccessible, internal_unchecked, \
     external_count, external_inaccessible, external_unchecked, \
     has_login_form, owner_id, created_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Statistics relative to `now`
    pub fn stats_at(&self, now: DateTime<Utc>) -> StorageResult<Stats> {
        let count = |sql: &str| -> StorageResult<u64> {
            let value: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(value.max(0) as u64)
        };
        let since = |age: Duration| -> StorageResult<u64> {
            let value: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM analyses WHERE created_at >= ?1",
                params![timestamp(now - age)],
                |row| row.get(0),
            )?;
            Ok(value.max(0) as u64)
        };

        let most_analyzed_host = self
            .conn
            .query_row(
                "SELECT host FROM analyses WHERE host != ''
                 GROUP BY host ORDER BY COUNT(*) DESC, host ASC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(Stats {
            total_analyses: count("SELECT COUNT(*) FROM analyses")?,
            unique_urls: count("SELECT COUNT(DISTINCT url) FROM analyses")?,
            distinct_owners: count("SELECT COUNT(DISTINCT owner_id) FROM analyses")?,
            analyses_last_24h: since(Duration::hours(24))?,
            analyses_last_7d: since(Duration::days(7))?,
            analyses_last_30d: since(Duration::days(30))?,
            most_analyzed_host,
            generated_at: now,
        })
    }

    fn list(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> StorageResult<Vec<AnalysisResult>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, analysis_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

impl Storage for SqliteStorage {
    // ===== Analyses =====

    fn save_analysis(&mut self, result: &AnalysisResult) -> StorageResult<i64> {
        insert_analysis(&self.conn, result)
    }

    fn save_analyses(&mut self, results: &[AnalysisResult]) -> StorageResult<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let ids = results
            .iter()
            .map(|result| insert_analysis(&tx, result))
            .collect::<StorageResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(ids)
    }

    fn get_analysis(&self, id: i64) -> StorageResult<Option<AnalysisResult>> {
        let sql = format!("SELECT {} FROM analyses WHERE id = ?1", ANALYSIS_COLUMNS);
        let result = self
            .conn
            .query_row(&sql, params![id], analysis_from_row)
            .optional()?;
        Ok(result)
    }

    fn recent_analyses(&self, limit: usize) -> StorageResult<Vec<AnalysisResult>> {
        let sql = format!(
            "SELECT {} FROM analyses ORDER BY created_at DESC, id DESC LIMIT ?1",
            ANALYSIS_COLUMNS
        );
        self.list(&sql, params![limit as i64])
    }

    fn owner_analyses(&self, owner_id: &str, limit: usize) -> StorageResult<Vec<AnalysisResult>> {
        let sql = format!(
            "SELECT {} FROM analyses WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
            ANALYSIS_COLUMNS
        );
        self.list(&sql, params![owner_id, limit as i64])
    }

    // ===== Deep Analyses =====

    fn save_deep(&mut self, result: &DeepAnalysisResult) -> StorageResult<()> {
        let analysis_id = result.analysis_id.ok_or_else(|| {
            StorageError::InvalidRecord("deep analysis has no analysis id".to_string())
        })?;
        let payload = serde_json::to_string(result)?;

        self.conn.execute(
            "INSERT INTO deep_analyses (analysis_id, url, created_at, payload)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(analysis_id) DO UPDATE SET
                 url = excluded.url,
                 created_at = excluded.created_at,
                 payload = excluded.payload",
            params![analysis_id, result.url, timestamp(result.created_at), payload],
        )?;

        Ok(())
    }

    fn get_deep(&self, analysis_id: i64) -> StorageResult<Option<DeepAnalysisResult>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM deep_analyses WHERE analysis_id = ?1",
                params![analysis_id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => {
                let mut deep: DeepAnalysisResult = serde_json::from_str(&payload)?;
                deep.analysis_id = Some(analysis_id);
                Ok(Some(deep))
            }
            None => Ok(None),
        }
    }

    // ===== Statistics =====

    fn stats(&self) -> StorageResult<Stats> {
        self.stats_at(Utc::now())
    }
}

fn insert_analysis(conn: &Connection, result: &AnalysisResult) -> StorageResult<i64> {
    let h = &result.headings;
    let internal = &result.internal_links;
    let external = &result.external_links;

    conn.execute(
        "INSERT INTO analyses (url, host, html_version, title, h1, h2, h3, h4, h5, h6,
             internal_count, internal_inaccessible, internal_unchecked,
             external_count, external_inaccessible, external_unchecked,
             has_login_form, owner_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            result.url,
            result.host().unwrap_or_default(),
            result.html_version,
            result.title,
            h.h1,
            h.h2,
            h.h3,
            h.h4,
            h.h5,
            h.h6,
            internal.count as i64,
            internal.inaccessible as i64,
            internal.unchecked as i64,
            external.count as i64,
            external.inaccessible as i64,
            external.unchecked as i64,
            result.has_login_form,
            result.owner_id,
            timestamp(result.created_at),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisResult> {
    let count = |idx: usize| -> rusqlite::Result<usize> {
        row.get::<_, i64>(idx).map(|v| v.max(0) as usize)
    };

    let created_at: String = row.get(18)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(18, Type::Text, Box::new(e)))?;

    Ok(AnalysisResult {
        id: Some(row.get(0)?),
        url: row.get(1)?,
        html_version: row.get(2)?,
        title: row.get(3)?,
        headings: HeadingCounts {
            h1: row.get(4)?,
            h2: row.get(5)?,
            h3: row.get(6)?,
            h4: row.get(7)?,
            h5: row.get(8)?,
            h6: row.get(9)?,
        },
        internal_links: LinkStatus {
            count: count(10)?,
            inaccessible: count(11)?,
            unchecked: count(12)?,
        },
        external_links: LinkStatus {
            count: count(13)?,
            inaccessible: count(14)?,
            unchecked: count(15)?,
        },
        has_login_form: row.get(16)?,
        owner_id: row.get(17)?,
        created_at,
    })
}
