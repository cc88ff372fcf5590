//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Page-Lens database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per single-page analysis
CREATE TABLE IF NOT EXISTS analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    host TEXT NOT NULL,
    html_version TEXT NOT NULL,
    title TEXT NOT NULL,
    h1 INTEGER NOT NULL DEFAULT 0,
    h2 INTEGER NOT NULL DEFAULT 0,
    h3 INTEGER NOT NULL DEFAULT 0,
    h4 INTEGER NOT NULL DEFAULT 0,
    h5 INTEGER NOT NULL DEFAULT 0,
    h6 INTEGER NOT NULL DEFAULT 0,
    internal_count INTEGER NOT NULL DEFAULT 0,
    internal_inaccessible INTEGER NOT NULL DEFAULT 0,
    internal_unchecked INTEGER NOT NULL DEFAULT 0,
    external_count INTEGER NOT NULL DEFAULT 0,
    external_inaccessible INTEGER NOT NULL DEFAULT 0,
    external_unchecked INTEGER NOT NULL DEFAULT 0,
    has_login_form INTEGER NOT NULL DEFAULT 0,
    owner_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at);
CREATE INDEX IF NOT EXISTS idx_analyses_owner ON analyses(owner_id);
CREATE INDEX IF NOT EXISTS idx_analyses_host ON analyses(host);

-- At most one live deep analysis per analysis
CREATE TABLE IF NOT EXISTS deep_analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    analysis_id INTEGER NOT NULL UNIQUE REFERENCES analyses(id),
    url TEXT NOT NULL,
    created_at TEXT NOT NULL,
    payload TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
