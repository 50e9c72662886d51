//! Database schema definitions
//!
//! This module contains the SQL schema for the Pagewise page database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per page URL per project
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    last_crawled_at TEXT,
    title TEXT,
    meta_description TEXT,
    headings TEXT,
    body_content TEXT,
    word_count INTEGER,
    canonical_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(project_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_project_status ON pages(project_id, status);
"#;

/// Initializes the database schema; safe to run on an existing database
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
