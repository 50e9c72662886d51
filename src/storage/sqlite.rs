//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the `PageStore` trait.

use crate::state::PageStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{PageRecord, StatusUpdate};
use crate::PagewiseError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const PAGE_COLUMNS: &str = "id, project_id, url, status, error_message, last_crawled_at, \
     title, meta_description, headings, body_content, word_count, canonical_url, \
     created_at, updated_at";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database file at `path`
    pub fn new(path: &Path) -> Result<Self, PagewiseError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> Result<Self, PagewiseError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_page(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    let status: String = row.get(3)?;
    let status = PageStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown page status '{}'", status).into(),
        )
    })?;

    let last_crawled_at = row
        .get::<_, Option<String>>(5)?
        .map(|s| parse_timestamp(5, &s))
        .transpose()?;

    let headings: Option<BTreeMap<String, Vec<String>>> = row
        .get::<_, Option<String>>(8)?
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

    Ok(PageRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        url: row.get(2)?,
        status,
        error_message: row.get(4)?,
        last_crawled_at,
        title: row.get(6)?,
        meta_description: row.get(7)?,
        headings,
        body_content: row.get(9)?,
        word_count: row.get(10)?,
        canonical_url: row.get(11)?,
        created_at: parse_timestamp(12, &row.get::<_, String>(12)?)?,
        updated_at: parse_timestamp(13, &row.get::<_, String>(13)?)?,
    })
}

impl PageStore for SqliteStore {
    fn insert_page(&mut self, project_id: i64, url: &str) -> StorageResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM pages WHERE project_id = ?1 AND url = ?2",
                params![project_id, url],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO pages (project_id, url, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![project_id, url, PageStatus::Pending.to_db_string(), now],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, page_id: i64) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                row_to_page,
            )
            .optional()?;

        Ok(page)
    }

    fn list_by_project_and_status(
        &self,
        project_id: i64,
        status: PageStatus,
        limit: Option<usize>,
    ) -> StorageResult<Vec<PageRecord>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE project_id = ?1 AND status = ?2 ORDER BY id ASC LIMIT ?3",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(
                params![project_id, status.to_db_string(), limit],
                row_to_page,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn update_status(
        &mut self,
        page_id: i64,
        update: StatusUpdate,
    ) -> StorageResult<Option<PageRecord>> {
        let tx = self.conn.transaction()?;

        let current: Option<String> = tx
            .query_row(
                "SELECT status FROM pages WHERE id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?;

        let current = match current {
            Some(status) => PageStatus::from_db_string(&status).ok_or_else(|| {
                StorageError::Database(format!("page {} has unknown status '{}'", page_id, status))
            })?,
            None => return Ok(None),
        };

        current.transition(update.status)?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE pages SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![update.status.to_db_string(), now, page_id],
        )?;

        if let Some(error_message) = &update.error_message {
            tx.execute(
                "UPDATE pages SET error_message = ?1 WHERE id = ?2",
                params![error_message, page_id],
            )?;
        }

        if let Some(crawled_at) = update.last_crawled_at {
            tx.execute(
                "UPDATE pages SET last_crawled_at = ?1 WHERE id = ?2",
                params![crawled_at.to_rfc3339(), page_id],
            )?;
        }

        if let Some(content) = &update.content {
            let headings = serde_json::to_string(&content.headings)?;
            tx.execute(
                "UPDATE pages SET title = ?1, meta_description = ?2, headings = ?3,
                 body_content = ?4, word_count = ?5, canonical_url = ?6 WHERE id = ?7",
                params![
                    content.title,
                    content.meta_description,
                    headings,
                    content.body_content,
                    content.word_count,
                    content.canonical_url,
                    page_id
                ],
            )?;
        }

        tx.commit()?;

        self.get(page_id)
    }

    fn count_by_status(&self, project_id: i64, status: PageStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE project_id = ?1 AND status = ?2",
            params![project_id, status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pages(&self, project_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn total_word_count(&self, project_id: i64) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(word_count), 0) FROM pages WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}
