//! Storage module for persisting page records
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Page registration per project
//! - Status transitions checked against the page lifecycle
//! - Extracted content persistence

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{PageStore, StorageError, StorageResult};

use crate::state::PageStatus;
use crate::PagewiseError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Opens (or creates) the page database at `path`
pub fn open_store(path: &Path) -> Result<SqliteStore, PagewiseError> {
    SqliteStore::new(path)
}

/// A page row as stored in the database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub id: i64,
    pub project_id: i64,
    pub url: String,
    pub status: PageStatus,
    pub error_message: Option<String>,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub headings: Option<BTreeMap<String, Vec<String>>>,
    pub body_content: Option<String>,
    pub word_count: Option<u32>,
    pub canonical_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Content fields extracted from a successful fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageContent {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Heading text keyed by tag name (`h1` .. `h6`), in document order
    pub headings: BTreeMap<String, Vec<String>>,
    pub body_content: String,
    pub word_count: u32,
    pub canonical_url: Option<String>,
}

/// A status write and the columns that change with it
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: PageStatus,
    /// `None` leaves the column untouched, `Some(None)` clears it
    pub error_message: Option<Option<String>>,
    /// `None` leaves the column untouched
    pub last_crawled_at: Option<DateTime<Utc>>,
    /// `None` leaves all content columns untouched
    pub content: Option<PageContent>,
}

impl StatusUpdate {
    /// Marks a fetch as in flight
    pub fn crawling() -> Self {
        Self {
            status: PageStatus::Crawling,
            error_message: None,
            last_crawled_at: None,
            content: None,
        }
    }

    /// Records a successful crawl: stores content and clears any previous error
    pub fn completed(content: PageContent, crawled_at: DateTime<Utc>) -> Self {
        Self {
            status: PageStatus::Completed,
            error_message: Some(None),
            last_crawled_at: Some(crawled_at),
            content: Some(content),
        }
    }

    /// Records a failed crawl, leaving previously stored content in place
    pub fn failed(message: impl Into<String>, crawled_at: DateTime<Utc>) -> Self {
        Self {
            status: PageStatus::Failed,
            error_message: Some(Some(message.into())),
            last_crawled_at: Some(crawled_at),
            content: None,
        }
    }

    /// Returns a page to `Pending` so it re-enters the crawl cycle
    pub fn reset() -> Self {
        Self {
            status: PageStatus::Pending,
            error_message: None,
            last_crawled_at: None,
            content: None,
        }
    }
}
