//! Storage traits and error types
//!
//! This module defines the page store contract the orchestrator relies on and
//! the error type shared by its implementations.

use crate::state::{IllegalTransition, PageStatus};
use crate::storage::{PageRecord, StatusUpdate};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: PageStatus, to: PageStatus },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<IllegalTransition> for StorageError {
    fn from(err: IllegalTransition) -> Self {
        Self::InvalidTransition {
            from: err.from,
            to: err.to,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable page records read and written by the crawler
///
/// Every status write is checked against `PageStatus::transition` and is
/// visible to readers once the call returns.
pub trait PageStore {
    /// Registers a page for a project, returning the existing id if the URL is known
    fn insert_page(&mut self, project_id: i64, url: &str) -> StorageResult<i64>;

    /// Gets a page by id
    fn get(&self, page_id: i64) -> StorageResult<Option<PageRecord>>;

    /// Lists a project's pages in one status, oldest first
    fn list_by_project_and_status(
        &self,
        project_id: i64,
        status: PageStatus,
        limit: Option<usize>,
    ) -> StorageResult<Vec<PageRecord>>;

    /// Applies a status transition and its accompanying fields
    ///
    /// Returns `Ok(None)` when the page does not exist and
    /// `StorageError::InvalidTransition` when the lifecycle forbids the move.
    fn update_status(
        &mut self,
        page_id: i64,
        update: StatusUpdate,
    ) -> StorageResult<Option<PageRecord>>;

    /// Returns a page to `Pending`
    fn reset_page(&mut self, page_id: i64) -> StorageResult<Option<PageRecord>> {
        self.update_status(page_id, StatusUpdate::reset())
    }

    /// Counts a project's pages in one status
    fn count_by_status(&self, project_id: i64, status: PageStatus) -> StorageResult<u64>;

    /// Counts all of a project's pages
    fn count_pages(&self, project_id: i64) -> StorageResult<u64>;

    /// Sums the word count of a project's crawled pages
    fn total_word_count(&self, project_id: i64) -> StorageResult<u64>;
}
