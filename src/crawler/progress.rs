//! Crawl progress events
//!
//! The orchestrator publishes one event per page status change to an optional
//! broadcast channel. Publishing never blocks; lagging or absent receivers
//! simply miss events.

use crate::state::PageStatus;
use serde::Serialize;
use tokio::sync::broadcast;

/// A page status change plus the batch's running totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlProgress {
    pub project_id: i64,
    pub page_id: i64,
    pub status: PageStatus,

    /// Pages completed so far in this batch
    pub pages_crawled: usize,

    /// Pages failed so far in this batch
    pub pages_failed: usize,
}

pub type ProgressSender = broadcast::Sender<CrawlProgress>;
pub type ProgressReceiver = broadcast::Receiver<CrawlProgress>;

/// Creates a progress channel buffering up to `capacity` events per receiver
pub fn progress_channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    broadcast::channel(capacity.max(1))
}
