//! Statistics generation from the page database
//!
//! This module provides functionality for extracting and displaying
//! per-project crawl statistics from the storage layer.

use crate::state::PageStatus;
use crate::storage::{PageStore, StorageResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Crawl statistics for one project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlStatistics {
    pub project_id: i64,

    /// Total number of registered pages
    pub total_pages: u64,

    /// Count of pages by status; statuses with no pages are omitted
    pub pages_by_status: BTreeMap<String, u64>,

    /// Sum of word counts over pages with stored content
    pub total_words: u64,
}

impl CrawlStatistics {
    pub fn count(&self, status: PageStatus) -> u64 {
        self.pages_by_status
            .get(status.to_db_string())
            .copied()
            .unwrap_or(0)
    }

    /// Completed pages as a percentage of all pages
    pub fn completion_rate(&self) -> f64 {
        percentage(self.count(PageStatus::Completed), self.total_pages)
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Loads a project's statistics from storage
pub fn load_statistics<S>(store: &S, project_id: i64) -> StorageResult<CrawlStatistics>
where
    S: PageStore + ?Sized,
{
    let total_pages = store.count_pages(project_id)?;

    let mut pages_by_status = BTreeMap::new();
    for status in PageStatus::all() {
        let count = store.count_by_status(project_id, status)?;
        if count > 0 {
            pages_by_status.insert(status.to_db_string().to_string(), count);
        }
    }

    let total_words = store.total_word_count(project_id)?;

    Ok(CrawlStatistics {
        project_id,
        total_pages,
        pages_by_status,
        total_words,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics (project {}) ===\n", stats.project_id);

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Total words: {}", stats.total_words);
    println!();

    println!("Pages by Status:");
    for status in PageStatus::all() {
        let count = stats.count(status);
        println!(
            "  {}: {} ({:.1}%)",
            status,
            count,
            percentage(count, stats.total_pages)
        );
    }
    println!();

    println!(
        "Completion Rate: {:.1}% ({} / {} pages crawled)",
        stats.completion_rate(),
        stats.count(PageStatus::Completed),
        stats.total_pages
    );
}
