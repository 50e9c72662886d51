//! Output module for reporting crawl results
//!
//! This module handles:
//! - Per-project crawl statistics
//! - Batch summaries printed after a crawl

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::crawler::CrawlResult;
use std::collections::HashMap;

/// Prints a one-line-per-page summary of a crawl batch
pub fn print_batch_summary(results: &HashMap<i64, CrawlResult>) {
    let mut page_ids: Vec<_> = results.keys().copied().collect();
    page_ids.sort_unstable();

    for page_id in page_ids {
        let result = &results[&page_id];
        if result.success {
            println!("  ✓ [{}] {} ({}ms)", page_id, result.url, result.duration_ms);
        } else {
            println!("  ✗ [{}] {}: {}", page_id, result.url, result.error_message());
        }
    }

    let succeeded = results.values().filter(|r| r.success).count();
    println!(
        "\n{} pages crawled: {} succeeded, {} failed",
        results.len(),
        succeeded,
        results.len() - succeeded
    );
}
