//! Discovery crawl - registers a site's pages by following links
//!
//! Discovery drains a `CrawlFrontier` one URL at a time. Each popped URL is
//! registered as a `pending` page; pages above the depth limit are fetched
//! so their links can be queued. Content is not stored here; that is the
//! orchestrator's job once pages are registered.

use crate::config::CrawlerConfig;
use crate::crawler::extractor::parse_html;
use crate::crawler::{CrawlFrontier, Fetcher};
use crate::storage::PageStore;
use crate::Result;
use serde::Serialize;
use url::Url;

/// Bounds on a discovery crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryLimits {
    /// Stop after this many pages are registered
    pub max_pages: usize,

    /// Pages at this depth are registered but their links are not followed
    pub max_depth: u32,
}

impl DiscoveryLimits {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
        }
    }
}

/// Counters describing a finished discovery crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub pages_registered: usize,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub links_found: usize,
    pub links_queued: usize,
    pub skipped_too_deep: usize,
}

/// Registers pages reachable from the frontier's start URL
///
/// Runs until the frontier is empty or `limits.max_pages` pages are
/// registered. Failed fetches are counted and skipped; the page stays
/// registered.
///
/// # Errors
///
/// Returns an error only if the store rejects a registration.
pub async fn discover_pages<F, S>(
    fetcher: &F,
    store: &mut S,
    project_id: i64,
    frontier: &mut CrawlFrontier,
    limits: DiscoveryLimits,
) -> Result<DiscoveryReport>
where
    F: Fetcher + ?Sized,
    S: PageStore + ?Sized,
{
    let mut report = DiscoveryReport::default();

    tracing::info!(
        "Discovering pages from {} (max {} pages, depth {})",
        frontier.start_url(),
        limits.max_pages,
        limits.max_depth
    );

    while report.pages_registered < limits.max_pages {
        let Some(item) = frontier.pop() else {
            break;
        };

        if item.depth > limits.max_depth {
            report.skipped_too_deep += 1;
            continue;
        }

        let url = item.normalized.as_str();
        let page_id = store.insert_page(project_id, url)?;
        report.pages_registered += 1;
        tracing::debug!("Registered page {} at depth {}: {}", page_id, item.depth, url);

        if item.depth >= limits.max_depth {
            continue;
        }

        let result = match fetcher.fetch(url).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Fetcher error during discovery of {}: {}", url, e);
                report.fetch_failures += 1;
                continue;
            }
        };
        report.pages_fetched += 1;

        let html = match result.html.as_deref() {
            Some(html) if result.success => html,
            _ => {
                tracing::debug!("No links from {}: {}", url, result.error_message());
                report.fetch_failures += 1;
                continue;
            }
        };

        // Resolve relative links against the post-redirect URL
        let base = Url::parse(&result.url).unwrap_or_else(|_| item.normalized.clone());
        let links = parse_html(html, Some(&base)).links;

        report.links_found += links.len();
        report.links_queued += frontier.add_many(&links, Some(url), Some(item.depth + 1));

        if report.pages_registered % 25 == 0 {
            tracing::info!(
                "Discovery progress: {} pages registered, {} queued",
                report.pages_registered,
                frontier.len()
            );
        }
    }

    tracing::info!(
        "Discovery finished: {} pages registered, {} fetched, {} failures",
        report.pages_registered,
        report.pages_fetched,
        report.fetch_failures
    );

    Ok(report)
}
