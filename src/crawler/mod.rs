//! Crawler module for page discovery and crawling
//!
//! This module contains the core crawling logic, including:
//! - The priority frontier that orders discovered URLs
//! - The `Fetcher` contract and its HTTP implementation
//! - HTML content and link extraction
//! - Discovery crawls that register a site's pages
//! - The orchestrator that crawls registered pages with bounded concurrency

mod discovery;
mod extractor;
mod fetcher;
mod frontier;
mod orchestrator;
mod progress;

pub use discovery::{discover_pages, DiscoveryLimits, DiscoveryReport};
pub use extractor::{extract_content, parse_html, ExtractedPage};
pub use fetcher::{CrawlResult, Fetcher, HttpFetcher};
pub use frontier::{CrawlFrontier, QueuedUrl, UrlPriority};
pub use orchestrator::{CrawlOrchestrator, DEFAULT_CONCURRENCY_LIMIT};
pub use progress::{progress_channel, CrawlProgress, ProgressReceiver, ProgressSender};
