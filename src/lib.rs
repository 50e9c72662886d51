//! Pagewise: priority-ordered site crawling for content audits
//!
//! This crate implements the crawl core of a content-audit service: a URL frontier
//! that orders discovered links by priority, depth and discovery order, and an
//! orchestrator that fetches and extracts page records with bounded concurrency
//! while tracking every page through an explicit status lifecycle.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Pagewise operations
#[derive(Debug, Error)]
pub enum PagewiseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Faults raised by a fetcher for conditions it cannot express as a failed result
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client error for {url}: {source}")]
    Client { url: String, source: reqwest::Error },

    #[error("Fetcher unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for Pagewise operations
pub type Result<T> = std::result::Result<T, PagewiseError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlFrontier, CrawlOrchestrator, CrawlResult, Fetcher, QueuedUrl, UrlPriority};
pub use state::PageStatus;
pub use url::{extract_domain, is_same_page, normalize_url, NormalizeOptions};
