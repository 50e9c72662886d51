use crate::crawler::DEFAULT_CONCURRENCY_LIMIT;
use crate::url::NormalizeOptions;
use serde::Deserialize;

/// Main configuration structure for Pagewise
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub frontier: FrontierConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Maximum number of pages registered by a discovery crawl
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum link depth followed from the start URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Frontier scoping and URL identity rules
#[derive(Debug, Clone, Deserialize)]
pub struct FrontierConfig {
    /// Glob patterns (matched against the path) that raise a URL's priority
    #[serde(rename = "include-patterns", default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns (matched against the path) that are never enqueued
    #[serde(rename = "exclude-patterns", default)]
    pub exclude_patterns: Vec<String>,

    #[serde(rename = "remove-www", default = "default_true")]
    pub remove_www: bool,

    #[serde(rename = "force-https", default)]
    pub force_https: bool,

    #[serde(rename = "strip-tracking-params", default = "default_true")]
    pub strip_tracking_params: bool,

    #[serde(rename = "sort-query-params", default = "default_true")]
    pub sort_query_params: bool,
}

impl FrontierConfig {
    /// Returns the URL normalization options described by this section
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            remove_www: self.remove_www,
            force_https: self.force_https,
            strip_tracking_params: self.strip_tracking_params,
            sort_query_params: self.sort_query_params,
        }
    }
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            remove_www: true,
            force_https: false,
            strip_tracking_params: true,
            sort_query_params: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
