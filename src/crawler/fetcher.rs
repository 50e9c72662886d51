//! Fetcher contract and the HTTP reference implementation
//!
//! A `Fetcher` turns a URL into a `CrawlResult`. Ordinary failures (timeouts,
//! 4xx/5xx responses, non-HTML content) are reported as `success = false`;
//! `Err` is reserved for faults the fetcher cannot describe as a result.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Maximum redirect hops followed by `HttpFetcher`
const MAX_REDIRECTS: usize = 10;

/// Outcome of fetching one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub success: bool,
    /// Final URL after redirects
    pub url: String,
    pub html: Option<String>,
    pub markdown: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub duration_ms: u64,
}

impl CrawlResult {
    /// Builds a successful result carrying an HTML body
    pub fn success(url: impl Into<String>, html: impl Into<String>, status_code: u16) -> Self {
        Self {
            success: true,
            url: url.into(),
            html: Some(html.into()),
            markdown: None,
            metadata: None,
            error: None,
            status_code: Some(status_code),
            duration_ms: 0,
        }
    }

    /// Builds a failed result with a human-readable reason
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            html: None,
            markdown: None,
            metadata: None,
            error: Some(error.into()),
            status_code: None,
            duration_ms: 0,
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// The failure reason, or a generic message when the fetcher gave none
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Unknown fetch error".to_string())
    }
}

/// Network fetch capability used by the orchestrator and discovery
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<CrawlResult, FetchError>;
}

/// Plain HTTP fetcher backed by reqwest
///
/// Only HTML responses count as success. There is no JavaScript rendering.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the configured user agent and request timeout
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pagewise::config::{CrawlerConfig, UserAgentConfig};
    /// use pagewise::crawler::HttpFetcher;
    ///
    /// let user_agent = UserAgentConfig {
    ///     crawler_name: "Pagewise".to_string(),
    ///     crawler_version: "0.1".to_string(),
    ///     contact_url: "https://example.com/bot".to_string(),
    /// };
    /// let crawler = CrawlerConfig {
    ///     concurrency_limit: 5,
    ///     max_pages: 100,
    ///     max_depth: 3,
    ///     request_timeout_secs: 30,
    /// };
    ///
    /// let fetcher = HttpFetcher::new(&user_agent, &crawler).unwrap();
    /// ```
    pub fn new(user_agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(crawler.request_timeout_secs);

        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<CrawlResult, FetchError> {
        let started = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else if e.is_redirect() {
                    format!("Too many redirects (limit {})", MAX_REDIRECTS)
                } else if e.is_builder() {
                    return Err(FetchError::Client {
                        url: url.to_string(),
                        source: e,
                    });
                } else {
                    e.to_string()
                };
                tracing::debug!("Fetch of {} failed: {}", url, reason);
                return Ok(CrawlResult::failure(url, reason).with_duration(started.elapsed()));
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Ok(CrawlResult::failure(&final_url, format!("HTTP {}", status.as_u16()))
                .with_status_code(status.as_u16())
                .with_duration(started.elapsed()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Ok(
                CrawlResult::failure(&final_url, format!("Expected HTML, got {}", content_type))
                    .with_status_code(status.as_u16())
                    .with_metadata("content_type", content_type)
                    .with_duration(started.elapsed()),
            );
        }

        match response.text().await {
            Ok(body) => Ok(CrawlResult::success(&final_url, body, status.as_u16())
                .with_metadata("content_type", content_type)
                .with_metadata("final_url", &final_url)
                .with_duration(started.elapsed())),
            Err(e) => Ok(
                CrawlResult::failure(&final_url, format!("Failed to read body: {}", e))
                    .with_status_code(status.as_u16())
                    .with_duration(started.elapsed()),
            ),
        }
    }
}
