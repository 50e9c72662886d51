//! Priority frontier for a single crawl session
//!
//! The frontier holds discovered-but-unfetched URLs. It:
//! - Keeps the crawl on the start URL's host
//! - Deduplicates by normalized URL
//! - Drops paths matching exclude patterns
//! - Orders work by priority, then depth, then discovery order

use crate::config::FrontierConfig;
use crate::url::{
    compile_patterns, extract_domain, first_match, is_same_domain, normalize_url, GlobPattern,
    NormalizeOptions,
};
use crate::{PagewiseError, Result};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use url::Url;

/// Enqueue priority class (lower is fetched first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrlPriority {
    /// The start URL itself
    Homepage = 0,
    /// Path matches an include pattern
    Include = 1,
    Other = 2,
}

/// A URL waiting in the frontier
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    pub priority: UrlPriority,

    /// Link distance from the start URL
    pub depth: u32,

    /// Discovery order, unique within a frontier
    pub sequence: u64,

    /// The URL as it was added
    pub url: String,

    pub normalized: Url,

    pub parent_url: Option<String>,
}

impl QueuedUrl {
    fn sort_key(&self) -> (UrlPriority, u32, u64) {
        (self.priority, self.depth, self.sequence)
    }
}

// BinaryHeap is a max-heap; reverse so the smallest sort key pops first
impl Ord for QueuedUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        other.sort_key().cmp(&self.sort_key())
    }
}

impl PartialOrd for QueuedUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for QueuedUrl {}

/// Ordered, deduplicated, same-domain set of URLs awaiting fetch
///
/// Every queued URL's normalized form is in the seen set. The seen set only
/// grows, except through [`CrawlFrontier::reset`].
///
/// # Example
///
/// ```
/// use pagewise::crawler::{CrawlFrontier, UrlPriority};
/// use pagewise::url::NormalizeOptions;
///
/// let mut frontier = CrawlFrontier::new(
///     "https://example.com/",
///     &["/products/*".to_string()],
///     &["/admin/*".to_string()],
///     NormalizeOptions::default(),
/// )
/// .unwrap();
///
/// assert!(frontier.add("https://example.com/about", None, None));
/// assert!(frontier.add("https://example.com/products/shoes", None, None));
/// assert!(!frontier.add("https://example.com/admin/users", None, None));
///
/// assert_eq!(frontier.pop().unwrap().priority, UrlPriority::Homepage);
/// assert_eq!(frontier.pop().unwrap().priority, UrlPriority::Include);
/// assert_eq!(frontier.pop().unwrap().priority, UrlPriority::Other);
/// ```
#[derive(Debug)]
pub struct CrawlFrontier {
    heap: BinaryHeap<QueuedUrl>,
    seen: HashSet<Url>,
    start_url: String,
    start_normalized: Url,
    start_domain: String,
    include_patterns: Vec<GlobPattern>,
    exclude_patterns: Vec<GlobPattern>,
    options: NormalizeOptions,
    next_sequence: u64,
}

impl CrawlFrontier {
    /// Creates a frontier seeded with the start URL at depth 0
    ///
    /// # Errors
    ///
    /// `PagewiseError::Validation` when the start URL is empty or not an
    /// absolute http(s) URL, or when a pattern does not compile.
    pub fn new(
        start_url: &str,
        include_patterns: &[String],
        exclude_patterns: &[String],
        options: NormalizeOptions,
    ) -> Result<Self> {
        let start_url = start_url.trim();
        if start_url.is_empty() {
            return Err(PagewiseError::Validation(
                "start URL must not be empty".to_string(),
            ));
        }

        let start_normalized = normalize_url(start_url, &options)
            .map_err(|e| PagewiseError::Validation(format!("invalid start URL: {}", e)))?;
        let start_domain = extract_domain(&start_normalized).ok_or_else(|| {
            PagewiseError::Validation(format!("start URL has no host: {}", start_url))
        })?;

        let include_patterns = compile_patterns(include_patterns)
            .map_err(|e| PagewiseError::Validation(format!("invalid include pattern: {}", e)))?;
        let exclude_patterns = compile_patterns(exclude_patterns)
            .map_err(|e| PagewiseError::Validation(format!("invalid exclude pattern: {}", e)))?;

        let mut frontier = Self {
            heap: BinaryHeap::new(),
            seen: HashSet::new(),
            start_url: start_url.to_string(),
            start_normalized,
            start_domain,
            include_patterns,
            exclude_patterns,
            options,
            next_sequence: 0,
        };
        frontier.seed();

        Ok(frontier)
    }

    /// Creates a frontier from the `[frontier]` configuration section
    pub fn from_config(start_url: &str, config: &FrontierConfig) -> Result<Self> {
        Self::new(
            start_url,
            &config.include_patterns,
            &config.exclude_patterns,
            config.normalize_options(),
        )
    }

    fn seed(&mut self) {
        let normalized = self.start_normalized.clone();
        self.seen.insert(normalized.clone());
        let item = QueuedUrl {
            priority: UrlPriority::Homepage,
            depth: 0,
            sequence: self.next_sequence(),
            url: self.start_url.clone(),
            normalized,
            parent_url: None,
        };
        self.heap.push(item);
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Adds a discovered URL
    ///
    /// Returns false, without marking the URL seen, when it is unparseable or
    /// on another host. Returns false for already-seen URLs. Excluded paths
    /// are marked seen but never queued. `depth` defaults to 1.
    pub fn add(&mut self, url: &str, parent_url: Option<&str>, depth: Option<u32>) -> bool {
        let Ok(normalized) = normalize_url(url, &self.options) else {
            tracing::trace!("Frontier rejected unparseable URL: {:?}", url);
            return false;
        };

        if !is_same_domain(&normalized, &self.start_domain) {
            tracing::trace!("Frontier rejected off-domain URL: {}", url);
            return false;
        }

        if self.seen.contains(&normalized) {
            return false;
        }

        if path_matches(&self.exclude_patterns, &normalized) {
            tracing::debug!("Excluded by pattern: {}", normalized);
            self.seen.insert(normalized);
            return false;
        }

        let priority = self.priority_of(&normalized);
        let item = QueuedUrl {
            priority,
            depth: depth.unwrap_or(1),
            sequence: self.next_sequence(),
            url: url.trim().to_string(),
            normalized: normalized.clone(),
            parent_url: parent_url.map(str::to_string),
        };

        tracing::trace!(
            "Queued {} (priority {:?}, depth {})",
            item.normalized,
            item.priority,
            item.depth
        );
        self.seen.insert(normalized);
        self.heap.push(item);
        true
    }

    /// Adds URLs in order, returning how many were queued
    pub fn add_many<I, S>(&mut self, urls: I, parent_url: Option<&str>, depth: Option<u32>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter(|url| self.add(url.as_ref(), parent_url, depth))
            .count()
    }

    /// Removes and returns the highest-priority URL
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&QueuedUrl> {
        self.heap.peek()
    }

    /// True if the URL's normalized form has been queued or excluded
    pub fn has_seen(&self, url: &str) -> bool {
        normalize_url(url, &self.options)
            .map(|normalized| self.seen.contains(&normalized))
            .unwrap_or(false)
    }

    /// Forgets everything and re-seeds the start URL
    ///
    /// Sequence numbers keep increasing across resets.
    pub fn reset(&mut self) {
        self.heap.clear();
        self.seen.clear();
        self.seed();
    }

    /// Drops all queued URLs but remembers what was seen
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn start_domain(&self) -> &str {
        &self.start_domain
    }

    /// True if the URL parses and is on the start host
    pub fn is_in_scope(&self, url: &str) -> bool {
        normalize_url(url, &self.options)
            .map(|normalized| is_same_domain(&normalized, &self.start_domain))
            .unwrap_or(false)
    }

    /// True if the URL's path matches an exclude pattern
    pub fn is_excluded(&self, url: &str) -> bool {
        normalize_url(url, &self.options)
            .map(|normalized| path_matches(&self.exclude_patterns, &normalized))
            .unwrap_or(false)
    }

    /// The priority the URL would get if added now
    ///
    /// None for unparseable URLs. Scope and exclusion are not checked.
    pub fn classify(&self, url: &str) -> Option<UrlPriority> {
        normalize_url(url, &self.options)
            .ok()
            .map(|normalized| self.priority_of(&normalized))
    }

    fn priority_of(&self, normalized: &Url) -> UrlPriority {
        if *normalized == self.start_normalized {
            UrlPriority::Homepage
        } else if path_matches(&self.include_patterns, &normalized) {
            UrlPriority::Include
        } else {
            UrlPriority::Other
        }
    }
}

/// Matches a normalized URL's path against `patterns`
///
/// Normalization drops trailing slashes, so non-root paths are also tried
/// with one appended. `/admin/` then matches a pattern written as `/admin/`.
fn path_matches(patterns: &[GlobPattern], normalized: &Url) -> bool {
    let path = normalized.path();
    first_match(patterns, path).is_some()
        || (path != "/" && first_match(patterns, &format!("{}/", path)).is_some())
}
