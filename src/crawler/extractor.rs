//! Content extraction for crawled pages
//!
//! Turns a fetched HTML document into the content fields stored on a page
//! record, plus the outgoing links used by discovery:
//! - Title (from `<title>`)
//! - Meta description
//! - Headings `h1`..`h6`, grouped by tag in document order
//! - Visible body text and its word count
//! - Canonical URL
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and
//! returns owned data.

use crate::crawler::CrawlResult;
use crate::storage::PageContent;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Elements whose text never counts as page content
const SKIPPED_TEXT_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Everything pulled out of one HTML document
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub content: PageContent,

    /// Absolute http(s) links found on the page, in document order
    pub links: Vec<String>,
}

/// Extracts page content from a successful fetch
///
/// The body text prefers the fetcher's markdown rendition when it provides
/// one and falls back to the visible text of the HTML.
pub fn extract_content(result: &CrawlResult) -> PageContent {
    let base_url = Url::parse(&result.url).ok();
    let html = result.html.as_deref().unwrap_or("");
    let mut content = parse_html(html, base_url.as_ref()).content;

    if let Some(markdown) = result.markdown.as_deref().filter(|m| !m.trim().is_empty()) {
        content.body_content = markdown.trim().to_string();
        content.word_count = count_words(&content.body_content);
    }

    content
}

/// Parses an HTML document
///
/// Relative links and the canonical URL are resolved against `base_url`;
/// without a base only absolute URLs are kept.
///
/// # Example
///
/// ```
/// use pagewise::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><h1>Hi</h1><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let page = parse_html(html, Some(&base_url));
/// assert_eq!(page.content.title, Some("Test".to_string()));
/// assert_eq!(page.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: Option<&Url>) -> ExtractedPage {
    let document = Html::parse_document(html);

    let body_content = extract_body_text(&document);
    let word_count = count_words(&body_content);

    let content = PageContent {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        headings: extract_headings(&document),
        body_content,
        word_count,
        canonical_url: extract_canonical(&document, base_url),
    };

    ExtractedPage {
        content,
        links: extract_links(&document, base_url),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn count_words(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = selector("title")?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let meta_selector = selector("meta[name]")?;

    document
        .select(&meta_selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .map(|name| name.eq_ignore_ascii_case("description"))
                .unwrap_or(false)
        })
        .and_then(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn extract_headings(document: &Html) -> BTreeMap<String, Vec<String>> {
    let mut headings = BTreeMap::new();

    let Some(heading_selector) = selector(&HEADING_TAGS.join(", ")) else {
        return headings;
    };

    for element in document.select(&heading_selector) {
        let text = collapse_whitespace(&element.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        headings
            .entry(element.value().name().to_string())
            .or_insert_with(Vec::new)
            .push(text);
    }

    headings
}

fn extract_body_text(document: &Html) -> String {
    let Some(body_selector) = selector("body") else {
        return String::new();
    };

    let mut parts = Vec::new();
    for body in document.select(&body_selector) {
        collect_visible_text(body, &mut parts);
    }

    collapse_whitespace(&parts.join(" "))
}

fn collect_visible_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            parts.push(&**text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_TEXT_TAGS.contains(&child_element.value().name()) {
                collect_visible_text(child_element, parts);
            }
        }
    }
}

fn extract_canonical(document: &Html, base_url: Option<&Url>) -> Option<String> {
    let canonical_selector = selector("link[rel='canonical'][href]")?;

    document
        .select(&canonical_selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url))
}

fn extract_links(document: &Html, base_url: Option<&Url>) -> Vec<String> {
    let mut links = Vec::new();

    if let Some(a_selector) = selector("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None for `javascript:`, `mailto:`, `tel:` and `data:` links,
/// same-page anchors, and anything that does not resolve to http(s).
fn resolve_link(href: &str, base_url: Option<&Url>) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = match base_url {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
