//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run discovery
//! and crawling end-to-end against a real SQLite database.

use pagewise::config::{CrawlerConfig, UserAgentConfig};
use pagewise::crawler::{
    discover_pages, CrawlFrontier, CrawlOrchestrator, DiscoveryLimits, HttpFetcher,
};
use pagewise::output::load_statistics;
use pagewise::storage::{PageStore, SqliteStore};
use pagewise::url::NormalizeOptions;
use pagewise::PageStatus;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: i64 = 1;

fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        concurrency_limit: 2,
        max_pages: 50,
        max_depth: 2,
        request_timeout_secs: 5,
    }
}

fn create_fetcher() -> HttpFetcher {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
    };
    HttpFetcher::new(&user_agent, &crawler_config()).expect("Failed to build fetcher")
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ))
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(title, body))
        .mount(server)
        .await;
}

fn page_by_url(store: &SqliteStore, status: PageStatus, url: &str) -> Option<i64> {
    store
        .list_by_project_and_status(PROJECT, status, None)
        .unwrap()
        .into_iter()
        .find(|page| page.url == url)
        .map(|page| page.id)
}

#[tokio::test]
async fn test_discover_then_crawl_site() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        "Home",
        r#"<h1>Welcome</h1>
           <a href="/about">About</a>
           <a href="/products/widget">Widget</a>
           <a href="/missing">Broken</a>
           <a href="https://elsewhere.example.org/">Offsite</a>"#,
    )
    .await;
    mount_page(&server, "/about", "About us", "<h1>About</h1><p>We build widgets</p>").await;
    mount_page(&server, "/products/widget", "Widget", "<h2>Specs</h2><p>Blue</p>").await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("pages.db");
    let mut store = SqliteStore::new(&db_path).expect("Failed to open store");

    let mut frontier = CrawlFrontier::new(
        &format!("{}/", base),
        &["/products/*".to_string()],
        &[],
        NormalizeOptions::default(),
    )
    .expect("Failed to create frontier");

    let fetcher = create_fetcher();
    let report = discover_pages(
        &fetcher,
        &mut store,
        PROJECT,
        &mut frontier,
        DiscoveryLimits::from_config(&crawler_config()),
    )
    .await
    .expect("Discovery failed");

    assert_eq!(report.pages_registered, 4);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(store.count_by_status(PROJECT, PageStatus::Pending).unwrap(), 4);

    let store = Arc::new(Mutex::new(store));
    let orchestrator = CrawlOrchestrator::new(Arc::new(fetcher), Arc::clone(&store), 2);
    let results = orchestrator
        .crawl_pending_pages(PROJECT, None)
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 4);
    assert_eq!(results.values().filter(|r| r.success).count(), 3);

    let store = store.lock().unwrap();

    let about_id = page_by_url(&store, PageStatus::Completed, &format!("{}/about", base))
        .expect("about page should be completed");
    let about = store.get(about_id).unwrap().unwrap();
    assert_eq!(about.title.as_deref(), Some("About us"));
    assert_eq!(about.body_content.as_deref(), Some("About We build widgets"));
    assert_eq!(about.word_count, Some(4));

    let missing_id = page_by_url(&store, PageStatus::Failed, &format!("{}/missing", base))
        .expect("missing page should be failed");
    let missing = store.get(missing_id).unwrap().unwrap();
    assert_eq!(missing.error_message.as_deref(), Some("HTTP 404"));
    assert!(missing.last_crawled_at.is_some());
    assert!(!results[&missing_id].success);

    let stats = load_statistics(&*store, PROJECT).unwrap();
    assert_eq!(stats.total_pages, 4);
    assert_eq!(stats.count(PageStatus::Completed), 3);
    assert_eq!(stats.count(PageStatus::Failed), 1);
}

#[tokio::test]
async fn test_failed_page_recovers_after_reset() {
    let server = MockServer::start().await;
    let url = format!("{}/flaky", server.uri());

    let mut store = SqliteStore::in_memory().unwrap();
    let page_id = store.insert_page(PROJECT, &url).unwrap();
    let store = Arc::new(Mutex::new(store));
    let orchestrator = CrawlOrchestrator::new(Arc::new(create_fetcher()), Arc::clone(&store), 2);

    // Nothing mounted yet: wiremock answers 404
    let first = orchestrator.crawl_pending_pages(PROJECT, None).await.unwrap();
    assert!(!first[&page_id].success);
    assert_eq!(
        store.lock().unwrap().get(page_id).unwrap().unwrap().status,
        PageStatus::Failed
    );

    mount_page(&server, "/flaky", "Back", "<p>Recovered</p>").await;
    store.lock().unwrap().reset_page(page_id).unwrap();

    let second = orchestrator.crawl_pending_pages(PROJECT, None).await.unwrap();
    assert!(second[&page_id].success);

    let page = store.lock().unwrap().get(page_id).unwrap().unwrap();
    assert_eq!(page.status, PageStatus::Completed);
    assert_eq!(page.title.as_deref(), Some("Back"));
    assert_eq!(page.error_message, None);
}

#[tokio::test]
async fn test_non_html_page_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("[]")
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let mut store = SqliteStore::in_memory().unwrap();
    let page_id = store
        .insert_page(PROJECT, &format!("{}/feed.json", server.uri()))
        .unwrap();
    let store = Arc::new(Mutex::new(store));
    let orchestrator = CrawlOrchestrator::new(Arc::new(create_fetcher()), Arc::clone(&store), 1);

    let results = orchestrator.crawl_urls(&[page_id]).await;

    assert!(!results[&page_id].success);
    let page = store.lock().unwrap().get(page_id).unwrap().unwrap();
    assert_eq!(page.status, PageStatus::Failed);
    assert_eq!(
        page.error_message.as_deref(),
        Some("Expected HTML, got application/json")
    );
}
