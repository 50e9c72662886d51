//! Crawl orchestrator - bounded-concurrency page crawling
//!
//! The orchestrator takes page records from the store and, for each one:
//! 1. Persists `crawling` before any network activity
//! 2. Fetches the page while holding a concurrency slot
//! 3. Extracts content and persists `completed`, or persists `failed`
//!
//! Every page runs in its own task. A panic or store error in one task is
//! logged, the page is marked failed, and the rest of the batch carries on.

use crate::crawler::extractor::extract_content;
use crate::crawler::progress::{CrawlProgress, ProgressSender};
use crate::crawler::{CrawlResult, Fetcher};
use crate::state::PageStatus;
use crate::storage::{PageStore, StatusUpdate, StorageError, StorageResult};
use crate::Result;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fetches allowed in flight when no limit is configured
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Prefix of the error message stored on pages whose task died
const ABORTED_PREFIX: &str = "crawl task aborted";

/// Faults that end a page task without a crawl result
#[derive(Debug, Error)]
enum TaskFault {
    #[error("store error: {0}")]
    Storage(#[from] StorageError),

    #[error("page {0} disappeared during crawl")]
    PageVanished(i64),

    #[error("concurrency gate closed")]
    GateClosed,

    #[error("panic: {0}")]
    Panic(String),
}

/// What a page task hands back to the join loop
enum TaskOutcome {
    Finished(CrawlResult),
    Aborted(TaskFault),
}

/// A page that was moved to `crawling` and is ready to fetch
struct ClaimedPage {
    id: i64,
    project_id: i64,
    url: String,
}

/// Drives fetch, extraction and status persistence for batches of pages
///
/// # Example
///
/// ```no_run
/// use pagewise::crawler::{CrawlOrchestrator, HttpFetcher};
/// use pagewise::storage::SqliteStore;
/// use std::sync::{Arc, Mutex};
///
/// # async fn run(fetcher: HttpFetcher) -> pagewise::Result<()> {
/// let store = Arc::new(Mutex::new(SqliteStore::in_memory()?));
/// let orchestrator = CrawlOrchestrator::new(Arc::new(fetcher), store, 5);
///
/// let results = orchestrator.crawl_pending_pages(1, Some(50)).await?;
/// println!("Crawled {} pages", results.len());
/// # Ok(())
/// # }
/// ```
pub struct CrawlOrchestrator<F, S> {
    fetcher: Arc<F>,
    store: Arc<Mutex<S>>,
    semaphore: Arc<Semaphore>,
    concurrency_limit: usize,
    progress: Option<ProgressSender>,
}

impl<F, S> CrawlOrchestrator<F, S>
where
    F: Fetcher + 'static,
    S: PageStore + Send + 'static,
{
    /// Creates an orchestrator; a limit of 0 is treated as 1
    pub fn new(fetcher: Arc<F>, store: Arc<Mutex<S>>, concurrency_limit: usize) -> Self {
        let concurrency_limit = concurrency_limit.max(1);

        Self {
            fetcher,
            store,
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            concurrency_limit,
            progress: None,
        }
    }

    /// Publishes a `CrawlProgress` event after every page status change
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Crawls the given pages concurrently
    ///
    /// Returns one result per page whose task finished, failed fetches
    /// included. Unknown ids, pages that are not `pending`, and pages whose
    /// task aborted are left out. Completion order is not preserved.
    pub async fn crawl_urls(&self, page_ids: &[i64]) -> HashMap<i64, CrawlResult> {
        let mut results = HashMap::new();
        if page_ids.is_empty() {
            return results;
        }

        let started = Instant::now();
        tracing::info!(
            "Crawling {} pages with concurrency {}",
            page_ids.len(),
            self.concurrency_limit
        );

        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<i64, i64> = HashMap::new();

        for &page_id in page_ids {
            let Some(page) = self.claim_page(page_id) else {
                continue;
            };
            in_flight.insert(page.id, page.project_id);

            let fetcher = Arc::clone(&self.fetcher);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&self.semaphore);

            tasks.spawn(async move {
                let page_id = page.id;
                let outcome =
                    AssertUnwindSafe(crawl_page(fetcher, store, semaphore, page.id, page.url))
                        .catch_unwind()
                        .await;

                let outcome = match outcome {
                    Ok(Ok(result)) => TaskOutcome::Finished(result),
                    Ok(Err(fault)) => TaskOutcome::Aborted(fault),
                    Err(payload) => TaskOutcome::Aborted(TaskFault::Panic(panic_message(&*payload))),
                };
                (page_id, outcome)
            });
        }

        let mut pages_crawled = 0;
        let mut pages_failed = 0;
        let mut aborted = HashSet::new();

        while let Some(joined) = tasks.join_next().await {
            let (page_id, outcome) = match joined {
                Ok(joined) => joined,
                Err(e) => {
                    // Panics are caught inside the task; anything here is a cancellation
                    tracing::error!("Crawl task ended abnormally: {}", e);
                    continue;
                }
            };
            let project_id = in_flight.remove(&page_id).unwrap_or_default();

            match outcome {
                TaskOutcome::Finished(result) => {
                    let status = if result.success {
                        pages_crawled += 1;
                        PageStatus::Completed
                    } else {
                        pages_failed += 1;
                        PageStatus::Failed
                    };
                    self.publish(project_id, page_id, status, pages_crawled, pages_failed);
                    results.insert(page_id, result);
                }
                TaskOutcome::Aborted(fault) => {
                    tracing::error!("Crawl task for page {} aborted: {}", page_id, fault);
                    pages_failed += 1;
                    self.abandon_page(page_id, &fault.to_string());
                    self.publish(project_id, page_id, PageStatus::Failed, pages_crawled, pages_failed);
                    aborted.insert(page_id);
                }
            }
        }

        // Tasks that never reported back still need to leave `crawling`
        for (page_id, project_id) in in_flight {
            pages_failed += 1;
            self.abandon_page(page_id, "task did not report a result");
            self.publish(project_id, page_id, PageStatus::Failed, pages_crawled, pages_failed);
            aborted.insert(page_id);
        }

        tracing::info!(
            "Crawl batch finished: {} completed, {} failed, {} aborted in {:?}",
            pages_crawled,
            pages_failed - aborted.len(),
            aborted.len(),
            started.elapsed()
        );

        results
    }

    /// Crawls up to `limit` of a project's `pending` pages, oldest first
    ///
    /// # Errors
    ///
    /// Returns the store error if the pending pages cannot be listed.
    pub async fn crawl_pending_pages(
        &self,
        project_id: i64,
        limit: Option<usize>,
    ) -> Result<HashMap<i64, CrawlResult>> {
        let page_ids = self.pending_page_ids(project_id, limit)?;

        if page_ids.is_empty() {
            tracing::info!("No pending pages for project {}", project_id);
        }

        Ok(self.crawl_urls(&page_ids).await)
    }

    fn pending_page_ids(&self, project_id: i64, limit: Option<usize>) -> StorageResult<Vec<i64>> {
        let store = lock_store(&self.store)?;
        let pages = store.list_by_project_and_status(project_id, PageStatus::Pending, limit)?;
        Ok(pages.into_iter().map(|page| page.id).collect())
    }

    /// Moves a pending page to `crawling`; None if the page must be skipped
    fn claim_page(&self, page_id: i64) -> Option<ClaimedPage> {
        let claimed = lock_store(&self.store).and_then(|mut store| {
            let Some(page) = store.get(page_id)? else {
                tracing::warn!("Skipping unknown page {}", page_id);
                return Ok(None);
            };

            if page.status != PageStatus::Pending {
                tracing::warn!(
                    "Skipping page {} ({}): status is {}",
                    page_id,
                    page.url,
                    page.status
                );
                return Ok(None);
            }

            Ok(store
                .update_status(page_id, StatusUpdate::crawling())?
                .map(|page| ClaimedPage {
                    id: page.id,
                    project_id: page.project_id,
                    url: page.url,
                }))
        });

        match claimed {
            Ok(Some(page)) => {
                tracing::debug!("Page {} is crawling: {}", page.id, page.url);
                self.publish(page.project_id, page.id, PageStatus::Crawling, 0, 0);
                Some(page)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Could not start crawl of page {}: {}", page_id, e);
                None
            }
        }
    }

    /// Marks a page whose task died as failed so it is not stuck in `crawling`
    fn abandon_page(&self, page_id: i64, reason: &str) {
        let message = format!("{}: {}", ABORTED_PREFIX, reason);

        let outcome = lock_store(&self.store).and_then(|mut store| {
            let current = store.get(page_id)?;
            match current {
                Some(page) if page.status == PageStatus::Crawling => store
                    .update_status(page_id, StatusUpdate::failed(message, Utc::now()))
                    .map(|_| ()),
                _ => Ok(()),
            }
        });

        if let Err(e) = outcome {
            tracing::error!("Could not mark aborted page {} as failed: {}", page_id, e);
        }
    }

    fn publish(
        &self,
        project_id: i64,
        page_id: i64,
        status: PageStatus,
        pages_crawled: usize,
        pages_failed: usize,
    ) {
        if let Some(sender) = &self.progress {
            // No receivers is fine
            let _ = sender.send(CrawlProgress {
                project_id,
                page_id,
                status,
                pages_crawled,
                pages_failed,
            });
        }
    }
}

fn lock_store<S>(store: &Mutex<S>) -> StorageResult<MutexGuard<'_, S>> {
    store.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Fetches one claimed page and persists its final status
async fn crawl_page<F, S>(
    fetcher: Arc<F>,
    store: Arc<Mutex<S>>,
    semaphore: Arc<Semaphore>,
    page_id: i64,
    url: String,
) -> std::result::Result<CrawlResult, TaskFault>
where
    F: Fetcher,
    S: PageStore,
{
    let permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| TaskFault::GateClosed)?;

    let started = Instant::now();
    let result = match fetcher.fetch(&url).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Fetcher error for {}: {}", url, e);
            CrawlResult::failure(&url, e.to_string()).with_duration(started.elapsed())
        }
    };
    drop(permit);

    let now = Utc::now();
    let update = if result.success {
        StatusUpdate::completed(extract_content(&result), now)
    } else {
        tracing::debug!("Fetch failed for {}: {}", url, result.error_message());
        StatusUpdate::failed(result.error_message(), now)
    };

    let updated = {
        let mut store = lock_store(&store)?;
        store.update_status(page_id, update)?
    };

    match updated {
        Some(page) => {
            tracing::debug!("Page {} is {}: {}", page_id, page.status, url);
            Ok(result)
        }
        None => Err(TaskFault::PageVanished(page_id)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::progress_channel;
    use crate::storage::{PageContent, PageRecord, SqliteStore};
    use crate::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PROJECT: i64 = 1;

    /// Behaves according to the URL path:
    /// `/missing` fails with 404, `/error` returns `Err`, `/panic` panics,
    /// anything else succeeds with a small HTML page
    #[derive(Default)]
    struct FakeFetcher {
        delay: Option<Duration>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeFetcher {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<CrawlResult, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.ends_with("/missing") {
                Ok(CrawlResult::failure(url, "HTTP 404").with_status_code(404))
            } else if url.ends_with("/error") {
                Err(FetchError::Unavailable("render pool exhausted".to_string()))
            } else if url.ends_with("/panic") {
                panic!("renderer crashed");
            } else {
                Ok(CrawlResult::success(
                    url,
                    "<html><head><title>Fresh</title><meta name=\"description\" content=\"d\"></head>\
                     <body><h1>Welcome</h1><p>three word body</p></body></html>",
                    200,
                ))
            }
        }
    }

    fn setup(paths: &[&str]) -> (Arc<Mutex<SqliteStore>>, Vec<i64>) {
        let mut store = SqliteStore::in_memory().unwrap();
        let ids = paths
            .iter()
            .map(|path| {
                store
                    .insert_page(PROJECT, &format!("https://example.com{}", path))
                    .unwrap()
            })
            .collect();
        (Arc::new(Mutex::new(store)), ids)
    }

    fn orchestrator(
        fetcher: FakeFetcher,
        store: &Arc<Mutex<SqliteStore>>,
        limit: usize,
    ) -> CrawlOrchestrator<FakeFetcher, SqliteStore> {
        CrawlOrchestrator::new(Arc::new(fetcher), Arc::clone(store), limit)
    }

    fn page(store: &Arc<Mutex<SqliteStore>>, id: i64) -> PageRecord {
        store.lock().unwrap().get(id).unwrap().unwrap()
    }

    /// How `FaultyStore` mishandles the final write of its target page
    #[derive(Clone, Copy)]
    enum WriteFault {
        Error,
        Vanish,
    }

    /// SQLite store that breaks the `completed` write of one page
    struct FaultyStore {
        inner: SqliteStore,
        target: i64,
        fault: WriteFault,
    }

    impl PageStore for FaultyStore {
        fn insert_page(&mut self, project_id: i64, url: &str) -> StorageResult<i64> {
            self.inner.insert_page(project_id, url)
        }

        fn get(&self, page_id: i64) -> StorageResult<Option<PageRecord>> {
            self.inner.get(page_id)
        }

        fn list_by_project_and_status(
            &self,
            project_id: i64,
            status: PageStatus,
            limit: Option<usize>,
        ) -> StorageResult<Vec<PageRecord>> {
            self.inner.list_by_project_and_status(project_id, status, limit)
        }

        fn update_status(
            &mut self,
            page_id: i64,
            update: StatusUpdate,
        ) -> StorageResult<Option<PageRecord>> {
            if page_id == self.target && update.status == PageStatus::Completed {
                return match self.fault {
                    WriteFault::Error => Err(StorageError::Database("disk full".to_string())),
                    WriteFault::Vanish => Ok(None),
                };
            }
            self.inner.update_status(page_id, update)
        }

        fn count_by_status(&self, project_id: i64, status: PageStatus) -> StorageResult<u64> {
            self.inner.count_by_status(project_id, status)
        }

        fn count_pages(&self, project_id: i64) -> StorageResult<u64> {
            self.inner.count_pages(project_id)
        }

        fn total_word_count(&self, project_id: i64) -> StorageResult<u64> {
            self.inner.total_word_count(project_id)
        }
    }

    /// Crawls `/a`, `/b`, `/c` with the `completed` write of `/b` broken
    async fn crawl_with_faulty_store(
        fault: WriteFault,
    ) -> (HashMap<i64, CrawlResult>, Arc<Mutex<FaultyStore>>, Vec<i64>) {
        let mut inner = SqliteStore::in_memory().unwrap();
        let ids: Vec<i64> = ["/a", "/b", "/c"]
            .iter()
            .map(|path| {
                inner
                    .insert_page(PROJECT, &format!("https://example.com{}", path))
                    .unwrap()
            })
            .collect();
        let store = Arc::new(Mutex::new(FaultyStore {
            inner,
            target: ids[1],
            fault,
        }));
        let orchestrator =
            CrawlOrchestrator::new(Arc::new(FakeFetcher::default()), Arc::clone(&store), 2);

        let results = orchestrator.crawl_urls(&ids).await;
        (results, store, ids)
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let (store, _) = setup(&[]);
        let orchestrator = orchestrator(FakeFetcher::default(), &store, 0);
        assert_eq!(orchestrator.concurrency_limit(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_does_nothing() {
        let (store, _) = setup(&["/"]);
        let fetcher = Arc::new(FakeFetcher::default());
        let orchestrator = CrawlOrchestrator::new(Arc::clone(&fetcher), store, 5);

        let results = orchestrator.crawl_urls(&[]).await;

        assert!(results.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_page_is_omitted() {
        let (store, _) = setup(&[]);
        let fetcher = Arc::new(FakeFetcher::default());
        let orchestrator = CrawlOrchestrator::new(Arc::clone(&fetcher), store, 5);

        let results = orchestrator.crawl_urls(&[999]).await;

        assert!(results.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_persists_content() {
        let (store, ids) = setup(&["/"]);
        let orchestrator = orchestrator(FakeFetcher::default(), &store, 5);

        let results = orchestrator.crawl_urls(&ids).await;

        assert_eq!(results.len(), 1);
        assert!(results[&ids[0]].success);

        let record = page(&store, ids[0]);
        assert_eq!(record.status, PageStatus::Completed);
        assert_eq!(record.title.as_deref(), Some("Fresh"));
        assert_eq!(record.meta_description.as_deref(), Some("d"));
        assert_eq!(
            record.headings.unwrap().get("h1"),
            Some(&vec!["Welcome".to_string()])
        );
        assert_eq!(record.body_content.as_deref(), Some("Welcome three word body"));
        assert_eq!(record.word_count, Some(4));
        assert_eq!(record.error_message, None);
        assert!(record.last_crawled_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_content() {
        let (store, ids) = setup(&["/missing"]);
        {
            let mut guard = store.lock().unwrap();
            guard.update_status(ids[0], StatusUpdate::crawling()).unwrap();
            let content = PageContent {
                title: Some("Old title".to_string()),
                body_content: "old body".to_string(),
                word_count: 2,
                ..PageContent::default()
            };
            guard
                .update_status(ids[0], StatusUpdate::completed(content, Utc::now()))
                .unwrap();
            guard.reset_page(ids[0]).unwrap();
        }

        let orchestrator = orchestrator(FakeFetcher::default(), &store, 5);
        let results = orchestrator.crawl_urls(&ids).await;

        let result = &results[&ids[0]];
        assert!(!result.success);
        assert_eq!(result.status_code, Some(404));

        let record = page(&store, ids[0]);
        assert_eq!(record.status, PageStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("HTTP 404"));
        assert_eq!(record.title.as_deref(), Some("Old title"));
        assert_eq!(record.word_count, Some(2));
        assert!(record.last_crawled_at.is_some());
    }

    #[tokio::test]
    async fn test_fetcher_error_is_a_failed_page() {
        let (store, ids) = setup(&["/error"]);
        let orchestrator = orchestrator(FakeFetcher::default(), &store, 5);

        let results = orchestrator.crawl_urls(&ids).await;

        let result = &results[&ids[0]];
        assert!(!result.success);
        assert!(result.error_message().contains("render pool exhausted"));

        let record = page(&store, ids[0]);
        assert_eq!(record.status, PageStatus::Failed);
        assert!(record
            .error_message
            .unwrap()
            .contains("render pool exhausted"));
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let (store, ids) = setup(&["/a", "/panic", "/b"]);
        let orchestrator = orchestrator(FakeFetcher::default(), &store, 2);

        let results = orchestrator.crawl_urls(&ids).await;

        assert_eq!(results.len(), 2);
        assert!(results.contains_key(&ids[0]));
        assert!(!results.contains_key(&ids[1]));
        assert!(results.contains_key(&ids[2]));

        let record = page(&store, ids[1]);
        assert_eq!(record.status, PageStatus::Failed);
        let message = record.error_message.unwrap();
        assert!(message.starts_with("crawl task aborted"));
        assert!(message.contains("renderer crashed"));

        assert_eq!(page(&store, ids[0]).status, PageStatus::Completed);
        assert_eq!(page(&store, ids[2]).status, PageStatus::Completed);
    }

    #[tokio::test]
    async fn test_store_error_is_isolated() {
        let (results, store, ids) = crawl_with_faulty_store(WriteFault::Error).await;

        assert_eq!(results.len(), 2);
        assert!(!results.contains_key(&ids[1]));

        let guard = store.lock().unwrap();
        let record = guard.get(ids[1]).unwrap().unwrap();
        assert_eq!(record.status, PageStatus::Failed);
        let message = record.error_message.unwrap();
        assert!(message.starts_with("crawl task aborted"));
        assert!(message.contains("disk full"));

        assert_eq!(guard.get(ids[0]).unwrap().unwrap().status, PageStatus::Completed);
        assert_eq!(guard.get(ids[2]).unwrap().unwrap().status, PageStatus::Completed);
    }

    #[tokio::test]
    async fn test_vanished_page_is_isolated() {
        let (results, store, ids) = crawl_with_faulty_store(WriteFault::Vanish).await;

        assert_eq!(results.len(), 2);
        assert!(!results.contains_key(&ids[1]));

        let guard = store.lock().unwrap();
        let record = guard.get(ids[1]).unwrap().unwrap();
        assert_eq!(record.status, PageStatus::Failed);
        let message = record.error_message.unwrap();
        assert!(message.starts_with("crawl task aborted"));
        assert!(message.contains("disappeared"));

        assert_eq!(guard.get(ids[0]).unwrap().unwrap().status, PageStatus::Completed);
        assert_eq!(guard.get(ids[2]).unwrap().unwrap().status, PageStatus::Completed);
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_respected() {
        let (store, ids) = setup(&["/1", "/2", "/3", "/4", "/5"]);
        let fetcher = Arc::new(FakeFetcher::with_delay(Duration::from_millis(50)));
        let orchestrator = CrawlOrchestrator::new(Arc::clone(&fetcher), Arc::clone(&store), 2);

        let results = orchestrator.crawl_urls(&ids).await;

        assert_eq!(results.len(), 5);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);
        let max = fetcher.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 2, "saw {} fetches in flight", max);
        assert!(max >= 1);
    }

    #[tokio::test]
    async fn test_non_pending_pages_are_skipped() {
        let (store, ids) = setup(&["/done", "/queued"]);
        {
            let mut guard = store.lock().unwrap();
            guard.update_status(ids[0], StatusUpdate::crawling()).unwrap();
            guard
                .update_status(ids[0], StatusUpdate::completed(PageContent::default(), Utc::now()))
                .unwrap();
        }
        let fetcher = Arc::new(FakeFetcher::default());
        let orchestrator = CrawlOrchestrator::new(Arc::clone(&fetcher), Arc::clone(&store), 5);

        // Duplicate ids are claimed once
        let results = orchestrator.crawl_urls(&[ids[0], ids[1], ids[1]]).await;

        assert_eq!(results.len(), 1);
        assert!(results.contains_key(&ids[1]));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_crawl_pending_pages_respects_limit() {
        let (store, ids) = setup(&["/a", "/b", "/c", "/d"]);
        {
            let mut guard = store.lock().unwrap();
            guard.update_status(ids[0], StatusUpdate::crawling()).unwrap();
            guard
                .update_status(ids[0], StatusUpdate::failed("HTTP 500", Utc::now()))
                .unwrap();
            guard
                .insert_page(PROJECT + 1, "https://example.com/other-project")
                .unwrap();
        }
        let orchestrator = orchestrator(FakeFetcher::default(), &store, 5);

        let first = orchestrator.crawl_pending_pages(PROJECT, Some(2)).await.unwrap();
        let mut first_ids: Vec<i64> = first.keys().copied().collect();
        first_ids.sort();
        assert_eq!(first_ids, vec![ids[1], ids[2]]);

        let second = orchestrator.crawl_pending_pages(PROJECT, None).await.unwrap();
        assert_eq!(second.keys().copied().collect::<Vec<_>>(), vec![ids[3]]);

        let third = orchestrator.crawl_pending_pages(PROJECT, None).await.unwrap();
        assert!(third.is_empty());

        // Failed page is untouched, other project still pending
        assert_eq!(page(&store, ids[0]).status, PageStatus::Failed);
        let guard = store.lock().unwrap();
        assert_eq!(
            guard.count_by_status(PROJECT + 1, PageStatus::Pending).unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_progress_events() {
        let (store, ids) = setup(&["/ok", "/missing"]);
        let (tx, mut rx) = progress_channel(16);
        let orchestrator = orchestrator(FakeFetcher::default(), &store, 1).with_progress(tx);

        orchestrator.crawl_urls(&ids).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert!(events[..2]
            .iter()
            .all(|e| e.status == PageStatus::Crawling && e.project_id == PROJECT));

        let last = events.last().unwrap();
        assert_eq!(last.pages_crawled, 1);
        assert_eq!(last.pages_failed, 1);

        let finished: HashMap<i64, PageStatus> =
            events[2..].iter().map(|e| (e.page_id, e.status)).collect();
        assert_eq!(finished[&ids[0]], PageStatus::Completed);
        assert_eq!(finished[&ids[1]], PageStatus::Failed);
    }
}
