//! Pagewise main entry point
//!
//! This is the command-line interface for registering, discovering and
//! crawling a project's pages.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pagewise::config::{load_config_with_hash, Config};
use pagewise::crawler::{
    discover_pages, progress_channel, CrawlFrontier, CrawlOrchestrator, DiscoveryLimits,
    HttpFetcher,
};
use pagewise::output::{load_statistics, print_batch_summary, print_statistics};
use pagewise::storage::{open_store, PageStore, SqliteStore};
use pagewise::url::normalize_url;
use pagewise::PageStatus;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// Pagewise: priority-ordered site crawling for content audits
#[derive(Parser, Debug)]
#[command(name = "pagewise")]
#[command(version)]
#[command(about = "Priority-ordered site crawler for content audits", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "pagewise.toml", global = true)]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register page URLs as pending for a project
    Register {
        #[arg(short, long)]
        project: i64,

        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// Follow links from a start URL and register every page found
    Discover {
        #[arg(short, long)]
        project: i64,

        #[arg(value_name = "START_URL")]
        start_url: String,
    },

    /// Crawl a project's pending pages
    Crawl {
        #[arg(short, long)]
        project: i64,

        /// Crawl at most this many pages
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Return pages to pending so they are crawled again
    Reset {
        #[arg(short, long)]
        project: i64,

        #[arg(short, long, value_enum, default_value_t = ResetStatus::Failed)]
        status: ResetStatus,
    },

    /// Show a project's page statistics
    Stats {
        #[arg(short, long)]
        project: i64,
    },
}

/// Statuses that can be reset to pending
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResetStatus {
    Failed,
    Completed,
    Crawling,
}

impl From<ResetStatus> for PageStatus {
    fn from(status: ResetStatus) -> Self {
        match status {
            ResetStatus::Failed => PageStatus::Failed,
            ResetStatus::Completed => PageStatus::Completed,
            ResetStatus::Crawling => PageStatus::Crawling,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Register { project, urls } => handle_register(&config, project, &urls),
        Command::Discover { project, start_url } => {
            handle_discover(&config, project, &start_url).await
        }
        Command::Crawl { project, limit } => handle_crawl(&config, project, limit).await,
        Command::Reset { project, status } => handle_reset(&config, project, status.into()),
        Command::Stats { project } => handle_stats(&config, project),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagewise=info,warn"),
            1 => EnvFilter::new("pagewise=debug,info"),
            2 => EnvFilter::new("pagewise=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStore> {
    let path = Path::new(&config.storage.database_path);
    open_store(path).with_context(|| format!("failed to open database {}", path.display()))
}

fn handle_register(config: &Config, project: i64, urls: &[String]) -> anyhow::Result<()> {
    let options = config.frontier.normalize_options();
    let mut store = open_database(config)?;

    let mut registered = 0;
    for url in urls {
        let normalized = match normalize_url(url, &options) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", url, e);
                continue;
            }
        };
        let page_id = store.insert_page(project, normalized.as_str())?;
        println!("  [{}] {}", page_id, normalized);
        registered += 1;
    }

    println!("\n✓ Registered {} of {} URLs", registered, urls.len());
    Ok(())
}

async fn handle_discover(config: &Config, project: i64, start_url: &str) -> anyhow::Result<()> {
    let mut frontier = CrawlFrontier::from_config(start_url, &config.frontier)?;
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)
        .context("failed to build HTTP client")?;
    let mut store = open_database(config)?;

    let report = discover_pages(
        &fetcher,
        &mut store,
        project,
        &mut frontier,
        DiscoveryLimits::from_config(&config.crawler),
    )
    .await?;

    println!("=== Discovery Report ===\n");
    println!("  Pages registered: {}", report.pages_registered);
    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Links found: {}", report.links_found);
    println!("  Links queued: {}", report.links_queued);
    if report.skipped_too_deep > 0 {
        println!("  Skipped (too deep): {}", report.skipped_too_deep);
    }
    if !frontier.is_empty() {
        println!(
            "\n  {} URLs left unvisited (max-pages = {})",
            frontier.len(),
            config.crawler.max_pages
        );
    }

    Ok(())
}

async fn handle_crawl(config: &Config, project: i64, limit: Option<usize>) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)
        .context("failed to build HTTP client")?;
    let store = Arc::new(Mutex::new(open_database(config)?));

    let (progress_tx, mut progress_rx) = progress_channel(256);
    let reporter = tokio::spawn(async move {
        loop {
            match progress_rx.recv().await {
                Ok(event) => tracing::debug!(
                    "Page {} is {} ({} crawled, {} failed)",
                    event.page_id,
                    event.status,
                    event.pages_crawled,
                    event.pages_failed
                ),
                Err(RecvError::Lagged(missed)) => {
                    tracing::trace!("Progress reporter skipped {} events", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let orchestrator = CrawlOrchestrator::new(
        Arc::new(fetcher),
        Arc::clone(&store),
        config.crawler.concurrency_limit,
    )
    .with_progress(progress_tx);

    let results = orchestrator.crawl_pending_pages(project, limit).await?;

    // Dropping the orchestrator closes the channel and ends the reporter
    drop(orchestrator);
    let _ = reporter.await;

    if results.is_empty() {
        println!("No pending pages to crawl for project {}", project);
    } else {
        print_batch_summary(&results);
    }

    Ok(())
}

fn handle_reset(config: &Config, project: i64, status: PageStatus) -> anyhow::Result<()> {
    let mut store = open_database(config)?;
    let pages = store.list_by_project_and_status(project, status, None)?;

    for page in &pages {
        store.reset_page(page.id)?;
    }

    println!(
        "✓ Reset {} {} pages to pending in project {}",
        pages.len(),
        status,
        project
    );
    Ok(())
}

fn handle_stats(config: &Config, project: i64) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open_database(config)?;
    let stats = load_statistics(&store, project)?;
    print_statistics(&stats);

    Ok(())
}
