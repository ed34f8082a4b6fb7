//! Breadth-first fallback traversal used when sitemap resolution yields
//! nothing.
//!
//! A fixed pool of workers pulls from the shared frontier. All shared state
//! (visited set, pending queue, in-flight count, collected results) lives in
//! one session-scoped structure behind a mutex, so each check-then-insert is
//! serialized and a URL is fetched at most once even when two pages discover
//! it concurrently.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use scraper::{Html, Selector};
use tokio::sync::Mutex;
use url::Url;

use vitrina_core::SiteConfig;

use crate::client::FetchClient;
use crate::error::CrawlError;
use crate::frontier::Frontier;

/// How long an idle worker waits before re-checking the queue while peers
/// are still in flight.
const IDLE_POLL: Duration = Duration::from_millis(50);

struct WalkState {
    frontier: Frontier,
    in_flight: usize,
    collected: Vec<String>,
}

/// One crawl session. Constructed per run and handed to workers by
/// reference; never a process-wide singleton, so independent crawls can run
/// in one process and tests get fresh state.
pub struct CrawlWalker {
    client: Arc<FetchClient>,
    state: Arc<Mutex<WalkState>>,
    workers: usize,
    use_rate_limit: bool,
}

impl CrawlWalker {
    /// Builds a walker seeded with the site root.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidUrl`] when the configured root URL does
    /// not parse.
    pub fn new(client: Arc<FetchClient>, site: &SiteConfig) -> Result<Self, CrawlError> {
        let frontier = Frontier::new(site)?;
        Ok(Self {
            client,
            state: Arc::new(Mutex::new(WalkState {
                frontier,
                in_flight: 0,
                collected: Vec::new(),
            })),
            workers: site.concurrent_requests.max(1),
            use_rate_limit: site.use_rate_limit,
        })
    }

    /// Runs the traversal to completion and returns every successfully
    /// visited URL, in completion order.
    ///
    /// The walk ends when the frontier drains with no fetches in flight, or
    /// when the visited budget is reached — in-flight fetches then finish
    /// but enqueue nothing further.
    pub async fn walk(&self) -> Vec<String> {
        let mut handles = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            let client = Arc::clone(&self.client);
            let state = Arc::clone(&self.state);
            let use_rate_limit = self.use_rate_limit;
            handles.push(tokio::spawn(async move {
                worker_loop(worker, &client, &state, use_rate_limit).await;
            }));
        }
        for handle in handles {
            // A panicked worker only shrinks the pool; the others drain the
            // frontier on their own.
            let _ = handle.await;
        }

        let mut state = self.state.lock().await;
        tracing::info!(
            visited = state.frontier.visited_count(),
            collected = state.collected.len(),
            "crawl walk finished"
        );
        std::mem::take(&mut state.collected)
    }
}

async fn worker_loop(
    worker: usize,
    client: &FetchClient,
    state: &Mutex<WalkState>,
    use_rate_limit: bool,
) {
    loop {
        let url = {
            let mut guard = state.lock().await;
            match guard.frontier.next() {
                Some(url) => {
                    guard.in_flight += 1;
                    Some(url)
                }
                // Either the queue is momentarily empty while peers may
                // still discover links, or the budget is spent and the
                // in-flight count is draining to zero.
                None if guard.in_flight == 0 => return,
                None => None,
            }
        };

        let Some(url) = url else {
            tokio::time::sleep(IDLE_POLL).await;
            continue;
        };

        if use_rate_limit {
            let jitter: u64 = rand::rng().random_range(100..500);
            tokio::time::sleep(Duration::from_millis(jitter)).await;
        }

        match client.fetch_html(&url).await {
            Ok(page) => {
                let links = match Url::parse(&url) {
                    Ok(base) => extract_links(&base, &page.body),
                    Err(_) => Vec::new(),
                };
                let mut guard = state.lock().await;
                for link in &links {
                    guard.frontier.offer(link);
                }
                tracing::debug!(worker, url = %url, links = links.len(), "page crawled");
                guard.collected.push(url);
                guard.in_flight -= 1;
            }
            Err(err) => {
                tracing::warn!(worker, url = %url, error = %err, "page dropped from crawl");
                let mut guard = state.lock().await;
                guard.in_flight -= 1;
            }
        }
    }
}

/// Extracts anchor targets from a page, resolved against the page's own URL
/// and fragment-stripped. Scoping and dedup happen in the frontier.
fn extract_links(base: &Url, body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let anchors = Selector::parse("a[href]").expect("static selector");
    document
        .select(&anchors)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|mut resolved| {
            resolved.set_fragment(None);
            resolved.to_string()
        })
        .collect()
}
