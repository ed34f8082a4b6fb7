//! Pipeline orchestration: URL discovery → title fetch → product selection
//! → detail extraction → classified persistence, batch by batch until the
//! target count is reached, the URLs run out, or the user interrupts.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use scraper::Html;
use url::Url;

use vitrina_core::record::TITLE_NOT_FOUND;
use vitrina_core::{
    AppConfig, ClassifiedPage, DiscardReason, DiscardedPage, SiteConfig, TitledUrl,
};
use vitrina_crawler::frontier::{host_in_scope, is_crawlable_path, normalize_url};
use vitrina_crawler::{resolve_sitemaps, CrawlWalker, FetchClient};
use vitrina_extract::{classify_page, resolve_title, validate_selectors};
use vitrina_select::SelectorClient;
use vitrina_store::ResultStore;

/// Runs the full pipeline for one site.
pub async fn run_crawl(
    app: &AppConfig,
    site: &SiteConfig,
    site_path: &Path,
    execution: Option<u32>,
) -> anyhow::Result<()> {
    validate_selectors(site).context("site selector configuration is invalid")?;
    let api_key = app
        .llm_api_key
        .as_deref()
        .context("VITRINA_LLM_API_KEY is required for product selection")?;
    let selector = SelectorClient::new(
        &app.llm_api_base,
        api_key,
        &app.llm_model,
        app.llm_temperature,
        site.request_timeout_secs,
    )?;

    let mut store = ResultStore::open(&app.results_dir, &site.root_url, execution)?;
    store.snapshot_config(site_path)?;
    tracing::info!(
        execution = store.execution(),
        dir = %store.dir().display(),
        resumed_products = store.totals().products(),
        "result store ready"
    );

    let client = Arc::new(FetchClient::new(
        site.request_timeout_secs,
        &app.user_agent,
        site.concurrent_requests,
        app.max_retries,
        app.retry_backoff_base_secs,
        site.use_rate_limit,
    )?);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received — finishing the current batch and flushing");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    let urls = discover_urls(&client, site).await?;
    let urls = prepare_urls(urls, site, store.processed_urls());
    tracing::info!(candidates = urls.len(), "url discovery finished");

    let mut total_products = store.totals().products();

    for batch in urls.chunks(site.crawl_batch_size) {
        if shutdown.load(Ordering::SeqCst) {
            tracing::info!("stopping on interrupt");
            break;
        }
        if total_products >= site.target_products {
            break;
        }

        let titled = fetch_titles(&client, site, batch).await;
        let fresh = dedupe_candidates(&titled, store.processed_titles());
        store.record_processed(&titled)?;

        let selected = selector.select_product_urls(site, &fresh).await;
        let classified = fetch_details(&client, site, &selected).await;

        let summary = store.append(&classified)?;
        total_products += summary.saved_products();
        tracing::info!(
            batch = batch.len(),
            titles = fresh.len(),
            selected = selected.len(),
            saved = summary.saved_products(),
            without_stock = summary.saved_without_stock,
            discarded = summary.discarded,
            duplicates = summary.duplicates,
            total = total_products,
            "batch complete"
        );

        if total_products >= site.target_products {
            tracing::info!(target = site.target_products, "target product count reached");
            break;
        }
    }

    let totals = store.totals();
    tracing::info!(
        in_stock = totals.in_stock,
        without_stock = totals.without_stock,
        discarded = totals.discarded,
        "crawl finished"
    );
    Ok(())
}

/// Prints the sitemap groups a domain publishes, without crawling anything.
pub async fn report_sitemaps(app: &AppConfig, site: &SiteConfig) -> anyhow::Result<()> {
    let client = FetchClient::new(
        site.request_timeout_secs,
        &app.user_agent,
        site.concurrent_requests,
        app.max_retries,
        app.retry_backoff_base_secs,
        site.use_rate_limit,
    )?;
    let groups = resolve_sitemaps(
        &client,
        &site.root_url,
        site.max_sitemap_depth,
        site.concurrent_requests,
    )
    .await?;

    if groups.is_empty() {
        println!("no sitemap found for {}", site.root_url);
        return Ok(());
    }
    let mut total = 0usize;
    for group in &groups {
        println!("{} ({} urls)", group.source, group.urls.len());
        total += group.urls.len();
    }
    println!("{} urls in {} groups", total, groups.len());
    Ok(())
}

/// Sitemap discovery first; breadth-first link crawl when it yields nothing.
async fn discover_urls(
    client: &Arc<FetchClient>,
    site: &SiteConfig,
) -> anyhow::Result<Vec<String>> {
    if site.use_sitemap {
        let groups = resolve_sitemaps(
            client.as_ref(),
            &site.root_url,
            site.max_sitemap_depth,
            site.concurrent_requests,
        )
        .await?;
        if !groups.is_empty() {
            for group in &groups {
                tracing::info!(source = %group.source, urls = group.urls.len(), "sitemap group");
            }
            return Ok(groups.into_iter().flat_map(|g| g.urls).collect());
        }
        tracing::info!("sitemap resolution yielded nothing — falling back to link crawl");
    }

    let walker = CrawlWalker::new(Arc::clone(client), site)?;
    Ok(walker.walk().await)
}

/// Normalizes, scopes, filters, and dedupes discovered URLs, dropping any
/// already processed in this execution. Order is preserved.
fn prepare_urls(
    urls: Vec<String>,
    site: &SiteConfig,
    processed: &HashSet<String>,
) -> Vec<String> {
    let root_host = Url::parse(&site.root_url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    for raw in urls {
        let Ok(normalized) = normalize_url(&raw) else {
            continue;
        };
        if processed.contains(&normalized) || !seen.insert(normalized.clone()) {
            continue;
        }
        let Ok(parsed) = Url::parse(&normalized) else {
            continue;
        };
        let in_scope = parsed
            .host_str()
            .is_some_and(|host| host_in_scope(&root_host, host, site.include_subdomains));
        if !in_scope || !is_crawlable_path(&parsed) {
            continue;
        }
        if let Some(fragment) = site.ignore_urls_with.as_deref().filter(|s| !s.is_empty()) {
            if normalized.contains(fragment) {
                continue;
            }
        }
        if site.ignore_links.contains(&normalized) {
            continue;
        }
        prepared.push(normalized);
    }
    prepared
}

/// Fetches a batch of pages and resolves each one's title; pages that fail
/// to fetch or resolve keep the title sentinel so they are still recorded
/// as processed.
async fn fetch_titles(
    client: &Arc<FetchClient>,
    site: &SiteConfig,
    urls: &[String],
) -> Vec<TitledUrl> {
    stream::iter(urls)
        .map(|url| {
            let client = Arc::clone(client);
            async move {
                let title = match client.fetch_html(url).await {
                    Ok(page) => resolve_page_title(&page.body, site),
                    Err(err) => {
                        tracing::warn!(url = %url, error = %err, "title fetch failed");
                        None
                    }
                };
                TitledUrl {
                    url: url.clone(),
                    title: title.unwrap_or_else(|| TITLE_NOT_FOUND.to_string()),
                }
            }
        })
        .buffer_unordered(site.concurrent_requests)
        .collect()
        .await
}

fn resolve_page_title(body: &str, site: &SiteConfig) -> Option<String> {
    let html = Html::parse_document(body);
    resolve_title(&html, site)
}

/// Drops unresolved titles, titles already processed in an earlier batch or
/// run, and within-batch title duplicates.
fn dedupe_candidates(titled: &[TitledUrl], processed_titles: &HashSet<String>) -> Vec<TitledUrl> {
    let mut seen = HashSet::new();
    titled
        .iter()
        .filter(|pair| pair.title != TITLE_NOT_FOUND)
        .filter(|pair| !processed_titles.contains(&pair.title))
        .filter(|pair| seen.insert(pair.title.clone()))
        .cloned()
        .collect()
}

/// Fetches each selected product page and classifies it; fetch failures
/// become discarded entries so they stay reviewable.
async fn fetch_details(
    client: &Arc<FetchClient>,
    site: &SiteConfig,
    selected: &[TitledUrl],
) -> Vec<ClassifiedPage> {
    stream::iter(selected)
        .map(|pair| {
            let client = Arc::clone(client);
            async move {
                match client.fetch_html(&pair.url).await {
                    Ok(page) => classify_document(&page.body, pair, site),
                    Err(err) => {
                        tracing::warn!(url = %pair.url, error = %err, "product page unavailable");
                        ClassifiedPage::Discarded(DiscardedPage {
                            url: pair.url.clone(),
                            title: pair.title.clone(),
                            reason: DiscardReason::FetchFailed,
                        })
                    }
                }
            }
        })
        .buffer_unordered(site.concurrent_requests)
        .collect()
        .await
}

fn classify_document(body: &str, pair: &TitledUrl, site: &SiteConfig) -> ClassifiedPage {
    let html = Html::parse_document(body);
    let known_title = Some(pair.title.as_str()).filter(|t| *t != TITLE_NOT_FOUND);
    classify_page(&pair.url, known_title, &html, site)
}
