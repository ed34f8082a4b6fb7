//! Sitemap discovery and recursive expansion.
//!
//! Discovery order: `robots.txt` `Sitemap:` directives first, then a fixed
//! list of well-known paths. Index documents are expanded level by level so
//! siblings resolve independently while a child is only fetched after its
//! parent index parsed. Failures are contained to the failing node; a bad
//! child never aborts its siblings or the overall resolve call.

use futures::stream::{self, StreamExt};
use quick_xml::events::Event;
use quick_xml::Reader;
use url::Url;

use crate::client::FetchClient;
use crate::error::CrawlError;

/// Well-known sitemap locations probed when `robots.txt` names none.
const WELL_KNOWN_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/sitemap/sitemap.xml",
];

/// One leaf sitemap document: its own source URL plus the page URLs it lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapGroup {
    pub source: String,
    pub urls: Vec<String>,
}

#[derive(Debug)]
pub(crate) enum SitemapDoc {
    /// A sitemap-of-sitemaps: child sitemap URLs.
    Index(Vec<String>),
    /// A leaf URL set: page URLs.
    UrlSet(Vec<String>),
}

enum NodeOutcome {
    Index(Vec<String>),
    Leaf(Vec<String>),
    Failed,
}

/// Resolves all sitemap URL groups for a domain.
///
/// Returns an empty list when the site publishes no sitemap. Per-node
/// network or parse failures yield an empty result for that node only.
///
/// # Errors
///
/// Returns [`CrawlError::InvalidUrl`] only when `root_url` itself does not
/// parse; everything downstream is contained.
pub async fn resolve_sitemaps(
    client: &FetchClient,
    root_url: &str,
    max_depth: usize,
    concurrency: usize,
) -> Result<Vec<SitemapGroup>, CrawlError> {
    let base = Url::parse(root_url).map_err(|e| CrawlError::InvalidUrl {
        url: root_url.to_owned(),
        reason: e.to_string(),
    })?;

    let entries = discover_entries(client, &base).await;
    if entries.is_empty() {
        tracing::info!(root = %root_url, "no sitemap found");
        return Ok(Vec::new());
    }

    let mut groups = Vec::new();
    let mut level = entries;
    let mut depth = 1usize;

    while !level.is_empty() {
        if depth > max_depth {
            tracing::warn!(
                depth,
                max_depth,
                dropped = level.len(),
                "sitemap recursion exceeds depth cap — dropping deeper nodes"
            );
            break;
        }

        let results: Vec<(String, NodeOutcome)> = stream::iter(level.drain(..))
            .map(|url| async move {
                let outcome = expand_node(client, &url).await;
                (url, outcome)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut next_level = Vec::new();
        for (source, outcome) in results {
            match outcome {
                NodeOutcome::Index(children) => {
                    tracing::debug!(source = %source, children = children.len(), "sitemap index expanded");
                    next_level.extend(children);
                }
                NodeOutcome::Leaf(urls) => {
                    tracing::debug!(source = %source, urls = urls.len(), "sitemap url set collected");
                    groups.push(SitemapGroup { source, urls });
                }
                NodeOutcome::Failed => {}
            }
        }

        level = next_level;
        depth += 1;
    }

    Ok(groups)
}

/// Finds the entry sitemap URLs: every `Sitemap:` directive in `robots.txt`,
/// else the first well-known path answering HTTP 200.
async fn discover_entries(client: &FetchClient, base: &Url) -> Vec<String> {
    let mut entries = Vec::new();

    if let Ok(robots_url) = base.join("/robots.txt") {
        match client.fetch(robots_url.as_str()).await {
            Ok(page) => {
                for line in page.body.lines() {
                    let line = line.trim();
                    if line.len() > 8 && line[..8].eq_ignore_ascii_case("sitemap:") {
                        let loc = line[8..].trim();
                        if !loc.is_empty() {
                            entries.push(loc.to_owned());
                        }
                    }
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "robots.txt not available");
            }
        }
    }

    if entries.is_empty() {
        for path in WELL_KNOWN_PATHS {
            let Ok(candidate) = base.join(path) else {
                continue;
            };
            if client.probe(candidate.as_str()).await {
                entries.push(candidate.to_string());
                break;
            }
        }
    }

    entries
}

/// Fetches and parses one sitemap node. All failures collapse to
/// `NodeOutcome::Failed` so siblings keep resolving.
async fn expand_node(client: &FetchClient, url: &str) -> NodeOutcome {
    let page = match client.fetch(url).await {
        Ok(page) => page,
        Err(CrawlError::Forbidden { .. }) => {
            tracing::warn!(url = %url, "sitemap forbidden — treating as not found");
            return NodeOutcome::Failed;
        }
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "sitemap fetch failed");
            return NodeOutcome::Failed;
        }
    };

    match parse_sitemap(&page.body, url) {
        Ok(SitemapDoc::Index(children)) => NodeOutcome::Index(children),
        Ok(SitemapDoc::UrlSet(urls)) => NodeOutcome::Leaf(urls),
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "sitemap parse failed");
            NodeOutcome::Failed
        }
    }
}

/// Parses one sitemap XML document into an index or a URL set, keyed off the
/// root element (`<sitemapindex>` vs `<urlset>`).
pub(crate) fn parse_sitemap(xml: &str, url: &str) -> Result<SitemapDoc, CrawlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut is_index: Option<bool> = None;
    let mut locs: Vec<String> = Vec::new();
    let mut in_loc = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                match e.local_name().as_ref() {
                    b"sitemapindex" => is_index = is_index.or(Some(true)),
                    b"urlset" => is_index = is_index.or(Some(false)),
                    b"loc" => in_loc = true,
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"loc" {
                    in_loc = false;
                }
            }
            Ok(Event::Text(t)) => {
                if in_loc {
                    let loc = t.unescape().unwrap_or_default().trim().to_string();
                    if !loc.is_empty() {
                        locs.push(loc);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CrawlError::Xml {
                    url: url.to_owned(),
                    source: e,
                })
            }
            _ => {}
        }
    }

    match is_index {
        Some(true) => Ok(SitemapDoc::Index(locs)),
        Some(false) => Ok(SitemapDoc::UrlSet(locs)),
        None => Err(CrawlError::InvalidSitemap {
            url: url.to_owned(),
        }),
    }
}
