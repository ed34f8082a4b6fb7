//! Domain-scoped URL frontier: pending queue plus visited/seen sets with
//! dedup-by-normalized-URL and domain/resource-type filtering.
//!
//! The frontier itself is a plain synchronous structure; the walker wraps it
//! in a mutex so every check-then-insert happens under one guard.

use std::collections::{HashSet, VecDeque};

use url::Url;

use vitrina_core::SiteConfig;

use crate::error::CrawlError;

/// Path extensions that never point at an HTML page.
const NON_HTML_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".zip", ".rar", ".exe",
    ".dmg", ".apk", ".tar.gz", ".7z", ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".mkv",
    ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".rtf", ".csv", ".ico", ".css",
    ".js", ".json", ".xml",
];

/// Normalizes a URL for dedup: absolute, scheme-qualified, fragment stripped.
///
/// # Errors
///
/// Returns [`CrawlError::InvalidUrl`] when the input does not parse as an
/// absolute URL with a host.
pub fn normalize_url(raw: &str) -> Result<String, CrawlError> {
    let mut parsed = Url::parse(raw).map_err(|e| CrawlError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if parsed.host_str().is_none() {
        return Err(CrawlError::InvalidUrl {
            url: raw.to_owned(),
            reason: "missing host".to_owned(),
        });
    }
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

/// Whether `url`'s path extension allows it to be an HTML page.
#[must_use]
pub fn is_crawlable_path(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    !NON_HTML_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Host scoping: exact match against the root host, or a dot-separated
/// subdomain of it when enabled.
#[must_use]
pub fn host_in_scope(root_host: &str, host: &str, include_subdomains: bool) -> bool {
    if host == root_host {
        return true;
    }
    include_subdomains
        && host
            .strip_suffix(root_host)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub struct Frontier {
    root_host: String,
    include_subdomains: bool,
    ignore_substring: Option<String>,
    ignore_links: HashSet<String>,
    max_urls: usize,
    /// Every URL ever accepted into the queue; dedup happens here so a URL
    /// is enqueued at most once no matter how many pages link to it.
    seen: HashSet<String>,
    pending: VecDeque<String>,
    visited: HashSet<String>,
}

impl Frontier {
    /// Builds a frontier seeded with the site's root URL.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidUrl`] when the configured root does not
    /// parse as an absolute URL with a host.
    pub fn new(site: &SiteConfig) -> Result<Self, CrawlError> {
        let seed = normalize_url(&site.root_url)?;
        let root_host = Url::parse(&seed)
            .map_err(|e| CrawlError::InvalidUrl {
                url: seed.clone(),
                reason: e.to_string(),
            })?
            .host_str()
            .unwrap_or_default()
            .to_owned();

        let mut frontier = Self {
            root_host,
            include_subdomains: site.include_subdomains,
            ignore_substring: site
                .ignore_urls_with
                .clone()
                .filter(|s| !s.is_empty()),
            ignore_links: site.ignore_links.iter().cloned().collect(),
            max_urls: site.max_urls,
            seen: HashSet::new(),
            pending: VecDeque::new(),
            visited: HashSet::new(),
        };
        frontier.seen.insert(seed.clone());
        frontier.pending.push_back(seed);
        Ok(frontier)
    }

    /// Offers a discovered URL to the frontier. Returns `true` when it was
    /// accepted and enqueued; filtered, duplicate, and over-budget URLs are
    /// rejected.
    pub fn offer(&mut self, raw: &str) -> bool {
        if self.visited.len() >= self.max_urls {
            return false;
        }
        let Ok(normalized) = normalize_url(raw) else {
            return false;
        };
        if self.seen.contains(&normalized) {
            return false;
        }
        if !self.accepts(&normalized) {
            return false;
        }
        self.seen.insert(normalized.clone());
        self.pending.push_back(normalized);
        true
    }

    /// Dequeues the next pending URL, marking it visited. Returns `None`
    /// when the queue is empty or the visited budget has been reached; once
    /// the budget is hit, nothing is dequeued again.
    pub fn next(&mut self) -> Option<String> {
        if self.visited.len() >= self.max_urls {
            return None;
        }
        let url = self.pending.pop_front()?;
        self.visited.insert(url.clone());
        Some(url)
    }

    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Filter check for an already-normalized URL: scope, resource type,
    /// ignore substring, and the explicit ignore list.
    fn accepts(&self, normalized: &str) -> bool {
        let Ok(parsed) = Url::parse(normalized) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        if !host_in_scope(&self.root_host, host, self.include_subdomains) {
            return false;
        }
        if !is_crawlable_path(&parsed) {
            return false;
        }
        if let Some(fragment) = &self.ignore_substring {
            if normalized.contains(fragment.as_str()) {
                return false;
            }
        }
        !self.ignore_links.contains(normalized)
    }
}
