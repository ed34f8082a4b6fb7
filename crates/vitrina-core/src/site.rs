use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One selector candidate in a fallback chain: a tag name plus an optional
/// class or id matcher. A rule with neither matches the first element of
/// that tag (useful for bare `h1` / `title` fallbacks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    pub tag: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl SelectorRule {
    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            class: None,
            id: None,
        }
    }

    #[must_use]
    pub fn class(tag: &str, class: &str) -> Self {
        Self {
            tag: tag.to_string(),
            class: Some(class.to_string()),
            id: None,
        }
    }

    #[must_use]
    pub fn id(tag: &str, id: &str) -> Self {
        Self {
            tag: tag.to_string(),
            class: None,
            id: Some(id.to_string()),
        }
    }
}

/// Per-site configuration, loaded from a YAML file and validated up front so
/// a bad selector chain or budget fails at startup rather than deep inside
/// extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root domain URL, the crawl seed and the scoping reference.
    pub root_url: String,

    /// Stop once this many products have been persisted.
    #[serde(default = "default_target_products")]
    pub target_products: usize,

    /// URLs pulled from the crawler per pipeline iteration.
    #[serde(default = "default_crawl_batch_size")]
    pub crawl_batch_size: usize,

    /// `{url, title}` pairs per product-selector call.
    #[serde(default = "default_llm_batch_size")]
    pub llm_batch_size: usize,

    /// Hard per-attempt timeout for every page fetch.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum simultaneous in-flight fetches (one shared gate for the
    /// sitemap, crawl, and extraction paths).
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Try sitemap discovery before falling back to link crawling.
    #[serde(default = "default_true")]
    pub use_sitemap: bool,

    /// Recursion cap for sitemap-of-sitemaps expansion.
    #[serde(default = "default_max_sitemap_depth")]
    pub max_sitemap_depth: usize,

    /// Global budget on URLs visited by the fallback crawl.
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// When on, 429 responses are retried after `Retry-After`/backoff and a
    /// politeness jitter is applied between requests; when off, a 429 is a
    /// terminal failure for that URL.
    #[serde(default)]
    pub use_rate_limit: bool,

    /// Treat subdomains of the root host as in-scope.
    #[serde(default)]
    pub include_subdomains: bool,

    /// Skip any URL containing this substring.
    #[serde(default)]
    pub ignore_urls_with: Option<String>,

    /// Exact URLs to never enqueue.
    #[serde(default)]
    pub ignore_links: Vec<String>,

    /// Consult `og:title` / `og:description` / `og:image` before the
    /// selector chains.
    #[serde(default = "default_true")]
    pub og_title: bool,
    #[serde(default)]
    pub og_description: bool,
    #[serde(default = "default_true")]
    pub og_image: bool,

    #[serde(default)]
    pub title_tags: Vec<SelectorRule>,

    /// Substrings marking a site-name suffix; the title is truncated before
    /// the first (case-insensitive) occurrence.
    #[serde(default)]
    pub title_separators: Vec<String>,

    #[serde(default)]
    pub description_tags: Vec<SelectorRule>,

    /// Junk substrings removed from assembled descriptions.
    #[serde(default)]
    pub delete_description_text: Vec<String>,

    pub price_tags: Vec<SelectorRule>,

    /// When a price block carries several amounts (struck-through original
    /// next to a discount), keep the lowest; otherwise keep the first.
    #[serde(default = "default_true")]
    pub use_lowest_price: bool,

    #[serde(default)]
    pub check_stock: bool,
    #[serde(default)]
    pub stock_tags: Vec<SelectorRule>,
    /// Marker text whose (case-insensitive) presence in a stock selector
    /// flags the product as out of stock.
    #[serde(default)]
    pub stock_text: Option<String>,

    /// Image classes probed when `og:image` is absent or disabled.
    #[serde(default)]
    pub image_classes: Vec<String>,

    /// Freeform description of the catalogue, fed to the product selector.
    #[serde(default)]
    pub products_sold: Option<String>,
    #[serde(default)]
    pub product_examples: Vec<String>,
    #[serde(default)]
    pub category_examples: Vec<String>,
}

fn default_target_products() -> usize {
    1000
}
fn default_crawl_batch_size() -> usize {
    30
}
fn default_llm_batch_size() -> usize {
    20
}
fn default_request_timeout_secs() -> u64 {
    20
}
fn default_concurrent_requests() -> usize {
    10
}
fn default_max_sitemap_depth() -> usize {
    5
}
fn default_max_urls() -> usize {
    1000
}
fn default_true() -> bool {
    true
}

/// Load and validate a site configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_site_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SiteFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let site: SiteConfig = serde_yaml::from_str(&content)?;
    validate_site(&site)?;
    Ok(site)
}

fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    if !site.root_url.starts_with("http://") && !site.root_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "root_url must be an absolute http(s) URL, got '{}'",
            site.root_url
        )));
    }

    if site.target_products == 0 {
        return Err(ConfigError::Validation(
            "target_products must be at least 1".to_string(),
        ));
    }

    if site.crawl_batch_size == 0 || site.llm_batch_size == 0 {
        return Err(ConfigError::Validation(
            "batch sizes must be at least 1".to_string(),
        ));
    }

    if site.concurrent_requests == 0 {
        return Err(ConfigError::Validation(
            "concurrent_requests must be at least 1".to_string(),
        ));
    }

    if site.max_sitemap_depth == 0 {
        return Err(ConfigError::Validation(
            "max_sitemap_depth must be at least 1".to_string(),
        ));
    }

    if site.price_tags.is_empty() {
        return Err(ConfigError::Validation(
            "price_tags must contain at least one selector".to_string(),
        ));
    }

    if site.check_stock && site.stock_text.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::Validation(
            "check_stock requires a non-empty stock_text marker".to_string(),
        ));
    }

    for rule in site
        .price_tags
        .iter()
        .chain(&site.title_tags)
        .chain(&site.description_tags)
        .chain(&site.stock_tags)
    {
        if rule.tag.trim().is_empty() {
            return Err(ConfigError::Validation(
                "selector rules must name a tag".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_site() -> SiteConfig {
        serde_yaml::from_str(
            r"
root_url: https://shop.example.com/
price_tags:
  - tag: span
    class: price
",
        )
        .unwrap()
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let site = minimal_site();
        assert_eq!(site.target_products, 1000);
        assert_eq!(site.crawl_batch_size, 30);
        assert_eq!(site.request_timeout_secs, 20);
        assert_eq!(site.concurrent_requests, 10);
        assert!(site.use_sitemap);
        assert_eq!(site.max_sitemap_depth, 5);
        assert_eq!(site.max_urls, 1000);
        assert!(!site.use_rate_limit);
        assert!(!site.include_subdomains);
        assert!(site.og_title);
        assert!(!site.og_description);
        assert!(site.og_image);
        assert!(site.use_lowest_price);
        assert!(!site.check_stock);
        assert!(validate_site(&site).is_ok());
    }

    #[test]
    fn selector_rule_parses_class_and_id_forms() {
        let rules: Vec<SelectorRule> = serde_yaml::from_str(
            r"
- tag: h1
- tag: span
  class: product-price current-price-value
- tag: div
  id: descripcion
",
        )
        .unwrap();
        assert_eq!(rules[0], SelectorRule::tag("h1"));
        assert_eq!(
            rules[1],
            SelectorRule::class("span", "product-price current-price-value")
        );
        assert_eq!(rules[2], SelectorRule::id("div", "descripcion"));
    }

    #[test]
    fn validate_rejects_relative_root_url() {
        let mut site = minimal_site();
        site.root_url = "shop.example.com".to_string();
        let err = validate_site(&site).unwrap_err();
        assert!(err.to_string().contains("absolute http(s) URL"));
    }

    #[test]
    fn validate_rejects_empty_price_tags() {
        let mut site = minimal_site();
        site.price_tags.clear();
        let err = validate_site(&site).unwrap_err();
        assert!(err.to_string().contains("price_tags"));
    }

    #[test]
    fn validate_rejects_stock_check_without_marker() {
        let mut site = minimal_site();
        site.check_stock = true;
        site.stock_text = None;
        let err = validate_site(&site).unwrap_err();
        assert!(err.to_string().contains("stock_text"));
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let mut site = minimal_site();
        site.target_products = 0;
        let err = validate_site(&site).unwrap_err();
        assert!(err.to_string().contains("target_products"));
    }

    #[test]
    fn validate_rejects_blank_selector_tag() {
        let mut site = minimal_site();
        site.title_tags.push(SelectorRule::tag("  "));
        let err = validate_site(&site).unwrap_err();
        assert!(err.to_string().contains("must name a tag"));
    }
}
