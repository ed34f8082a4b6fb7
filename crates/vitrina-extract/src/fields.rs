//! Per-field resolution: title, description, image, and stock state.
//!
//! Title, image, and stock follow the strict-priority fallback policy
//! (metadata tier first when enabled, then the selector chain, first hit
//! wins). Description is the exception: it accumulates text from every
//! matching block before cleanup.

use scraper::{Html, Selector};

use vitrina_core::SiteConfig;

use crate::selector::{all_texts, element_text, first_text, og_content};
use crate::title::trim_site_suffix;

/// Resolves the title: `og:title` when enabled, else the configured chain,
/// then site-suffix trimming. Empty results collapse to `None`.
#[must_use]
pub fn resolve_title(html: &Html, site: &SiteConfig) -> Option<String> {
    let raw = if site.og_title {
        og_content(html, "title").or_else(|| first_text(html, &site.title_tags))
    } else {
        first_text(html, &site.title_tags)
    };
    raw.map(|t| trim_site_suffix(&t, &site.title_separators))
        .filter(|t| !t.is_empty())
}

/// Resolves the description: `og:description` when enabled wins outright;
/// otherwise the text of EVERY matching selector block is concatenated,
/// junk substrings are removed, and consecutive blank lines collapse.
#[must_use]
pub fn resolve_description(html: &Html, site: &SiteConfig) -> Option<String> {
    if site.og_description {
        if let Some(description) = og_content(html, "description") {
            return Some(description);
        }
    }
    let blocks = all_texts(html, &site.description_tags);
    if blocks.is_empty() {
        return None;
    }
    let cleaned = clean_description(&blocks.join("\n\n"), &site.delete_description_text);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Resolves the image URL: `og:image` when enabled, else the first
/// configured image class carrying a non-empty `src`.
#[must_use]
pub fn resolve_image(html: &Html, site: &SiteConfig) -> Option<String> {
    if site.og_image {
        if let Some(src) = og_content(html, "image") {
            return Some(src);
        }
    }
    for class in &site.image_classes {
        let css: String = std::iter::once("img")
            .chain(class.split_whitespace().flat_map(|part| [".", part]))
            .collect();
        let Ok(selector) = Selector::parse(&css) else {
            continue;
        };
        if let Some(src) = html
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
        {
            return Some(src.to_string());
        }
    }
    None
}

/// Stock state, `true` unless stock checking is enabled and a configured
/// stock selector's text contains the out-of-stock marker
/// (case-insensitive).
#[must_use]
pub fn resolve_in_stock(html: &Html, site: &SiteConfig) -> bool {
    if !site.check_stock {
        return true;
    }
    let Some(marker) = site.stock_text.as_deref().filter(|m| !m.is_empty()) else {
        return true;
    };
    let marker_lower = marker.to_lowercase();
    for rule in &site.stock_tags {
        let Some(selector) = crate::selector::compile(rule) else {
            continue;
        };
        for el in html.select(&selector) {
            if element_text(el).to_lowercase().contains(&marker_lower) {
                return false;
            }
        }
    }
    true
}

/// Removes configured junk substrings, collapses runs of blank lines, and
/// trims the result.
pub(crate) fn clean_description(raw: &str, junk: &[String]) -> String {
    let mut text = raw.to_string();
    for fragment in junk {
        if !fragment.is_empty() {
            text = text.replace(fragment.as_str(), "");
        }
    }

    let mut lines: Vec<&str> = Vec::new();
    let mut last_blank = false;
    for line in text.lines() {
        let trimmed = line.trim_end();
        let blank = trimmed.trim().is_empty();
        if blank && last_blank {
            continue;
        }
        last_blank = blank;
        lines.push(trimmed);
    }
    lines.join("\n").trim().to_string()
}
