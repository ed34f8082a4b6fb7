//! Assembly of extracted fields into a classified page.
//!
//! The three-way split (in-stock / without-stock / discarded) is the
//! terminal output of extraction: a page with no parseable price is
//! discarded no matter what the other fields resolved to.

use chrono::Utc;
use scraper::Html;

use vitrina_core::record::{DESCRIPTION_NOT_FOUND, IMAGE_NOT_FOUND, TITLE_NOT_FOUND};
use vitrina_core::{ClassifiedPage, DiscardReason, DiscardedPage, ProductRecord, SiteConfig};

use crate::fields::{resolve_description, resolve_image, resolve_in_stock, resolve_title};
use crate::price::resolve_price;

/// Raw field resolution result, before sentinel substitution and
/// classification.
#[derive(Debug)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

/// Resolves every field of a parsed product page.
#[must_use]
pub fn extract(html: &Html, site: &SiteConfig) -> ExtractedFields {
    ExtractedFields {
        title: resolve_title(html, site),
        price: resolve_price(html, site),
        description: resolve_description(html, site),
        image_url: resolve_image(html, site),
        in_stock: resolve_in_stock(html, site),
    }
}

/// Extracts and classifies one fetched page.
///
/// `known_title` carries the title resolved during the earlier title-fetch
/// stage, so the detail pass does not silently change the dedup key; when
/// absent the title is resolved from this document.
#[must_use]
pub fn classify_page(
    url: &str,
    known_title: Option<&str>,
    html: &Html,
    site: &SiteConfig,
) -> ClassifiedPage {
    let fields = extract(html, site);
    let title = known_title
        .map(ToString::to_string)
        .or(fields.title)
        .unwrap_or_else(|| TITLE_NOT_FOUND.to_string());

    let Some(price) = fields.price else {
        tracing::debug!(url = %url, "no price found — discarding page");
        return ClassifiedPage::Discarded(DiscardedPage {
            url: url.to_string(),
            title,
            reason: DiscardReason::MissingPrice,
        });
    };

    let record = ProductRecord {
        url: url.to_string(),
        title,
        price,
        description: fields
            .description
            .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string()),
        image_url: fields
            .image_url
            .unwrap_or_else(|| IMAGE_NOT_FOUND.to_string()),
        in_stock: fields.in_stock,
        fetched_at: Utc::now(),
    };

    if record.in_stock {
        ClassifiedPage::InStock(record)
    } else {
        ClassifiedPage::WithoutStock(record)
    }
}
