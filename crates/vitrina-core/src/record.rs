use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel values used when a field resolves to nothing. A record whose
/// price is [`PRICE_NOT_FOUND`] is never persisted as a product — it is
/// routed to the discarded set instead.
pub const TITLE_NOT_FOUND: &str = "Title not found";
pub const PRICE_NOT_FOUND: &str = "Price not found";
pub const DESCRIPTION_NOT_FOUND: &str = "Description not found";
pub const IMAGE_NOT_FOUND: &str = "Image not found";

/// A URL paired with its page title, the unit the product selector works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitledUrl {
    pub url: String,
    pub title: String,
}

/// One extracted product page. `title` is the dedup key within a result set;
/// `price` is either the canonical `"X,YY€"` form or [`PRICE_NOT_FOUND`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
    pub in_stock: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Why a fetched page was excluded from the product output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    MissingPrice,
    FetchFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardedPage {
    pub url: String,
    pub title: String,
    pub reason: DiscardReason,
}

/// Terminal classification of one fetched product candidate. Every page ends
/// up in exactly one arm; downstream code matches on the variant instead of
/// comparing sentinel strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedPage {
    InStock(ProductRecord),
    WithoutStock(ProductRecord),
    Discarded(DiscardedPage),
}

impl ClassifiedPage {
    /// The title used for dedup, whichever arm the page landed in.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            ClassifiedPage::InStock(r) | ClassifiedPage::WithoutStock(r) => &r.title,
            ClassifiedPage::Discarded(d) => &d.title,
        }
    }

    /// The source URL, whichever arm the page landed in.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            ClassifiedPage::InStock(r) | ClassifiedPage::WithoutStock(r) => &r.url,
            ClassifiedPage::Discarded(d) => &d.url,
        }
    }
}
