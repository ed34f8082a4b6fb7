//! Price scanning and canonicalization.
//!
//! Price-bearing text frequently holds several amounts at once — a
//! struck-through original next to the discounted price — so the whole
//! matched text is scanned for every `1.234,56€` / `5,50€` occurrence
//! (`.` thousands separator, `,` decimal separator) and the site policy
//! picks which one survives.

use std::sync::LazyLock;

use regex::Regex;

use vitrina_core::SiteConfig;

/// European-format currency amount: optional dot-grouped thousands, optional
/// comma decimals, euro sign.
static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}(?:\.\d{3})+|\d+)(?:,(\d{1,2}))?\s*€").expect("static regex")
});

/// All distinct amounts found in `text`, in order of first occurrence.
pub(crate) fn scan_prices(text: &str) -> Vec<f64> {
    let mut values = Vec::new();
    for caps in PRICE_PATTERN.captures_iter(text) {
        let integer: String = caps[1].chars().filter(char::is_ascii_digit).collect();
        let Ok(whole) = integer.parse::<u64>() else {
            continue;
        };
        #[allow(clippy::cast_precision_loss)]
        let mut value = whole as f64;
        if let Some(frac) = caps.get(2) {
            let digits = frac.as_str();
            let divisor = if digits.len() == 1 { 10.0 } else { 100.0 };
            if let Ok(parsed) = digits.parse::<u32>() {
                value += f64::from(parsed) / divisor;
            }
        }
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

/// Canonical output form: integer part, comma, two decimals, euro sign.
pub(crate) fn format_price(value: f64) -> String {
    format!("{value:.2}").replace('.', ",") + "€"
}

/// Resolves the price field for a page: the first matching price selector
/// provides the text, every amount inside it is parsed, and the configured
/// policy (lowest by default, else first occurrence) picks the winner.
/// Returns `None` when no selector matches or the matched text holds no
/// parseable amount — which discards the record downstream.
#[must_use]
pub fn resolve_price(html: &scraper::Html, site: &SiteConfig) -> Option<String> {
    let text = crate::selector::first_text(html, &site.price_tags)?;
    resolve_from_text(&text, site.use_lowest_price)
}

pub(crate) fn resolve_from_text(text: &str, use_lowest: bool) -> Option<String> {
    let values = scan_prices(text);
    let first = *values.first()?;
    let chosen = if use_lowest {
        values.iter().copied().fold(first, f64::min)
    } else {
        first
    };
    Some(format_price(chosen))
}
