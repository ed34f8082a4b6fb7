//! Compilation of configured selector rules into CSS selectors, plus the
//! shared first-match / all-matches resolution helpers.

use scraper::{ElementRef, Html, Selector};

use vitrina_core::{SelectorRule, SiteConfig};

use crate::ExtractError;

/// Renders a rule as CSS: tag, optional `#id`, and one `.class` per
/// whitespace-separated class name (configs carry the full `class`
/// attribute value of the target element).
pub(crate) fn css_of(rule: &SelectorRule) -> String {
    let mut css = rule.tag.trim().to_string();
    if let Some(id) = &rule.id {
        css.push('#');
        css.push_str(id.trim());
    }
    if let Some(class) = &rule.class {
        for part in class.split_whitespace() {
            css.push('.');
            css.push_str(part);
        }
    }
    css
}

pub(crate) fn compile(rule: &SelectorRule) -> Option<Selector> {
    let css = css_of(rule);
    let parsed = Selector::parse(&css);
    match parsed {
        Ok(selector) => Some(selector),
        Err(_) => {
            tracing::debug!(css = %css, "skipping uncompilable selector rule");
            None
        }
    }
}

/// Compiles every configured selector up front so a bad rule fails at
/// startup instead of deep inside extraction.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidSelector`] naming the field and the CSS
/// rendering of the first rule that does not compile.
pub fn validate_selectors(site: &SiteConfig) -> Result<(), ExtractError> {
    let chains: [(&'static str, &[SelectorRule]); 4] = [
        ("title", &site.title_tags),
        ("description", &site.description_tags),
        ("price", &site.price_tags),
        ("stock", &site.stock_tags),
    ];
    for (field, rules) in chains {
        for rule in rules {
            let css = css_of(rule);
            if Selector::parse(&css).is_err() {
                return Err(ExtractError::InvalidSelector { field, css });
            }
        }
    }
    Ok(())
}

/// Content of a page-level `og:{property}` metadata tag, if present and
/// non-empty.
pub(crate) fn og_content(html: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="og:{property}"]"#)).ok()?;
    html.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Strict-priority resolution: the first rule whose first matching element
/// yields non-empty text wins; later rules are never consulted after a hit.
pub(crate) fn first_text(html: &Html, rules: &[SelectorRule]) -> Option<String> {
    for rule in rules {
        let Some(selector) = compile(rule) else {
            continue;
        };
        if let Some(el) = html.select(&selector).next() {
            let text = element_text(el);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Accumulating resolution: non-empty text of EVERY element matched by any
/// rule, in rule order. Used for descriptions, which concatenate across
/// matches instead of stopping at the first.
pub(crate) fn all_texts(html: &Html, rules: &[SelectorRule]) -> Vec<String> {
    let mut blocks = Vec::new();
    for rule in rules {
        let Some(selector) = compile(rule) else {
            continue;
        };
        for el in html.select(&selector) {
            let text = element_text(el);
            if !text.is_empty() {
                blocks.push(text);
            }
        }
    }
    blocks
}
