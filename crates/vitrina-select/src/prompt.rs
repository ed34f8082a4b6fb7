//! Prompt assembly for the product-page selection call.

use std::fmt::Write;

use vitrina_core::{SiteConfig, TitledUrl};

/// Builds the selection prompt: what the shop sells, example product and
/// category titles when configured, the strict output contract, and the
/// candidate list as JSON.
pub(crate) fn build_selection_prompt(site: &SiteConfig, batch: &[TitledUrl]) -> String {
    let mut prompt = String::from(
        "You will receive a JSON list of objects with the keys \"url\" and \"title\", \
         each describing one page of an online shop.\n\n",
    );

    if let Some(products_sold) = site.products_sold.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(prompt, "The shop sells: {products_sold}\n");
    }

    prompt.push_str(
        "Identify the titles that belong to individual product pages. Product titles \
         are descriptive and specific, often naming a model, size, color, or other \
         unique detail.\n",
    );

    if !site.product_examples.is_empty() {
        prompt.push_str("Examples of product titles:\n");
        for example in &site.product_examples {
            let _ = writeln!(prompt, "  - {example}");
        }
    }

    prompt.push_str(
        "\nDo NOT select titles that belong to:\n\
         - product category pages\n",
    );
    if !site.category_examples.is_empty() {
        prompt.push_str("   (for example:\n");
        for example in &site.category_examples {
            let _ = writeln!(prompt, "    - {example}");
        }
        prompt.push_str("   )\n");
    }
    prompt.push_str(
        "- general information pages (contact, shipping, terms, search)\n\
         - help or support pages (FAQ, customer service)\n\n\
         Answer with a JSON array containing only the \"url\" values of the pages you \
         identified as products. Output the JSON array and nothing else — no extra \
         text before or after it.\n\nThese are the pages to classify:\n",
    );

    prompt.push_str(&serde_json::to_string(batch).unwrap_or_else(|_| "[]".to_string()));
    prompt
}
