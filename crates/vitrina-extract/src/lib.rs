pub mod classify;
pub mod fields;
pub mod price;
mod selector;
mod title;

pub use classify::{classify_page, extract, ExtractedFields};
pub use fields::resolve_title;
pub use selector::validate_selectors;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid {field} selector \"{css}\"")]
    InvalidSelector { field: &'static str, css: String },
}
