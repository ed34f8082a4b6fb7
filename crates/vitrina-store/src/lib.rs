mod store;

pub use store::{AppendSummary, ResultStore, StoreTotals};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid root URL \"{url}\": cannot derive a domain name")]
    InvalidRoot { url: String },

    #[error("corrupt execution counter at {path}: {content:?}")]
    BadCounter { path: String, content: String },
}
