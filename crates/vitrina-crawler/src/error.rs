use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("rate limited at {url} (retry after {retry_after_secs:?}s)")]
    RateLimited {
        url: String,
        retry_after_secs: Option<u64>,
    },

    #[error("forbidden: {url}")]
    Forbidden { url: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("non-HTML content type \"{content_type}\" at {url}")]
    NotHtml { url: String, content_type: String },

    #[error("malformed sitemap XML at {url}: {source}")]
    Xml {
        url: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document at {url} is neither a sitemap index nor a URL set")]
    InvalidSitemap { url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
