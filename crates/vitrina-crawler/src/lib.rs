pub mod backoff;
pub mod client;
pub mod error;
pub mod frontier;
pub mod sitemap;
pub mod walker;

pub use client::{FetchClient, FetchedPage};
pub use error::CrawlError;
pub use frontier::Frontier;
pub use sitemap::{resolve_sitemaps, SitemapGroup};
pub use walker::CrawlWalker;
