//! Bounded-concurrency HTTP fetch layer shared by the sitemap, crawl, and
//! extraction paths.
//!
//! Every request goes through one semaphore gate sized by the site
//! configuration — that bound is the primary backpressure mechanism for the
//! whole pipeline. Responses are mapped to typed errors (429, 403, 404,
//! other non-2xx) and the transient ones are retried by
//! [`crate::backoff::retry_with_backoff`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;

use crate::backoff::{retry_with_backoff, RetryPolicy};
use crate::error::CrawlError;

/// One fetched page, consumed immediately by link extraction or field
/// extraction and then dropped. Never persisted.
#[derive(Debug)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

pub struct FetchClient {
    client: Client,
    gate: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl FetchClient {
    /// Creates a `FetchClient` with configured timeout, `User-Agent`,
    /// concurrency gate, and retry policy.
    ///
    /// `max_retries` is the number of additional attempts after the first
    /// failure for retriable errors (timeout, 403, network errors, and 429
    /// when `retry_rate_limited` is set). Set to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        concurrent_requests: usize,
        max_retries: u32,
        backoff_base_secs: u64,
        retry_rate_limited: bool,
    ) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            gate: Arc::new(Semaphore::new(concurrent_requests.max(1))),
            policy: RetryPolicy {
                max_retries,
                backoff_base_secs,
                retry_rate_limited,
            },
        })
    }

    /// Fetches a URL, retrying transient failures per the client policy.
    ///
    /// # Errors
    ///
    /// - [`CrawlError::Timeout`] — per-attempt wall-clock cutoff exceeded on
    ///   every attempt.
    /// - [`CrawlError::RateLimited`] — HTTP 429 after retries (or on the
    ///   first response when rate-limit retries are disabled).
    /// - [`CrawlError::Forbidden`] — HTTP 403 after all retries exhausted.
    /// - [`CrawlError::NotFound`] — HTTP 404 (not retried).
    /// - [`CrawlError::UnexpectedStatus`] — any other non-2xx (not retried).
    /// - [`CrawlError::Http`] — network failure after retries.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        self.fetch_inner(url, false).await
    }

    /// Like [`Self::fetch`], but additionally rejects responses whose
    /// `Content-Type` is not HTML with [`CrawlError::NotHtml`] (not retried).
    pub async fn fetch_html(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        self.fetch_inner(url, true).await
    }

    /// Existence probe for well-known sitemap paths: one GET, no retries,
    /// `true` only on HTTP 200.
    pub async fn probe(&self, url: &str) -> bool {
        let _permit = self.gate.acquire().await.expect("fetch gate never closed");
        match self.client.get(url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }

    async fn fetch_inner(&self, url: &str, expect_html: bool) -> Result<FetchedPage, CrawlError> {
        // The permit is held across retries and their backoff sleeps, so a
        // URL stuck in backoff still counts against the in-flight bound.
        let _permit = self.gate.acquire().await.expect("fetch gate never closed");

        retry_with_backoff(self.policy, || self.attempt(url, expect_html)).await
    }

    async fn attempt(&self, url: &str, expect_html: bool) -> Result<FetchedPage, CrawlError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CrawlError::Timeout {
                        url: url.to_owned(),
                    }
                } else {
                    CrawlError::Http(e)
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(CrawlError::RateLimited {
                url: url.to_owned(),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(CrawlError::Forbidden {
                url: url.to_owned(),
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CrawlError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(CrawlError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if expect_html {
            let is_html = content_type
                .as_deref()
                .is_some_and(|ct| ct.contains("text/html"));
            if !is_html {
                return Err(CrawlError::NotHtml {
                    url: url.to_owned(),
                    content_type: content_type.unwrap_or_default(),
                });
            }
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CrawlError::Timeout {
                    url: url.to_owned(),
                }
            } else {
                CrawlError::Http(e)
            }
        })?;

        Ok(FetchedPage {
            url: url.to_owned(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
