//! Product-page selection through an OpenAI-compatible chat endpoint.
//!
//! The model receives batches of `{url, title}` pairs and answers with the
//! subset of URLs it judges to be individual product pages (as opposed to
//! category or informational pages). The call is treated as an unreliable
//! external collaborator: malformed output is retried up to three attempts,
//! and exhaustion fails open to an empty selection — never a crash.

mod prompt;

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vitrina_core::{SiteConfig, TitledUrl};

use crate::prompt::build_selection_prompt;

/// Attempts per batch before failing open.
const MAX_ATTEMPTS: u32 = 3;

/// Concurrent selection calls in flight.
const SELECTION_FANOUT: usize = 4;

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("selection API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("selection response is not a JSON list of URLs: {reason}")]
    MalformedResponse { reason: String },
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct SelectorClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl SelectorClient {
    /// Creates a selection client against an OpenAI-compatible API base
    /// (e.g. `https://api.openai.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_base: &str,
        api_key: &str,
        model: &str,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, SelectError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            temperature,
        })
    }

    /// Selects the product-page URLs out of `candidates`.
    ///
    /// Candidates are split into batches of `site.llm_batch_size` and
    /// submitted concurrently. A batch whose calls all fail yields zero
    /// selections for that batch only; the order of the surviving pairs
    /// follows the input.
    pub async fn select_product_urls(
        &self,
        site: &SiteConfig,
        candidates: &[TitledUrl],
    ) -> Vec<TitledUrl> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let selected_batches: Vec<Vec<String>> =
            stream::iter(candidates.chunks(site.llm_batch_size.max(1)))
                .map(|batch| self.select_batch(site, batch))
                .buffer_unordered(SELECTION_FANOUT)
                .collect()
                .await;

        let selected: std::collections::HashSet<String> =
            selected_batches.into_iter().flatten().collect();

        candidates
            .iter()
            .filter(|pair| selected.contains(&pair.url))
            .cloned()
            .collect()
    }

    /// One batch with retries. Fails open to an empty selection after
    /// [`MAX_ATTEMPTS`].
    async fn select_batch(&self, site: &SiteConfig, batch: &[TitledUrl]) -> Vec<String> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.request_selection(site, batch).await {
                Ok(urls) => return urls,
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = MAX_ATTEMPTS,
                        error = %err,
                        "product selection attempt failed"
                    );
                }
            }
        }
        tracing::warn!(
            batch_size = batch.len(),
            "product selection exhausted retries — failing open to empty selection"
        );
        Vec::new()
    }

    async fn request_selection(
        &self,
        site: &SiteConfig,
        batch: &[TitledUrl],
    ) -> Result<Vec<String>, SelectError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: build_selection_prompt(site, batch),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SelectError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| SelectError::MalformedResponse {
                reason: "response has no choices".to_owned(),
            })?;

        parse_url_list(content)
    }
}

/// Parses the model's answer as a JSON array of URL strings, tolerating a
/// surrounding markdown code fence.
fn parse_url_list(content: &str) -> Result<Vec<String>, SelectError> {
    let mut trimmed = content.trim();
    if let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        trimmed = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    serde_json::from_str::<Vec<String>>(trimmed).map_err(|e| SelectError::MalformedResponse {
        reason: e.to_string(),
    })
}
