//! Text-completion provider access with overload-aware retry.
//!
//! # Architecture
//!
//! - [`CompletionClient`]: core trait, one prompt in, one text out
//! - [`AnthropicClient`]: the Anthropic Messages API over `reqwest`
//! - [`RetryComplete`]: decorator that retries overload signals on a fixed
//!   backoff schedule
//!
//! # Retry Strategy
//!
//! Only [`LlmError::Overloaded`] is retried. The schedule has one entry per
//! attempt (default 30s, 60s, 90s); after a failed attempt the decorator sleeps
//! that attempt's delay. Any other error is returned at once.

use crate::config::LlmSettings;
use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A text-completion capability.
pub trait CompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

/// Anthropic Messages API client.
pub struct AnthropicClient<'a> {
    http: &'a reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    api_key: Option<String>,
}

impl<'a> AnthropicClient<'a> {
    /// Borrow the run's shared HTTP client.
    ///
    /// # Arguments
    ///
    /// * `http` - Shared client; its total timeout is overridden per request
    ///   by `settings.timeout_secs`
    /// * `settings` - Endpoint, model, timeout and API key
    pub fn new(http: &'a reqwest::Client, settings: &LlmSettings) -> Self {
        Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            api_key: settings.api_key.clone(),
        }
    }
}

impl fmt::Debug for AnthropicClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

impl CompletionClient for AnthropicClient<'_> {
    #[instrument(level = "info", skip_all, fields(model = %self.model, max_tokens = max_tokens))]
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let t0 = Instant::now();
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let err = classify_failure(status.as_u16(), &raw);
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                error = %err,
                "Completion request failed"
            );
            return Err(err);
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "Completion received"
        );
        Ok(text)
    }
}

/// Map a non-2xx response onto [`LlmError`].
///
/// 529 and 429 are overload signals, as is an error body whose type is
/// `overloaded_error` or `rate_limit_error` whatever the status.
fn classify_failure(status: u16, raw: &str) -> LlmError {
    let (kind, message) = match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) => (envelope.error.kind, envelope.error.message),
        Err(_) => (String::new(), raw.trim().to_string()),
    };
    let overloaded = matches!(status, 429 | 529)
        || matches!(kind.as_str(), "overloaded_error" | "rate_limit_error");
    if overloaded {
        LlmError::Overloaded { status, message }
    } else {
        LlmError::Api { status, message }
    }
}

/// Retry decorator for any [`CompletionClient`].
pub struct RetryComplete<T> {
    inner: T,
    schedule: Vec<Duration>,
}

impl<T> RetryComplete<T>
where
    T: CompletionClient,
{
    /// `schedule` holds one delay per attempt, slept after that attempt fails
    /// with an overload signal.
    pub fn new(inner: T, schedule: Vec<Duration>) -> Self {
        Self { inner, schedule }
    }
}

impl<T> fmt::Debug for RetryComplete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryComplete")
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl<T> CompletionClient for RetryComplete<T>
where
    T: CompletionClient,
{
    #[instrument(level = "info", skip_all)]
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let total_t0 = Instant::now();
        let attempts = self.schedule.len();

        for (index, delay) in self.schedule.iter().enumerate() {
            let attempt = index + 1;
            match self.inner.complete(prompt, max_tokens, temperature).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_overload() => {
                    warn!(
                        attempt,
                        max = attempts,
                        ?delay,
                        error = %e,
                        "Provider overloaded; backing off"
                    );
                    sleep(*delay).await;
                }
                Err(e) => {
                    error!(attempt, error = %e, "Completion failed; not retrying");
                    return Err(e);
                }
            }
        }

        error!(
            attempts,
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "Completion exhausted retries"
        );
        Err(LlmError::RetriesExhausted { attempts })
    }
}
