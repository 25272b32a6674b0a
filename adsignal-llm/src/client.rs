//! Review client for the OpenAI-compatible chat-completions endpoint.
//!
//! One request per ad, submitted in mini-batches. Transient failures (429,
//! 5xx, timeouts, malformed payloads) are retried with exponential backoff;
//! a request that exhausts its retries yields an unvalidated verdict and
//! the run continues. The deterministic keyword label is never overwritten.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;

use adsignal_common::{Error, LlmConfig, Result};
use adsignal_core::Label;

use crate::prompt::{self, VerdictPayload};

/// One ad submitted for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    pub ad_id: String,
    pub text: String,
}

/// The endpoint's judgment for one ad. `validated` is false when the
/// request failed and the verdict carries no information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ad_id: String,
    pub ai_requirement: Label,
    pub reason: String,
    pub keywords: Vec<String>,
    pub validated: bool,
}

impl Verdict {
    fn unvalidated(ad_id: &str) -> Self {
        Self {
            ad_id: ad_id.to_string(),
            ai_requirement: Label::Missing,
            reason: String::new(),
            keywords: Vec::new(),
            validated: false,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// A failed call, split by whether a retry can help.
struct CallFailure {
    message: String,
    retryable: bool,
}

// ============================================================================
// Client
// ============================================================================

/// The review client. Immutable after construction, `Send + Sync`.
#[derive(Debug)]
pub struct ReviewClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ReviewClient {
    /// Build a client from the validation settings. Requires an API key.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| Error::Config(format!("invalid API key: {e}")))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::External(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Backoff delay for a given attempt: base doubled per attempt, capped.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.config.max_backoff_ms);
        Duration::from_millis(delay_ms)
    }

    async fn request_once(&self, text: &str) -> std::result::Result<VerdictPayload, CallFailure> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: text.to_string(),
                },
            ],
            temperature: 0.0,
            response_format: json!({
                "type": "json_schema",
                "json_schema": prompt::response_schema(),
            }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallFailure {
                message: format!("request failed: {e}"),
                // connect errors and timeouts are transient
                retryable: true,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallFailure {
                message: format!("API error {status}: {body}"),
                retryable: status.as_u16() == 429 || status.is_server_error(),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| CallFailure {
            message: format!("malformed response: {e}"),
            retryable: true,
        })?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        prompt::parse_verdict(content).map_err(|e| CallFailure {
            message: format!("malformed verdict: {e}"),
            retryable: true,
        })
    }

    /// Review one ad, retrying transient failures. Never errors: exhausted
    /// retries and fatal API errors both degrade to an unvalidated verdict.
    pub async fn review_one(&self, item: &ReviewItem) -> Verdict {
        for attempt in 0..=self.config.max_retries {
            match self.request_once(&item.text).await {
                Ok(payload) => {
                    if attempt > 0 {
                        tracing::info!(ad_id = %item.ad_id, attempt = attempt + 1, "Review recovered after retries");
                    }
                    return Verdict {
                        ad_id: item.ad_id.clone(),
                        ai_requirement: payload.label,
                        reason: payload.reason,
                        keywords: payload.keywords,
                        validated: true,
                    };
                }
                Err(failure) if failure.retryable && attempt < self.config.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        ad_id = %item.ad_id,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure.message,
                        "Review call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => {
                    tracing::error!(
                        ad_id = %item.ad_id,
                        error = %failure.message,
                        "Review failed, marking record unvalidated"
                    );
                    return Verdict::unvalidated(&item.ad_id);
                }
            }
        }
        Verdict::unvalidated(&item.ad_id)
    }

    /// Review every item in submission order, in mini-batches of
    /// `batch_size`. Output order matches input order.
    pub async fn review_all(&self, items: &[ReviewItem]) -> Vec<Verdict> {
        let batch_size = self.config.batch_size.max(1);
        let mut verdicts = Vec::with_capacity(items.len());

        for (batch_idx, batch) in items.chunks(batch_size).enumerate() {
            tracing::info!(
                batch = batch_idx + 1,
                size = batch.len(),
                model = %self.config.model,
                "Submitting review batch"
            );
            for item in batch {
                verdicts.push(self.review_one(item).await);
            }
        }

        let validated = verdicts.iter().filter(|v| v.validated).count();
        tracing::info!(
            total = verdicts.len(),
            validated,
            unvalidated = verdicts.len() - validated,
            "Review run complete"
        );
        verdicts
    }
}
