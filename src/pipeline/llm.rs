//! Model interaction: send one image and drive the retry state machine.
//!
//! The HTTP call sits behind the [`Transport`] trait and sleeping behind
//! [`Sleeper`], so the retry policy runs unchanged against a scripted mock
//! in tests. All prompt text lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 and 5xx are retried up to `max_attempts` in total, waiting
//! `retry_base_delay_ms * 2^attempt` in between: 1 s then 2 s with the
//! defaults. Any other status fails the file at once. A transport failure
//! (no HTTP response at all) is also not retried.

use crate::columns::ColumnSpec;
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, FileError};
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::normalize;
use crate::pipeline::request::{self, GenerateContentRequest, GenerateContentResponse};
use crate::pipeline::retry::{AttemptClass, RetryPolicy, RetryState, Sleeper, TokioSleeper};
use crate::prompts::build_instructions;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Raw HTTP answer: status plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The request never got an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends a `generateContent` request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] over `reqwest` with a per-attempt timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.generate_content_url(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    TransportError(format!("connection failed: {e}"))
                } else {
                    TransportError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;

        Ok(TransportResponse { status, body })
    }
}

/// Turns one encoded image into a raw JSON array from the model.
pub struct ExtractionClient {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    temperature: f32,
    system_prompt: Option<String>,
}

impl ExtractionClient {
    /// Client backed by real HTTP and real sleeping.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Ok(Self::with_transport(config, transport, Arc::new(TokioSleeper)))
    }

    /// Client with injected transport and sleeper.
    pub fn with_transport(
        config: &ExtractionConfig,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send the image and return the model's JSON array.
    ///
    /// Cancelling `cancel` interrupts a backoff wait; a request already in
    /// flight runs to completion or to its timeout.
    pub async fn extract_raw(
        &self,
        name: &str,
        image: &EncodedImage,
        columns: &ColumnSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>, FileError> {
        let instructions = build_instructions(columns, self.system_prompt.as_deref());
        let request = request::build_request(image, columns, instructions, self.temperature);

        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(FileError::Cancelled);
            }

            let response = self.transport.send(&request).await.map_err(|e| {
                warn!("{}: attempt {} transport failure: {}", name, attempt + 1, e);
                FileError::Transport { message: e.0 }
            })?;

            let class = AttemptClass::from_status(response.status);
            match self.policy.transition(attempt, class) {
                RetryState::Succeeded => {
                    debug!("{}: HTTP {} on attempt {}", name, response.status, attempt + 1);
                    return extract_payload(&response.body);
                }
                RetryState::FailedFatal => {
                    return Err(FileError::FatalStatus {
                        status: response.status,
                        message: request::error_message(&response.body),
                    });
                }
                RetryState::FailedTransient => {
                    return Err(FileError::TransientRequest {
                        attempts: attempt + 1,
                        status: response.status,
                        message: request::error_message(&response.body),
                    });
                }
                RetryState::Attempting(next) => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "{}: HTTP {} on attempt {}/{}, retrying in {}ms",
                        name,
                        response.status,
                        attempt + 1,
                        self.policy.max_attempts,
                        delay.as_millis()
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(FileError::Cancelled),
                        _ = self.sleeper.sleep(delay) => {}
                    }
                    attempt = next;
                }
            }
        }
    }
}

/// Pull the text payload out of a success body and parse it as an array.
fn extract_payload(body: &str) -> Result<Vec<Value>, FileError> {
    let envelope: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| FileError::Content {
            detail: format!("unreadable response envelope: {e}"),
        })?;

    let text = envelope.text().ok_or_else(|| FileError::Content {
        detail: envelope.empty_reason(),
    })?;

    normalize::parse_payload(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn payload_from_success_body() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"[]"}]}}]}"#;
        assert!(extract_payload(body).unwrap().is_empty());
    }

    #[test]
    fn missing_text_is_content_error() {
        let body = r#"{"candidates":[{"content":{"parts":[]},"finishReason":"MAX_TOKENS"}]}"#;
        let err = extract_payload(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Content);
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn non_json_envelope_is_content_error() {
        let err = extract_payload("<html>gateway</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Content);
    }

    #[test]
    fn non_array_payload_is_schema_violation() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"student_name\":\"An\"}"}]}}]}"#;
        let err = extract_payload(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn policy_follows_config() {
        let config = ExtractionConfig::builder()
            .api_key("k")
            .max_attempts(5)
            .retry_base_delay_ms(250)
            .build()
            .unwrap();
        let client = ExtractionClient::new(&config).unwrap();
        assert_eq!(client.policy().max_attempts, 5);
        assert_eq!(client.policy().base_delay, Duration::from_millis(250));
    }
}
