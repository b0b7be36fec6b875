//! Configuration types for score-sheet extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The credential and endpoint live here
//! rather than in process-wide state, so tests can inject a fake key and a
//! mock transport without touching the environment.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use std::fmt;

/// Default Gemini REST base URL.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for an extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::from_env()`].
///
/// # Example
/// ```rust
/// use scoresheet_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("test-key")
///     .max_attempts(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Base URL of the model API. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// API credential. Required; [`ExtractionConfigBuilder::build`] fails
    /// with [`ExtractError::Configuration`] when absent.
    pub api_key: String,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Total attempts per file for rate-limit and server errors. Default: 3.
    ///
    /// Only HTTP 429 and 5xx are retried. Other statuses and transport
    /// failures end the file on the first attempt.
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds. Default: 1000.
    ///
    /// Doubles after each attempt: 1 s → 2 s → 4 s.
    pub retry_base_delay_ms: u64,

    /// Per-attempt HTTP timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Replacement for the built-in extraction instructions.
    pub system_prompt: Option<String>,

    /// Receives per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<custom>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder::default()
    }

    /// Build a configuration from `GEMINI_API_KEY`, `GEMINI_ENDPOINT` and
    /// `GEMINI_MODEL`.
    pub fn from_env() -> Result<Self, ExtractError> {
        let mut builder = Self::builder();
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Ok(endpoint) = std::env::var("GEMINI_ENDPOINT") {
            if !endpoint.is_empty() {
                builder = builder.endpoint(endpoint);
            }
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.is_empty() {
                builder = builder.model(model);
            }
        }
        builder.build()
    }

    /// Full URL of the `generateContent` call for the configured model.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_attempts: u32,
    retry_base_delay_ms: u64,
    request_timeout_secs: u64,
    temperature: f32,
    system_prompt: Option<String>,
    progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfigBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 60,
            temperature: 0.1,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl ExtractionConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.retry_base_delay_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating credential and endpoint.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ExtractError::Configuration(
                    "API key is not set.\nExport GEMINI_API_KEY or pass --api-key.".into(),
                )
            })?;

        let url = Url::parse(&self.endpoint).map_err(|e| {
            ExtractError::Configuration(format!("Invalid endpoint '{}': {e}", self.endpoint))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ExtractError::Configuration(format!(
                "Endpoint '{}' must use http or https",
                self.endpoint
            )));
        }

        if self.model.trim().is_empty() {
            return Err(ExtractError::Configuration("Model name must not be empty".into()));
        }

        Ok(ExtractionConfig {
            endpoint: self.endpoint,
            api_key,
            model: self.model,
            max_attempts: self.max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
            request_timeout_secs: self.request_timeout_secs,
            temperature: self.temperature,
            system_prompt: self.system_prompt,
            progress_callback: self.progress_callback,
        })
    }
}
