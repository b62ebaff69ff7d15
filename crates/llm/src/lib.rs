//! Gemini infrastructure adapter.
//!
//! Implements the [`audit::ExtractionEngine`] port against the Gemini
//! `generateContent` REST endpoint.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing
//! and status classification live here. The [`audit`] crate sees only
//! [`audit::ExtractionEngine`]; retries and deadlines belong to the caller.

#![warn(missing_docs)]

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use audit::{Credential, EngineError, ExtractionEngine, ExtractionRequest, ModelName};
use thiserror::Error;

pub use wire::{GenerateContentRequest, GenerateContentResponse};

/// Default REST base of the Gemini API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Longest error body kept in a [`EngineError::Rejected`] message.
const MAX_ERROR_BODY: usize = 512;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Errors raised while constructing the adapter.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// The underlying `reqwest` client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Connection settings for [`GeminiEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    /// REST base URL, without a trailing slash.
    pub endpoint: String,
    /// Model id inserted into the `models/{model}:generateContent` path.
    pub model: ModelName,
    /// Transport-level timeout for one request.
    pub request_timeout: Duration,
}

impl GeminiConfig {
    /// Settings for `model` at the public endpoint.
    pub fn new(model: ModelName) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model,
            request_timeout: Duration::from_secs(600),
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// [`ExtractionEngine`] backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiEngine {
    http: reqwest::Client,
    url: String,
    request_timeout: Duration,
}

impl GeminiEngine {
    /// Builds the HTTP client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::ClientBuild`] when the TLS backend cannot be
    /// initialised.
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            url: config.generate_url(),
            request_timeout: config.request_timeout,
        })
    }

    /// The full `generateContent` URL this engine posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_send_error(&self, error: reqwest::Error) -> EngineError {
        if error.is_timeout() {
            EngineError::Timeout {
                after: self.request_timeout,
            }
        } else {
            EngineError::transport(error.to_string())
        }
    }
}

#[async_trait]
impl ExtractionEngine for GeminiEngine {
    async fn generate(
        &self,
        credential: &Credential,
        request: ExtractionRequest<'_>,
    ) -> Result<Option<String>, EngineError> {
        let body = GenerateContentRequest::from_request(&request);
        tracing::debug!(
            url = %self.url,
            key = %credential.fingerprint(),
            bytes = request.document.len(),
            "Sending generateContent request"
        );

        let response = self
            .http
            .post(&self.url)
            .header(API_KEY_HEADER, credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after.as_deref(), &text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| match self.map_send_error(e) {
                timeout @ EngineError::Timeout { .. } => timeout,
                other => EngineError::malformed(format!("unreadable engine response: {other}")),
            })?;

        Ok(parsed.text())
    }
}

/// Maps a non-success HTTP status to an [`EngineError`].
///
/// Throttling (429) and server faults (5xx) are transient; every other status
/// means the request itself was refused.
pub fn classify_status(status: u16, retry_after: Option<&str>, body: &str) -> EngineError {
    if status == 429 || (500..600).contains(&status) {
        return EngineError::Transport {
            message: format!("HTTP {status}: {}", truncate(body)),
            retry_after: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        };
    }
    EngineError::Rejected {
        status,
        message: truncate(body),
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_built_from_endpoint_and_model() {
        let mut config = GeminiConfig::new(ModelName::new("gemini-2.5-pro").unwrap());
        assert_eq!(
            config.generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );

        config.endpoint = "http://localhost:8080/v1/".into();
        assert_eq!(
            config.generate_url(),
            "http://localhost:8080/v1/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn engine_builds_from_default_config() {
        let config = GeminiConfig::new(ModelName::new(DEFAULT_MODEL).unwrap());
        let engine = GeminiEngine::new(&config).unwrap();
        assert!(engine.url().ends_with("gemini-2.5-pro:generateContent"));
    }

    #[test]
    fn throttling_is_transient_and_keeps_the_hint() {
        let err = classify_status(429, Some("30"), "quota exhausted");
        assert_eq!(
            err,
            EngineError::Transport {
                message: "HTTP 429: quota exhausted".into(),
                retry_after: Some(Duration::from_secs(30)),
            }
        );
        assert!(err.retry_policy().is_retryable());
    }

    #[test]
    fn unparseable_hint_is_dropped() {
        let err = classify_status(503, Some("Wed, 21 Oct 2015 07:28:00 GMT"), "");
        assert!(matches!(err, EngineError::Transport { retry_after: None, .. }));
    }

    #[test]
    fn client_errors_are_rejections() {
        let err = classify_status(400, None, "  invalid argument  ");
        assert_eq!(
            err,
            EngineError::Rejected {
                status: 400,
                message: "invalid argument".into(),
            }
        );
        assert!(!err.retry_policy().is_retryable());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let EngineError::Rejected { message, .. } = classify_status(403, None, &body) else {
            panic!("expected a rejection");
        };
        assert_eq!(message.len(), MAX_ERROR_BODY + 3);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(600);
        let cut = truncate(&body);
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY + 3);
    }
}
