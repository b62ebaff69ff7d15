//! Error and retry-policy types for the audit extraction domain.
//!
//! [`EngineError`] covers everything that can go wrong while obtaining one
//! document's [`crate::ExtractionResult`]. It is caught at the per-document
//! boundary by the batch runner and never escapes a batch.
//!
//! [`SectionFlattenError`] is a warning, not a failure: it is recorded against a
//! document when one schema section cannot be turned into a table.
//!
//! [`RetryPolicy`] is the cross-cutting classification that lets the batch
//! runner decide whether an engine failure is worth another attempt.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport failures, rate limits, deadline expiry,
///   empty or undecodable payloads (sampling is not deterministic).
/// - `NonRetryable` errors: the engine rejected the request outright
///   (bad credential, payload too large, unsupported document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Failure to obtain a structured result for one document.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum EngineError {
    /// The engine could not be reached, or answered with a transient status
    /// (rate limit, server error).
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable description of the transport failure.
        message: String,
        /// Server-provided back-off hint, when one was sent.
        retry_after: Option<Duration>,
    },

    /// The engine refused the request (client-side status other than 429).
    #[error("engine rejected the request with status {status}: {message}")]
    Rejected {
        /// HTTP-equivalent status code returned by the engine.
        status: u16,
        /// Engine-provided explanation, possibly truncated.
        message: String,
    },

    /// The engine answered but the answer carried no payload.
    #[error("engine response was empty")]
    EmptyResponse,

    /// The payload does not decode as the schema-shaped structured value.
    #[error("malformed payload: {message}")]
    MalformedPayload {
        /// What was wrong with the payload.
        message: String,
    },

    /// The caller's deadline elapsed before the engine answered.
    #[error("engine call timed out after {}s", after.as_secs_f64())]
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },
}

impl EngineError {
    /// Convenience constructor for [`EngineError::Transport`] without a hint.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Convenience constructor for [`EngineError::MalformedPayload`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Classifies this error for the batch runner's retry loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { retry_after, .. } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Timeout { .. } | Self::EmptyResponse | Self::MalformedPayload { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            Self::Rejected { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Flatten warnings
// ---------------------------------------------------------------------------

/// Why a section could not be flattened as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FlattenIssue {
    /// The section key is absent from the result.
    MissingSection,
    /// The section is present but is not an object.
    NotAnObject,
    /// The section is present but is not an array.
    NotAnArray,
    /// One element of a list is not an object and was skipped.
    MalformedItem {
        /// Zero-based position of the skipped element.
        index: usize,
    },
    /// A checklist item names a topic outside the fixed topic list.
    UnknownTopic {
        /// The topic text as reported.
        topic: String,
    },
    /// A checklist topic was reported more than once; later entries are ignored.
    DuplicateTopic {
        /// The repeated topic.
        topic: String,
    },
}

impl std::fmt::Display for FlattenIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSection => write!(f, "section is missing"),
            Self::NotAnObject => write!(f, "section is not an object"),
            Self::NotAnArray => write!(f, "section is not an array"),
            Self::MalformedItem { index } => write!(f, "item {index} is not an object"),
            Self::UnknownTopic { topic } => write!(f, "unknown checklist topic '{topic}'"),
            Self::DuplicateTopic { topic } => write!(f, "checklist topic '{topic}' repeated"),
        }
    }
}

/// A schema section that could not be normalised into a table cleanly.
///
/// Recorded as a warning against the document; the remaining sections are
/// still flattened.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("section '{section}': {issue}")]
pub struct SectionFlattenError {
    /// Sheet name of the affected section.
    pub section: String,
    /// What was wrong.
    pub issue: FlattenIssue,
}

impl SectionFlattenError {
    pub(crate) fn new(section: &str, issue: FlattenIssue) -> Self {
        Self {
            section: section.to_owned(),
            issue,
        }
    }
}

// ---------------------------------------------------------------------------
// Start-up and export errors
// ---------------------------------------------------------------------------

/// The runtime configuration is invalid.
///
/// Produced at load time only; a batch never starts with an invalid config.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("configuration error: {message}")]
pub struct ConfigurationError {
    /// Description of the configuration problem.
    pub message: String,
}

impl ConfigurationError {
    /// Creates a [`ConfigurationError`] from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A [`crate::TableExporter`] could not produce an artifact for one document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The tables could not be encoded in the exporter's format.
    #[error("could not encode workbook '{workbook}': {message}")]
    Encoding {
        /// Display name of the workbook being produced.
        workbook: String,
        /// Encoder-specific description.
        message: String,
    },
}
