//! Shared value types for the audit extraction domain.
//!
//! These are the values that flow through a batch: the [`DocumentEntry`] that
//! goes in, the [`ExtractionResult`] the engine produces, and the per-document
//! [`Outcome`] the batch runner records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{ExtractionSchema, ROOT_KEY};
use crate::{EngineError, RetryPolicy, Value};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One document to extract.
///
/// Produced by whatever collects the batch (direct upload, archive unpacking);
/// consumed by the batch runner and dropped when the batch ends.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    /// File name shown to users and used in logs.
    pub name: String,
    /// Raw document bytes.
    pub content: Vec<u8>,
}

impl DocumentEntry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl std::fmt::Debug for DocumentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEntry")
            .field("name", &self.name)
            .field("bytes", &self.content.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Engine output
// ---------------------------------------------------------------------------

/// A structured engine payload whose top-level contract has been checked.
///
/// Only the presence of the required top-level keys is verified; everything
/// below is trusted and read defensively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult(Value);

impl ExtractionResult {
    /// Accepts `value` if it is an object carrying every top-level key the
    /// schema marks required.
    pub fn from_value(value: Value, schema: &ExtractionSchema) -> Result<Self, EngineError> {
        if value.as_object().is_none() {
            return Err(EngineError::malformed("payload is not a JSON object"));
        }
        if let Some(missing) = schema
            .required_top_level()
            .into_iter()
            .find(|key| value.get(key).is_none())
        {
            return Err(EngineError::malformed(format!(
                "required top-level key '{missing}' is missing"
            )));
        }
        Ok(Self(value))
    }

    /// The whole payload.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The analysis object under the root key.
    pub fn report(&self) -> &Value {
        self.0.field(ROOT_KEY)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a document produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The failure's message, verbatim.
    pub message: String,
    /// Retry classification of the final attempt.
    pub retry_policy: RetryPolicy,
}

impl ErrorRecord {
    /// Records an engine failure.
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            message: error.to_string(),
            retry_policy: error.retry_policy(),
        }
    }

    /// Records a failure that did not come from the engine (e.g. a crashed task).
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_policy: RetryPolicy::NonRetryable,
        }
    }
}

/// Per-document result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// The engine returned a usable result.
    Success(ExtractionResult),
    /// Extraction failed; the rest of the batch is unaffected.
    Failure(ErrorRecord),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The result, if any.
    pub fn result(&self) -> Option<&ExtractionResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure(_) => None,
        }
    }

    /// The error record, if any.
    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Success(_) => None,
            Self::Failure(record) => Some(record),
        }
    }
}

impl From<Result<ExtractionResult, EngineError>> for Outcome {
    fn from(result: Result<ExtractionResult, EngineError>) -> Self {
        match result {
            Ok(result) => Self::Success(result),
            Err(error) => Self::Failure(ErrorRecord::from_error(&error)),
        }
    }
}

/// One entry of a batch report, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutcome {
    /// Zero-based position in the input.
    pub index: usize,
    /// The entry's name.
    pub name: String,
    /// What happened.
    pub outcome: Outcome,
    /// Engine calls made for this entry (at least one).
    pub attempts: u32,
    /// When the final attempt finished.
    pub completed_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction_schema;
    use serde_json::json;

    #[test]
    fn results_require_the_root_key() {
        let err = ExtractionResult::from_value(
            Value::from(json!({"something_else": {}})),
            extraction_schema(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::malformed(
                "required top-level key 'comprehensive_audit_analysis' is missing"
            )
        );
    }

    #[test]
    fn results_must_be_objects() {
        let err =
            ExtractionResult::from_value(Value::from(json!([1, 2])), extraction_schema())
                .unwrap_err();
        assert!(matches!(err, EngineError::MalformedPayload { .. }));
    }

    #[test]
    fn deep_shape_is_not_validated() {
        let result = ExtractionResult::from_value(
            Value::from(json!({"comprehensive_audit_analysis": "not even an object"})),
            extraction_schema(),
        )
        .unwrap();
        assert_eq!(result.report().as_str(), Some("not even an object"));
    }

    #[test]
    fn failed_outcomes_keep_the_message_verbatim() {
        let outcome = Outcome::from(Err(EngineError::transport("connection reset by peer")));
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.error().map(|e| e.message.as_str()),
            Some("transport error: connection reset by peer")
        );
        assert!(outcome.error().unwrap().retry_policy.is_retryable());
    }

    #[test]
    fn entry_debug_hides_document_bytes() {
        let entry = DocumentEntry::new("report.pdf", vec![0u8; 2048]);
        assert_eq!(
            format!("{entry:?}"),
            r#"DocumentEntry { name: "report.pdf", bytes: 2048 }"#
        );
    }
}
