//! The extraction engine port and the client that drives it.
//!
//! [`ExtractionEngine`] is the seam to the external document-understanding
//! service: one request in, an optional raw text payload out. Infrastructure
//! crates implement it; this crate never performs I/O itself.
//!
//! [`ExtractionClient`] owns everything engine-independent about a call: it
//! picks the credential, assembles the fixed instructions and the response
//! schema, and turns the raw payload into a checked [`ExtractionResult`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    extraction_schema, Credential, EngineError, ExtractionResult, ExtractionSchema,
    KeyRotationPool, Value,
};

/// Persona given to the engine as its system instruction.
pub const SYSTEM_INSTRUCTION: &str = "You act as an expert financial auditor analyst. \
Your task is to analyse the independent auditor's and statutory inspector's report \
together with the financial statements attached to it. Complete every field carefully, \
using only information found in the document.";

/// Per-call directive sent alongside the document.
pub const DIRECTIVE: &str = "Analyse the attached audit report and extract its information \
in the JSON structure provided. Complete every required field precisely and use only the \
enumeration values defined in the structure.";

/// MIME type of the documents this client submits.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Sampling temperature: some latitude for free-text summaries while the
/// response schema keeps classified fields inside their vocabularies.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Everything an engine needs for one extraction call.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// The document bytes.
    pub document: &'a [u8],
    /// MIME type of `document`.
    pub mime_type: &'a str,
    /// The persona instruction.
    pub system_instruction: &'a str,
    /// The per-call directive.
    pub directive: &'a str,
    /// Outbound rendering of the [`ExtractionSchema`].
    pub response_schema: &'a serde_json::Value,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Port to the external document-understanding engine.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Submits one request authenticated with `credential`.
    ///
    /// Returns the raw text payload, or `None` when the engine answered
    /// without one. Implementations must not retry internally.
    async fn generate(
        &self,
        credential: &Credential,
        request: ExtractionRequest<'_>,
    ) -> Result<Option<String>, EngineError>;
}

/// Wraps one engine call per document.
pub struct ExtractionClient {
    engine: Arc<dyn ExtractionEngine>,
    pool: Arc<KeyRotationPool>,
    schema: &'static ExtractionSchema,
    response_schema: serde_json::Value,
    temperature: f32,
}

impl std::fmt::Debug for ExtractionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionClient")
            .field("pool_size", &self.pool.len())
            .field("schema_version", &self.schema.version())
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl ExtractionClient {
    /// Creates a client bound to the process-wide schema.
    pub fn new(engine: Arc<dyn ExtractionEngine>, pool: Arc<KeyRotationPool>) -> Self {
        Self::with_schema(engine, pool, extraction_schema())
    }

    /// Creates a client bound to `schema`.
    pub fn with_schema(
        engine: Arc<dyn ExtractionEngine>,
        pool: Arc<KeyRotationPool>,
        schema: &'static ExtractionSchema,
    ) -> Self {
        Self {
            engine,
            pool,
            schema,
            response_schema: schema.to_json(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Overrides the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Number of credentials available; caps useful concurrency.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// The schema results are checked against.
    pub fn schema(&self) -> &'static ExtractionSchema {
        self.schema
    }

    /// Extracts one document.
    ///
    /// Draws exactly one credential, makes exactly one engine call, and never
    /// retries.
    pub async fn extract(&self, document: &[u8]) -> Result<ExtractionResult, EngineError> {
        let credential = self.pool.next();
        tracing::debug!(
            credential = %credential,
            bytes = document.len(),
            "Submitting document to extraction engine"
        );

        let request = ExtractionRequest {
            document,
            mime_type: PDF_MIME_TYPE,
            system_instruction: SYSTEM_INSTRUCTION,
            directive: DIRECTIVE,
            response_schema: &self.response_schema,
            temperature: self.temperature,
        };

        let payload = self
            .engine
            .generate(&credential, request)
            .await?
            .ok_or(EngineError::EmptyResponse)?;

        parse_payload(&payload, self.schema)
    }
}

/// Decodes a raw engine payload into a checked result.
pub fn parse_payload(
    payload: &str,
    schema: &ExtractionSchema,
) -> Result<ExtractionResult, EngineError> {
    let text = payload.trim().trim_start_matches('\u{feff}');
    if text.is_empty() {
        return Err(EngineError::EmptyResponse);
    }
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| EngineError::malformed(format!("payload is not valid JSON: {e}")))?;
    ExtractionResult::from_value(Value::from(json), schema)
}
