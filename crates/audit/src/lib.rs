//! Core domain for audit report extraction.
//!
//! This crate holds the extraction contract, the value types that flow through
//! a batch, credential rotation, the flattening algorithm, and the port traits
//! that infrastructure crates implement. It never performs I/O.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** It defines *what* is needed from the
//! extraction engine ([`ExtractionEngine`]) and the spreadsheet writer
//! ([`TableExporter`]); infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`schema`] | The versioned extraction contract (`ExtractionSchema`, `FieldSpec`) |
//! | [`vocabulary`] | Closed enumerations used by the contract |
//! | [`value`] | The recursive result tree (`Value`) |
//! | [`types`] | Batch values (`DocumentEntry`, `ExtractionResult`, `Outcome`, `Timestamp`) |
//! | [`credentials`] | Round-robin `KeyRotationPool` |
//! | [`client`] | `ExtractionEngine` port and `ExtractionClient` |
//! | [`table`] | `RowTable` |
//! | [`flatten`] | `Flattener` |
//! | [`export`] | `TableExporter` port and workbook naming |
//! | [`identifiers`] | Newtype identifiers (`BatchRunId`, `ModelName`) |
//! | [`errors`] | Error and retry-policy types |

pub mod client;
pub mod credentials;
pub mod errors;
pub mod export;
pub mod flatten;
pub mod identifiers;
pub mod schema;
pub mod table;
pub mod types;
pub mod value;
pub mod vocabulary;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::{
    parse_payload, ExtractionClient, ExtractionEngine, ExtractionRequest, DEFAULT_TEMPERATURE,
    DIRECTIVE, PDF_MIME_TYPE, SYSTEM_INSTRUCTION,
};
pub use credentials::{Credential, KeyRotationPool};
pub use errors::{
    ConfigurationError, EngineError, ExportError, FlattenIssue, RetryPolicy, SectionFlattenError,
};
pub use export::{workbook_display_name, TableExporter};
pub use flatten::{Flattened, Flattener};
pub use identifiers::{BatchRunId, ModelName};
pub use schema::{extraction_schema, ExtractionSchema, FieldKind, FieldSpec, Property, SCHEMA_VERSION};
pub use table::RowTable;
pub use types::{DocumentEntry, DocumentOutcome, ErrorRecord, ExtractionResult, Outcome, Timestamp};
pub use value::Value;
pub use vocabulary::{
    BasisReason, ChecklistStatus, ChecklistTopic, LegalBasis, OpinionType, RiskLevel,
};
