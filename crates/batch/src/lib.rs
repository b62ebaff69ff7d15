//! Batch orchestration for audit report extraction.
//!
//! This crate drives the [`audit`] domain over a set of documents: it runs one
//! extraction per document with failure isolation and bounded parallelism,
//! reports progress, and assembles the flattened workbooks of the successes.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** It sequences calls between the domain types in
//! [`audit`] and the engine port. It contains no domain rules of its own and
//! knows nothing about the concrete engine or exporter.

pub mod progress;
pub mod runner;
pub mod workbook;

pub use progress::{NoProgress, ProgressObserver, ProgressUpdate};
pub use runner::{BatchOptions, BatchReport, BatchRunner};
pub use workbook::{assemble_workbooks, Workbook};
