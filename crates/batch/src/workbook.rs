//! Assembles the exportable workbooks of a finished batch.

use audit::{workbook_display_name, Flattener, RowTable, SectionFlattenError};
use serde::Serialize;

use crate::runner::BatchReport;

/// The tables of one successfully extracted document, ready for a
/// [`audit::TableExporter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workbook {
    /// Position of the source document in the batch input.
    pub index: usize,
    /// Name of the source document.
    pub document: String,
    /// Name derived from the extracted company name (or its fallback).
    pub display_name: String,
    /// One table per flattened section.
    pub tables: Vec<RowTable>,
    /// Sections that were missing or malformed.
    pub warnings: Vec<SectionFlattenError>,
}

/// Flattens every successful outcome of `report`, in input order.
///
/// Failed documents are skipped. The `Company_<n>` fallback counts workbooks,
/// not input positions, so the n-th exported workbook is `Company_n`.
pub fn assemble_workbooks(report: &BatchReport, flattener: &Flattener<'_>) -> Vec<Workbook> {
    let mut workbooks: Vec<Workbook> = Vec::new();
    for outcome in &report.outcomes {
        let Some(result) = outcome.outcome.result() else {
            continue;
        };
        let flattened = flattener.flatten(result);
        if !flattened.warnings.is_empty() {
            tracing::warn!(
                document = %outcome.name,
                warnings = flattened.warnings.len(),
                "Document flattened with section warnings"
            );
        }
        workbooks.push(Workbook {
            index: outcome.index,
            document: outcome.name.clone(),
            display_name: workbook_display_name(result, workbooks.len() + 1),
            tables: flattened.tables,
            warnings: flattened.warnings,
        });
    }
    workbooks
}
