//! Workbook exporters (`.xlsx` and JSON) and the on-disk layout of a run's
//! workbooks.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use audit::{ExportError, RowTable, TableExporter, SCHEMA_VERSION};
use batch::Workbook;
use rust_xlsxwriter::{ColNum, Format, RowNum, XlsxError};
use serde::{Deserialize, Serialize};

/// Longest worksheet name Excel accepts.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

/// Characters Excel rejects in worksheet names.
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Longest text Excel stores in one cell.
const MAX_CELL_CHARS: usize = 32_767;

/// Output format selected by `[output] format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkbookFormat {
    #[default]
    Xlsx,
    Json,
}

impl WorkbookFormat {
    /// The exporter writing this format.
    pub fn exporter(self) -> &'static dyn TableExporter {
        match self {
            Self::Xlsx => &XlsxWorkbookExporter,
            Self::Json => &JsonWorkbookExporter,
        }
    }
}

/// Writes each workbook as an Excel file with one worksheet per table.
///
/// Row 1 carries the column headers in bold; every cell is a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWorkbookExporter;

impl TableExporter for XlsxWorkbookExporter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn export(&self, display_name: &str, tables: &[RowTable]) -> Result<Vec<u8>, ExportError> {
        let encoding = |e: XlsxError| ExportError::Encoding {
            workbook: display_name.to_string(),
            message: e.to_string(),
        };
        let header = Format::new().set_bold();
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let mut taken = HashSet::new();

        for table in tables {
            let sheet = workbook.add_worksheet();
            sheet
                .set_name(claim_sheet_name(&mut taken, table.sheet_name()))
                .map_err(encoding)?;
            for (col, name) in table.columns().iter().enumerate() {
                let col = column_number(display_name, col)?;
                sheet
                    .write_string_with_format(0, col, name.as_str(), &header)
                    .map_err(encoding)?;
            }
            for (row, cells) in table.rows().iter().enumerate() {
                let row = row_number(display_name, row + 1)?;
                for (col, cell) in cells.iter().enumerate() {
                    if cell.is_empty() {
                        continue;
                    }
                    let col = column_number(display_name, col)?;
                    sheet
                        .write_string(row, col, clip_cell(cell))
                        .map_err(encoding)?;
                }
            }
        }

        workbook.save_to_buffer().map_err(encoding)
    }
}

fn row_number(workbook: &str, row: usize) -> Result<RowNum, ExportError> {
    RowNum::try_from(row).map_err(|_| ExportError::Encoding {
        workbook: workbook.to_string(),
        message: format!("row {row} is beyond the worksheet limit"),
    })
}

fn column_number(workbook: &str, col: usize) -> Result<ColNum, ExportError> {
    ColNum::try_from(col).map_err(|_| ExportError::Encoding {
        workbook: workbook.to_string(),
        message: format!("column {col} is beyond the worksheet limit"),
    })
}

fn clip_cell(cell: &str) -> &str {
    match cell.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => &cell[..cut],
        None => cell,
    }
}

/// Writes each workbook as one JSON document holding all of its sheets.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWorkbookExporter;

#[derive(Serialize)]
struct JsonWorkbook<'a> {
    name: &'a str,
    schema_version: &'static str,
    sheets: Vec<JsonSheet<'a>>,
}

#[derive(Serialize)]
struct JsonSheet<'a> {
    name: String,
    columns: &'a [String],
    rows: &'a [Vec<String>],
}

impl TableExporter for JsonWorkbookExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, display_name: &str, tables: &[RowTable]) -> Result<Vec<u8>, ExportError> {
        let mut taken = HashSet::new();
        let workbook = JsonWorkbook {
            name: display_name,
            schema_version: SCHEMA_VERSION,
            sheets: tables
                .iter()
                .map(|t| JsonSheet {
                    name: claim_sheet_name(&mut taken, t.sheet_name()),
                    columns: t.columns(),
                    rows: t.rows(),
                })
                .collect(),
        };
        serde_json::to_vec_pretty(&workbook).map_err(|e| ExportError::Encoding {
            workbook: display_name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Returns `base`, or `base_2`, `base_3`, ... if already taken, and records
/// the result. Comparison ignores case.
pub fn claim_unique(taken: &mut HashSet<String>, base: &str) -> String {
    claim_unique_within(taken, base, usize::MAX)
}

/// Like [`claim_unique`], but for worksheet names: characters Excel rejects
/// are removed and the result, suffix included, fits in
/// [`MAX_SHEET_NAME_CHARS`].
pub fn claim_sheet_name(taken: &mut HashSet<String>, raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c))
        .collect();
    // Excel also rejects names that start or end with an apostrophe.
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let base = if cleaned.is_empty() { "Sheet" } else { cleaned };
    claim_unique_within(taken, base, MAX_SHEET_NAME_CHARS)
}

fn claim_unique_within(taken: &mut HashSet<String>, base: &str, max_chars: usize) -> String {
    let mut suffix = 1;
    loop {
        let tail = if suffix == 1 {
            String::new()
        } else {
            format!("_{suffix}")
        };
        let head: String = base
            .chars()
            .take(max_chars.saturating_sub(tail.len()))
            .collect();
        let candidate = format!("{head}{tail}");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Exports every workbook into `dir`.
///
/// Returns the written file name per document index. A workbook that fails
/// to encode is logged and left out; I/O errors abort the run.
pub fn write_workbooks(
    dir: &Path,
    workbooks: &[Workbook],
    exporter: &dyn TableExporter,
) -> anyhow::Result<HashMap<usize, String>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut taken = HashSet::new();
    let mut written = HashMap::with_capacity(workbooks.len());
    for workbook in workbooks {
        let bytes = match exporter.export(&workbook.display_name, &workbook.tables) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(document = %workbook.document, error = %e, "Workbook export failed");
                continue;
            }
        };
        let stem = claim_unique(&mut taken, &workbook.display_name);
        let file_name = format!("{stem}.{}", exporter.extension());
        let path = dir.join(&file_name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(document = %workbook.document, file = %file_name, "Workbook written");
        written.insert(workbook.index, file_name);
    }
    Ok(written)
}
