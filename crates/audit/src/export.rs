//! The spreadsheet-writer port and workbook naming.

use crate::schema::{COMPANY_NAME_KEY, SUMMARY_KEY};
use crate::{ExportError, ExtractionResult, RowTable};

/// Characters that cannot appear in a file name on common file systems.
const UNSAFE_FILE_NAME_CHARS: &[char] = &['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// Port to whatever turns one document's tables into a single artifact.
///
/// Implementations are responsible for sheet-name uniqueness and for any
/// format-specific limits.
pub trait TableExporter: Send + Sync {
    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &'static str;

    /// Encodes `tables` as one artifact titled `display_name`.
    fn export(&self, display_name: &str, tables: &[RowTable]) -> Result<Vec<u8>, ExportError>;
}

/// Derives a workbook name from the extracted company name.
///
/// File-system-unsafe characters are stripped and the result trimmed. When
/// nothing usable remains, falls back to `Company_<position>`, where
/// `position` is the 1-based index among exported workbooks.
pub fn workbook_display_name(result: &ExtractionResult, position: usize) -> String {
    let raw = result
        .report()
        .path(&[SUMMARY_KEY, COMPANY_NAME_KEY])
        .as_str()
        .unwrap_or_default();
    let cleaned: String = raw
        .chars()
        .filter(|c| !UNSAFE_FILE_NAME_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        format!("Company_{position}")
    } else {
        cleaned.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extraction_schema, Value};
    use serde_json::json;

    fn with_company(name: serde_json::Value) -> ExtractionResult {
        ExtractionResult::from_value(
            Value::from(json!({"comprehensive_audit_analysis": {"summary": {"company_name": name}}})),
            extraction_schema(),
        )
        .unwrap()
    }

    #[test]
    fn unsafe_characters_are_stripped() {
        let result = with_company(json!("  Pars/Bank: \"Holding\" <Group>?* | "));
        assert_eq!(workbook_display_name(&result, 1), "ParsBank Holding Group");
    }

    #[test]
    fn blank_or_absent_names_fall_back_to_position() {
        assert_eq!(workbook_display_name(&with_company(json!("")), 3), "Company_3");
        assert_eq!(workbook_display_name(&with_company(json!("/:*")), 2), "Company_2");
        assert_eq!(workbook_display_name(&with_company(json!(null)), 1), "Company_1");
        assert_eq!(workbook_display_name(&with_company(json!(42)), 4), "Company_4");
    }

    #[test]
    fn non_latin_names_are_kept() {
        let result = with_company(json!("بانک تجارت"));
        assert_eq!(workbook_display_name(&result, 1), "بانک تجارت");
    }
}
