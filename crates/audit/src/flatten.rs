//! Turns one [`ExtractionResult`] into spreadsheet-ready [`RowTable`]s.
//!
//! Each section of the contract becomes one sheet. Sections are flattened
//! independently: a missing or malformed section produces a
//! [`SectionFlattenError`] warning and, depending on the section, a best-effort
//! table or no table at all. It never prevents the other sheets from being
//! built.
//!
//! | Sheet | Rows |
//! |-------|------|
//! | `summary` | one |
//! | `opinion_clause` | one |
//! | `basis_for_opinion` | one per item, or the `applicable = false` sentinel |
//! | `emphasis_of_matter` | one per item, or the sentinel |
//! | `legal_compliance` | one per violation, or the sentinel |
//! | `topic_checklist` | exactly one per checklist topic, in declared order |

use serde::Serialize;

use crate::errors::{FlattenIssue, SectionFlattenError};
use crate::schema::{
    ExtractionSchema, ANALYSIS_KEY, APPLICABLE_KEY, BASIS_CLAUSE_KEY, CHECKLIST_KEY,
    EMPHASIS_CLAUSE_KEY, ITEMS_KEY, LEGAL_CLAUSE_KEY, OPINION_CLAUSE_KEY, ROOT_KEY, SUMMARY_KEY,
    TOPIC_KEY, VIOLATIONS_KEY,
};
use crate::vocabulary::ChecklistTopic;
use crate::{extraction_schema, ExtractionResult, RowTable, Value};

/// Sheet name of the summary table.
pub const SUMMARY_SHEET: &str = "summary";
/// Sheet name of the opinion clause table.
pub const OPINION_SHEET: &str = "opinion_clause";
/// Sheet name of the basis-for-opinion table.
pub const BASIS_SHEET: &str = "basis_for_opinion";
/// Sheet name of the emphasis-of-matter table.
pub const EMPHASIS_SHEET: &str = "emphasis_of_matter";
/// Sheet name of the legal-compliance table.
pub const LEGAL_SHEET: &str = "legal_compliance";
/// Sheet name of the checklist table.
pub const CHECKLIST_SHEET: &str = "topic_checklist";

/// Separator for columns produced from a nested object (`parent.child`).
const PATH_SEPARATOR: char = '.';

type Row = Vec<(String, String)>;

/// Tables and warnings for one document.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Flattened {
    /// One table per section that could be flattened, in sheet order.
    pub tables: Vec<RowTable>,
    /// Sections that were missing, malformed, or partially skipped.
    pub warnings: Vec<SectionFlattenError>,
}

impl Flattened {
    /// Looks up a table by sheet name.
    pub fn table(&self, sheet_name: &str) -> Option<&RowTable> {
        self.tables.iter().find(|t| t.sheet_name() == sheet_name)
    }
}

/// Converts results into tables according to an [`ExtractionSchema`].
///
/// The schema supplies the declared column order of each sheet; keys the
/// engine adds beyond the contract are kept as trailing columns.
#[derive(Debug, Clone, Copy)]
pub struct Flattener<'s> {
    schema: &'s ExtractionSchema,
}

impl Default for Flattener<'static> {
    fn default() -> Self {
        Self::new(extraction_schema())
    }
}

/// A clause whose rows only exist when the report says it applies.
struct ConditionalClause {
    key: &'static str,
    sheet: &'static str,
    list_key: &'static str,
}

const CONDITIONAL_CLAUSES: [ConditionalClause; 3] = [
    ConditionalClause {
        key: BASIS_CLAUSE_KEY,
        sheet: BASIS_SHEET,
        list_key: ITEMS_KEY,
    },
    ConditionalClause {
        key: EMPHASIS_CLAUSE_KEY,
        sheet: EMPHASIS_SHEET,
        list_key: ITEMS_KEY,
    },
    ConditionalClause {
        key: LEGAL_CLAUSE_KEY,
        sheet: LEGAL_SHEET,
        list_key: VIOLATIONS_KEY,
    },
];

impl<'s> Flattener<'s> {
    /// Creates a flattener for `schema`.
    pub fn new(schema: &'s ExtractionSchema) -> Self {
        Self { schema }
    }

    /// Flattens every section of `result`.
    ///
    /// Never fails; problems are reported in [`Flattened::warnings`].
    pub fn flatten(&self, result: &ExtractionResult) -> Flattened {
        let report = result.report();
        let mut out = Flattened::default();

        self.collect(&mut out, self.summary(report));
        self.collect(&mut out, self.opinion_clause(report));
        for clause in &CONDITIONAL_CLAUSES {
            self.collect(&mut out, self.conditional_clause(report, clause));
        }
        self.collect(&mut out, self.checklist(report));

        for warning in &out.warnings {
            tracing::warn!(section = %warning.section, issue = %warning.issue, "Section flattened with warnings");
        }
        out
    }

    fn collect(&self, out: &mut Flattened, section: SectionResult) {
        out.warnings.extend(section.warnings);
        if let Some(table) = section.table {
            out.tables.push(table);
        }
    }

    // -- summary ------------------------------------------------------------

    fn summary(&self, report: &Value) -> SectionResult {
        let section = match object_section(report, SUMMARY_KEY, SUMMARY_SHEET) {
            Ok(entries) => entries,
            Err(warning) => return SectionResult::omitted(warning),
        };
        let declared = self.schema.object_columns(&[ROOT_KEY, SUMMARY_KEY]);
        SectionResult::table(RowTable::from_rows(
            SUMMARY_SHEET,
            &declared,
            [flatten_object(section)],
        ))
    }

    // -- clauses ------------------------------------------------------------

    fn opinion_clause(&self, report: &Value) -> SectionResult {
        let analysis = report.field(ANALYSIS_KEY);
        let clause = match object_section(analysis, OPINION_CLAUSE_KEY, OPINION_SHEET) {
            Ok(entries) => entries,
            Err(warning) => return SectionResult::omitted(warning),
        };
        let declared = self
            .schema
            .object_columns(&[ROOT_KEY, ANALYSIS_KEY, OPINION_CLAUSE_KEY]);
        SectionResult::table(RowTable::from_rows(
            OPINION_SHEET,
            &declared,
            [flatten_object(clause)],
        ))
    }

    fn conditional_clause(&self, report: &Value, clause: &ConditionalClause) -> SectionResult {
        let analysis = report.field(ANALYSIS_KEY);
        let body = match object_section(analysis, clause.key, clause.sheet) {
            Ok(_) => analysis.field(clause.key),
            Err(warning) => return SectionResult::omitted(warning),
        };

        let applicable = body.field(APPLICABLE_KEY).as_bool().unwrap_or(false);
        let items = body.field(clause.list_key);
        if !applicable || items.is_null() {
            return SectionResult::table(sentinel(clause.sheet, false));
        }

        let Some(items) = items.as_array() else {
            return SectionResult {
                table: Some(sentinel(clause.sheet, false)),
                warnings: vec![SectionFlattenError::new(clause.sheet, FlattenIssue::NotAnArray)],
            };
        };
        if items.is_empty() {
            return SectionResult::table(sentinel(clause.sheet, true));
        }

        let mut warnings = Vec::new();
        let rows: Vec<Row> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item.as_object() {
                Some(entries) => Some(flatten_object(entries)),
                None => {
                    warnings.push(SectionFlattenError::new(
                        clause.sheet,
                        FlattenIssue::MalformedItem { index },
                    ));
                    None
                }
            })
            .collect();

        let declared = self
            .schema
            .item_columns(&[ROOT_KEY, ANALYSIS_KEY, clause.key, clause.list_key]);
        // Every item malformed: the clause still applies, only its rows are lost.
        let table = if rows.is_empty() {
            sentinel(clause.sheet, true)
        } else {
            RowTable::from_rows(clause.sheet, &declared, rows)
        };
        SectionResult {
            table: Some(table),
            warnings,
        }
    }

    // -- checklist ----------------------------------------------------------

    fn checklist(&self, report: &Value) -> SectionResult {
        let declared = self.schema.item_columns(&[ROOT_KEY, CHECKLIST_KEY]);
        let mut warnings = Vec::new();

        let reported: &[Value] = match report.get(CHECKLIST_KEY) {
            None => {
                warnings.push(SectionFlattenError::new(
                    CHECKLIST_SHEET,
                    FlattenIssue::MissingSection,
                ));
                &[]
            }
            Some(section) => section.as_array().unwrap_or_else(|| {
                warnings.push(SectionFlattenError::new(
                    CHECKLIST_SHEET,
                    FlattenIssue::NotAnArray,
                ));
                &[]
            }),
        };

        // First report of each topic wins; anything outside the vocabulary is dropped.
        let mut by_topic: Vec<Option<&[(String, Value)]>> = vec![None; ChecklistTopic::ALL.len()];
        for (index, item) in reported.iter().enumerate() {
            let Some(entries) = item.as_object() else {
                warnings.push(SectionFlattenError::new(
                    CHECKLIST_SHEET,
                    FlattenIssue::MalformedItem { index },
                ));
                continue;
            };
            let raw_topic = item.field(TOPIC_KEY).to_cell();
            let Some(topic) = ChecklistTopic::parse(&raw_topic) else {
                warnings.push(SectionFlattenError::new(
                    CHECKLIST_SHEET,
                    FlattenIssue::UnknownTopic { topic: raw_topic },
                ));
                continue;
            };
            let slot = topic_position(topic);
            if by_topic[slot].is_some() {
                warnings.push(SectionFlattenError::new(
                    CHECKLIST_SHEET,
                    FlattenIssue::DuplicateTopic {
                        topic: topic.as_str().to_owned(),
                    },
                ));
                continue;
            }
            by_topic[slot] = Some(entries);
        }

        let rows = ChecklistTopic::ALL.iter().zip(by_topic).map(|(topic, entries)| {
            let mut row = vec![(TOPIC_KEY.to_owned(), topic.as_str().to_owned())];
            if let Some(entries) = entries {
                row.extend(
                    flatten_object(entries)
                        .into_iter()
                        .filter(|(key, _)| key != TOPIC_KEY),
                );
            }
            row
        });

        SectionResult {
            table: Some(RowTable::from_rows(CHECKLIST_SHEET, &declared, rows)),
            warnings,
        }
    }
}

/// What flattening one section produced.
struct SectionResult {
    table: Option<RowTable>,
    warnings: Vec<SectionFlattenError>,
}

impl SectionResult {
    fn table(table: RowTable) -> Self {
        Self {
            table: Some(table),
            warnings: Vec::new(),
        }
    }

    fn omitted(warning: SectionFlattenError) -> Self {
        Self {
            table: None,
            warnings: vec![warning],
        }
    }
}

/// Resolves `parent[key]` as an object, or explains why it cannot be.
fn object_section<'v>(
    parent: &'v Value,
    key: &str,
    sheet: &str,
) -> Result<&'v [(String, Value)], SectionFlattenError> {
    match parent.get(key) {
        None => Err(SectionFlattenError::new(sheet, FlattenIssue::MissingSection)),
        Some(value) => value
            .as_object()
            .ok_or_else(|| SectionFlattenError::new(sheet, FlattenIssue::NotAnObject)),
    }
}

/// The single-row table emitted for a clause without item rows.
fn sentinel(sheet: &str, applicable: bool) -> RowTable {
    RowTable::from_rows(
        sheet,
        &[],
        [vec![(APPLICABLE_KEY.to_owned(), applicable.to_string())]],
    )
}

fn topic_position(topic: ChecklistTopic) -> usize {
    ChecklistTopic::ALL
        .iter()
        .position(|t| *t == topic)
        .unwrap_or_default()
}

/// Flattens an object into `(column, cell)` pairs.
///
/// Scalars map to themselves, arrays are joined into one cell, and nested
/// objects expand into `parent.child` columns.
fn flatten_object(entries: &[(String, Value)]) -> Row {
    let mut row = Vec::with_capacity(entries.len());
    push_entries(&mut row, None, entries);
    row
}

fn push_entries(row: &mut Row, prefix: Option<&str>, entries: &[(String, Value)]) {
    for (key, value) in entries {
        let column = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => push_entries(row, Some(&column), nested),
            other => row.push((column, other.to_cell())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(report: serde_json::Value) -> ExtractionResult {
        ExtractionResult::from_value(
            Value::from(json!({ "comprehensive_audit_analysis": report })),
            extraction_schema(),
        )
        .unwrap()
    }

    fn flatten(report: serde_json::Value) -> Flattened {
        Flattener::default().flatten(&result(report))
    }

    fn full_report() -> serde_json::Value {
        json!({
            "summary": {
                "company_name": "Tejarat Bank",
                "auditor_name": "Audit Organization",
                "fiscal_period": "fiscal year ended 19 March 2020",
                "opinion_type": "qualified",
                "auditor_risk_level": "high",
                "model_risk_level": "critical",
                "model_risk_rationale": "Capital adequacy below threshold.",
                "key_findings": ["Capital shortfall", "Tax disputes", "Unreconciled FX"]
            },
            "report_analysis": {
                "opinion_clause": {"opinion": "qualified", "reasons_summary": "Provisioning gaps."},
                "basis_for_opinion": {
                    "applicable": true,
                    "items": [
                        {"item_number": 1, "title": "Provisions", "description": "Under-provisioned loans", "reason_type": "departure-from-accounting-standards"},
                        {"item_number": 2, "title": "Confirmations", "description": "Not received", "reason_type": "scope-limitation"},
                        {"item_number": 3, "title": "Tax", "description": "Open assessments", "reason_type": "other"}
                    ]
                },
                "emphasis_of_matter": {"applicable": false},
                "legal_compliance": {
                    "applicable": true,
                    "violations": [{
                        "violation_title": "Lending limits",
                        "description": "Single-borrower limit exceeded",
                        "legal_bases": ["Central Bank regulations and directives", "Monetary and Banking Law"]
                    }]
                }
            },
            "topic_checklist": [
                {"topic": "provisioning", "reported_in_document": true, "status": "critical-risk", "numeric_value": "1200000", "details": "Shortfall"},
                {"topic": "capital adequacy", "reported_in_document": true, "status": "key-qualifying-issue", "numeric_value": "NaN", "details": "Below 8%"}
            ]
        })
    }

    #[test]
    fn full_report_yields_every_sheet_in_order() {
        let out = flatten(full_report());
        let sheets: Vec<&str> = out.tables.iter().map(RowTable::sheet_name).collect();
        assert_eq!(
            sheets,
            [SUMMARY_SHEET, OPINION_SHEET, BASIS_SHEET, EMPHASIS_SHEET, LEGAL_SHEET, CHECKLIST_SHEET]
        );
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn summary_is_one_row_with_joined_findings() {
        let out = flatten(full_report());
        let summary = out.table(SUMMARY_SHEET).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.columns()[0], "company_name");
        assert_eq!(
            summary.cell(0, "key_findings"),
            Some("Capital shortfall, Tax disputes, Unreconciled FX")
        );
        // Both risk judgements survive side by side.
        assert_eq!(summary.cell(0, "auditor_risk_level"), Some("high"));
        assert_eq!(summary.cell(0, "model_risk_level"), Some("critical"));
    }

    #[test]
    fn summary_missing_fields_become_empty_cells() {
        let out = flatten(json!({"summary": {"company_name": "Acme", "extra_note": "kept"}}));
        let summary = out.table(SUMMARY_SHEET).unwrap();
        assert_eq!(summary.columns().len(), 9);
        assert_eq!(summary.cell(0, "auditor_name"), Some(""));
        assert_eq!(summary.cell(0, "extra_note"), Some("kept"));
    }

    #[test]
    fn inapplicable_clause_yields_the_sentinel_row() {
        let out = flatten(full_report());
        let emphasis = out.table(EMPHASIS_SHEET).unwrap();
        assert_eq!(emphasis.columns(), ["applicable"]);
        assert_eq!(emphasis.rows(), [vec!["false"]]);
    }

    #[test]
    fn applicable_clause_without_list_yields_the_sentinel_row() {
        let out = flatten(json!({"report_analysis": {"basis_for_opinion": {"applicable": true}}}));
        assert_eq!(out.table(BASIS_SHEET).unwrap().rows(), [vec!["false"]]);
    }

    #[test]
    fn applicable_clause_yields_one_row_per_item() {
        let out = flatten(full_report());
        let basis = out.table(BASIS_SHEET).unwrap();
        assert_eq!(basis.len(), 3);
        assert_eq!(
            basis.columns(),
            ["item_number", "title", "description", "reason_type"]
        );
        assert_eq!(basis.column("item_number"), ["1", "2", "3"]);
    }

    #[test]
    fn legal_bases_are_joined_into_one_cell() {
        let out = flatten(full_report());
        let legal = out.table(LEGAL_SHEET).unwrap();
        assert_eq!(legal.len(), 1);
        assert_eq!(
            legal.cell(0, "legal_bases"),
            Some("Central Bank regulations and directives, Monetary and Banking Law")
        );
    }

    #[test]
    fn applicable_clause_with_empty_list_is_not_empty() {
        let out = flatten(json!({"report_analysis": {"legal_compliance": {"applicable": true, "violations": []}}}));
        let legal = out.table(LEGAL_SHEET).unwrap();
        assert_eq!(legal.rows(), [vec!["true"]]);
    }

    #[test]
    fn heterogeneous_items_share_one_header() {
        let out = flatten(json!({"report_analysis": {"emphasis_of_matter": {
            "applicable": "true",
            "items": [
                {"title": "A", "note": "first"},
                {"highlighted_risk": "liquidity", "title": "B", "source": {"page": 4, "para": "2.1"}}
            ]
        }}}));
        let emphasis = out.table(EMPHASIS_SHEET).unwrap();
        assert_eq!(
            emphasis.columns(),
            ["title", "description", "highlighted_risk", "note", "source.page", "source.para"]
        );
        assert_eq!(emphasis.rows()[0], ["A", "", "", "first", "", ""]);
        assert_eq!(emphasis.rows()[1], ["B", "", "liquidity", "", "4", "2.1"]);
    }

    #[test]
    fn malformed_items_are_skipped_with_a_warning() {
        let out = flatten(json!({"report_analysis": {"basis_for_opinion": {
            "applicable": true,
            "items": ["just text", {"title": "real"}]
        }}}));
        assert_eq!(out.table(BASIS_SHEET).unwrap().len(), 1);
        assert!(out.warnings.contains(&SectionFlattenError::new(
            BASIS_SHEET,
            FlattenIssue::MalformedItem { index: 0 }
        )));
    }

    #[test]
    fn applicable_clause_with_only_malformed_items_stays_applicable() {
        let out = flatten(json!({"report_analysis": {"basis_for_opinion": {
            "applicable": true,
            "items": ["text only"]
        }}}));
        let basis = out.table(BASIS_SHEET).unwrap();
        assert_eq!(basis.columns(), ["applicable"]);
        assert_eq!(basis.rows(), [vec!["true"]]);
        let basis_warnings: Vec<&SectionFlattenError> =
            out.warnings.iter().filter(|w| w.section == BASIS_SHEET).collect();
        assert_eq!(
            basis_warnings,
            [&SectionFlattenError::new(BASIS_SHEET, FlattenIssue::MalformedItem { index: 0 })]
        );
    }

    #[test]
    fn checklist_always_has_every_topic_in_declared_order() {
        let out = flatten(full_report());
        let checklist = out.table(CHECKLIST_SHEET).unwrap();
        assert_eq!(checklist.len(), 15);
        assert_eq!(checklist.column("topic"), ChecklistTopic::VALUES);
        assert_eq!(
            checklist.columns(),
            ["topic", "reported_in_document", "status", "numeric_value", "details"]
        );
        assert_eq!(checklist.cell(0, "status"), Some("key-qualifying-issue"));
        assert_eq!(checklist.cell(0, "numeric_value"), Some("NaN"));
        assert_eq!(checklist.cell(14, "numeric_value"), Some("1200000"));
        assert_eq!(checklist.cell(14, "reported_in_document"), Some("true"));
        assert_eq!(checklist.cell(5, "status"), Some(""));
    }

    #[test]
    fn checklist_without_section_still_lists_every_topic() {
        let out = flatten(json!({}));
        assert_eq!(out.table(CHECKLIST_SHEET).unwrap().len(), 15);
        assert!(out.warnings.contains(&SectionFlattenError::new(
            CHECKLIST_SHEET,
            FlattenIssue::MissingSection
        )));
    }

    #[test]
    fn checklist_ignores_unknown_and_repeated_topics() {
        let out = flatten(json!({"topic_checklist": [
            {"topic": "barter", "status": "reviewed-no-risk"},
            {"topic": "barter", "status": "critical-risk"},
            {"topic": "weather", "status": "critical-risk"}
        ]}));
        let checklist = out.table(CHECKLIST_SHEET).unwrap();
        assert_eq!(checklist.len(), 15);
        assert_eq!(checklist.cell(5, "status"), Some("reviewed-no-risk"));
        let issues: Vec<&FlattenIssue> = out.warnings.iter().map(|w| &w.issue).collect();
        assert!(issues.contains(&&FlattenIssue::DuplicateTopic { topic: "barter".into() }));
        assert!(issues.contains(&&FlattenIssue::UnknownTopic { topic: "weather".into() }));
    }

    #[test]
    fn one_bad_section_does_not_stop_the_others() {
        let out = flatten(json!({
            "summary": "oops",
            "report_analysis": {"opinion_clause": {"opinion": "adverse", "reasons_summary": "x"}},
            "topic_checklist": {"not": "a list"}
        }));
        assert!(out.table(SUMMARY_SHEET).is_none());
        assert!(out.table(OPINION_SHEET).is_some());
        assert_eq!(out.table(CHECKLIST_SHEET).unwrap().len(), 15);
        let issues: Vec<(&str, &FlattenIssue)> = out
            .warnings
            .iter()
            .map(|w| (w.section.as_str(), &w.issue))
            .collect();
        assert!(issues.contains(&(SUMMARY_SHEET, &FlattenIssue::NotAnObject)));
        assert!(issues.contains(&(CHECKLIST_SHEET, &FlattenIssue::NotAnArray)));
        assert!(issues.contains(&(BASIS_SHEET, &FlattenIssue::MissingSection)));
    }

    #[test]
    fn no_cell_ever_holds_a_collection() {
        let out = flatten(json!({
            "summary": {"company_name": "X", "key_findings": [["nested", "list"], {"deep": [1, 2]}]},
            "report_analysis": {"legal_compliance": {"applicable": true, "violations": [
                {"violation_title": "t", "legal_bases": ["Accounting standards", "Auditing standards"], "meta": {"refs": [1, 2]}}
            ]}},
            "topic_checklist": [{"topic": "barter", "details": ["a", "b"]}]
        }));
        for table in &out.tables {
            for row in table.rows() {
                assert_eq!(row.len(), table.columns().len(), "{} is ragged", table.sheet_name());
            }
        }
        let legal = out.table(LEGAL_SHEET).unwrap();
        assert_eq!(legal.cell(0, "meta.refs"), Some("1, 2"));
        assert_eq!(
            out.table(SUMMARY_SHEET).unwrap().cell(0, "key_findings"),
            Some(r#"nested, list, {"deep":[1,2]}"#)
        );
        assert_eq!(out.table(CHECKLIST_SHEET).unwrap().cell(5, "details"), Some("a, b"));
    }
}
