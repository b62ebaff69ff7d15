//! The `batch-report.json` run summary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use audit::schema::SUMMARY_KEY;
use audit::{BatchRunId, Outcome, Timestamp};
use batch::BatchReport;
use serde::Serialize;

/// File name of the run summary inside the output directory.
pub const REPORT_FILE: &str = "batch-report.json";

/// Per-run totals plus one line per input document.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    /// Correlates the report with the run's log output.
    pub run_id: BatchRunId,
    pub succeeded: usize,
    pub failed: usize,
    /// In input order.
    pub documents: Vec<DocumentLine<'a>>,
}

/// What happened to one document. Absent fields are omitted from the JSON.
#[derive(Debug, PartialEq, Serialize)]
pub struct DocumentLine<'a> {
    /// Source file name.
    pub name: &'a str,
    /// `success` or `failure`.
    pub status: &'static str,
    /// Engine calls made, including retries.
    pub attempts: u32,
    pub completed_at: Timestamp,
    /// Final error message of a failed document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    /// Workbook file written for a successful document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workbook: Option<&'a str>,
    /// Summary classifications, copied as extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opinion_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auditor_risk_level: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_risk_level: Option<&'a str>,
}

impl<'a> RunSummary<'a> {
    /// One line per document, in input order. `written` maps document index
    /// to workbook file name.
    pub fn new(report: &'a BatchReport, written: &'a HashMap<usize, String>) -> Self {
        let documents = report
            .outcomes
            .iter()
            .map(|o| {
                let mut line = DocumentLine {
                    name: &o.name,
                    status: "failure",
                    attempts: o.attempts,
                    completed_at: o.completed_at,
                    error: None,
                    workbook: None,
                    opinion_type: None,
                    auditor_risk_level: None,
                    model_risk_level: None,
                };
                match &o.outcome {
                    Outcome::Failure(error) => line.error = Some(&error.message),
                    Outcome::Success(result) => {
                        let summary = result.report().field(SUMMARY_KEY);
                        line.status = "success";
                        line.workbook = written.get(&o.index).map(String::as_str);
                        line.opinion_type = summary.field("opinion_type").as_str();
                        line.auditor_risk_level = summary.field("auditor_risk_level").as_str();
                        line.model_risk_level = summary.field("model_risk_level").as_str();
                    }
                }
                line
            })
            .collect();

        Self {
            run_id: report.run_id,
            succeeded: report.succeeded(),
            failed: report.failed(),
            documents,
        }
    }

    /// Writes the summary as pretty JSON into `dir`.
    pub fn write(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let path = dir.join(REPORT_FILE);
        let bytes = serde_json::to_vec_pretty(self).context("failed to encode batch report")?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit::{
        extraction_schema, DocumentOutcome, EngineError, ErrorRecord, ExtractionResult, Value,
    };
    use serde_json::json;

    fn outcome(index: usize, outcome: Outcome) -> DocumentOutcome {
        DocumentOutcome {
            index,
            name: format!("doc-{index}.pdf"),
            outcome,
            attempts: 1,
            completed_at: Timestamp::now(),
        }
    }

    fn success() -> Outcome {
        let value = Value::from(json!({
            "comprehensive_audit_analysis": {
                "summary": {
                    "company_name": "Acme",
                    "opinion_type": "adverse",
                    "auditor_risk_level": "high",
                    "model_risk_level": "critical"
                }
            }
        }));
        Outcome::Success(ExtractionResult::from_value(value, extraction_schema()).unwrap())
    }

    #[test]
    fn lines_follow_outcomes() {
        let report = BatchReport {
            run_id: BatchRunId::new_random(),
            outcomes: vec![
                outcome(0, success()),
                outcome(
                    1,
                    Outcome::Failure(ErrorRecord::from_error(&EngineError::EmptyResponse)),
                ),
            ],
        };
        let written = HashMap::from([(0, "Acme.json".to_string())]);
        let summary = RunSummary::new(&report, &written);

        assert_eq!((summary.succeeded, summary.failed), (1, 1));
        let ok = &summary.documents[0];
        assert_eq!(ok.status, "success");
        assert_eq!(ok.workbook, Some("Acme.json"));
        assert_eq!(ok.opinion_type, Some("adverse"));
        assert_eq!(ok.auditor_risk_level, Some("high"));
        assert_eq!(ok.model_risk_level, Some("critical"));
        assert_eq!(ok.error, None);

        let failed = &summary.documents[1];
        assert_eq!(failed.status, "failure");
        assert_eq!(failed.error, Some("engine response was empty"));
        assert_eq!(failed.workbook, None);
    }

    #[test]
    fn report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let report = BatchReport {
            run_id: BatchRunId::new_random(),
            outcomes: vec![outcome(0, success())],
        };
        let written = HashMap::new();
        let path = RunSummary::new(&report, &written).write(dir.path()).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(parsed["documents"][0]["name"], "doc-0.pdf");
        assert_eq!(parsed["documents"][0]["status"], "success");
        assert!(parsed["documents"][0].get("error").is_none());
        assert!(parsed["documents"][0].get("workbook").is_none());
    }
}
