//! The extraction contract.
//!
//! [`ExtractionSchema`] describes the exact shape the engine must return. The
//! same tree is rendered outbound as the engine's response schema
//! ([`ExtractionSchema::to_json`]) and consulted inbound for the top-level
//! presence check and for the declared column order of each table.
//!
//! The schema is built once per process; use [`extraction_schema`].

use std::sync::LazyLock;

use serde_json::{json, Map};

use crate::vocabulary::{
    BasisReason, ChecklistStatus, ChecklistTopic, LegalBasis, OpinionType, RiskLevel,
};

/// Version of the contract below. Bump whenever a key, type, or vocabulary changes.
pub const SCHEMA_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Section keys
// ---------------------------------------------------------------------------

/// The single required top-level key.
pub const ROOT_KEY: &str = "comprehensive_audit_analysis";
/// Summary and key information.
pub const SUMMARY_KEY: &str = "summary";
/// Clause-by-clause analysis of the report text.
pub const ANALYSIS_KEY: &str = "report_analysis";
/// Fixed-topic checklist.
pub const CHECKLIST_KEY: &str = "topic_checklist";

/// The opinion paragraph.
pub const OPINION_CLAUSE_KEY: &str = "opinion_clause";
/// The basis-for-opinion paragraph.
pub const BASIS_CLAUSE_KEY: &str = "basis_for_opinion";
/// The emphasis-of-matter paragraph.
pub const EMPHASIS_CLAUSE_KEY: &str = "emphasis_of_matter";
/// The report on compliance with legal requirements.
pub const LEGAL_CLAUSE_KEY: &str = "legal_compliance";

/// Flag present on every conditional clause.
pub const APPLICABLE_KEY: &str = "applicable";
/// Sub-item list of the basis and emphasis clauses.
pub const ITEMS_KEY: &str = "items";
/// Sub-item list of the legal-compliance clause.
pub const VIOLATIONS_KEY: &str = "violations";

/// Company name inside the summary; used to name exported workbooks.
pub const COMPANY_NAME_KEY: &str = "company_name";
/// Topic key inside a checklist item.
pub const TOPIC_KEY: &str = "topic";

// ---------------------------------------------------------------------------
// Field specifications
// ---------------------------------------------------------------------------

/// One node of the schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Guidance for the engine; rendered as `description`.
    pub description: Option<&'static str>,
    /// Type and children.
    pub kind: FieldKind,
}

/// The closed set of shapes a field may take.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text.
    String,
    /// Whole number.
    Integer,
    /// Flag.
    Boolean,
    /// Text restricted to the listed values.
    Enum(&'static [&'static str]),
    /// Homogeneous list of the item spec.
    Array(Box<FieldSpec>),
    /// Named properties, in declaration order.
    Object(Vec<Property>),
}

/// A named child of an object spec.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Key in the engine payload.
    pub name: &'static str,
    /// Whether the engine must always populate it.
    pub required: bool,
    /// Shape of the value.
    pub spec: FieldSpec,
}

impl FieldSpec {
    fn new(kind: FieldKind) -> Self {
        Self {
            description: None,
            kind,
        }
    }

    fn described(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Returns the properties of an object spec.
    pub fn properties(&self) -> Option<&[Property]> {
        match &self.kind {
            FieldKind::Object(properties) => Some(properties),
            _ => None,
        }
    }

    /// Returns the item spec of an array spec.
    pub fn items(&self) -> Option<&FieldSpec> {
        match &self.kind {
            FieldKind::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a direct child property by name.
    pub fn property(&self, name: &str) -> Option<&FieldSpec> {
        self.properties()?
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.spec)
    }

    /// Names of the direct child properties, in declaration order.
    pub fn property_names(&self) -> Vec<&'static str> {
        self.properties()
            .map(|ps| ps.iter().map(|p| p.name).collect())
            .unwrap_or_default()
    }

    /// Renders this node in the JSON-schema dialect the engine accepts.
    pub fn to_json(&self) -> serde_json::Value {
        let mut node = Map::new();
        match &self.kind {
            FieldKind::String => {
                node.insert("type".into(), json!("string"));
            }
            FieldKind::Integer => {
                node.insert("type".into(), json!("integer"));
            }
            FieldKind::Boolean => {
                node.insert("type".into(), json!("boolean"));
            }
            FieldKind::Enum(values) => {
                node.insert("type".into(), json!("string"));
                node.insert("enum".into(), json!(values));
            }
            FieldKind::Array(items) => {
                node.insert("type".into(), json!("array"));
                node.insert("items".into(), items.to_json());
            }
            FieldKind::Object(properties) => {
                node.insert("type".into(), json!("object"));
                let rendered: Map<String, serde_json::Value> = properties
                    .iter()
                    .map(|p| (p.name.to_owned(), p.spec.to_json()))
                    .collect();
                node.insert("properties".into(), serde_json::Value::Object(rendered));
                let required: Vec<&str> = properties
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name)
                    .collect();
                if !required.is_empty() {
                    node.insert("required".into(), json!(required));
                }
            }
        }
        if let Some(description) = self.description {
            node.insert("description".into(), json!(description));
        }
        serde_json::Value::Object(node)
    }
}

// Small builders keep the declaration below readable.

fn string() -> FieldSpec {
    FieldSpec::new(FieldKind::String)
}

fn integer() -> FieldSpec {
    FieldSpec::new(FieldKind::Integer)
}

fn boolean() -> FieldSpec {
    FieldSpec::new(FieldKind::Boolean)
}

fn one_of(values: &'static [&'static str]) -> FieldSpec {
    FieldSpec::new(FieldKind::Enum(values))
}

fn array_of(items: FieldSpec) -> FieldSpec {
    FieldSpec::new(FieldKind::Array(Box::new(items)))
}

fn object(properties: Vec<Property>) -> FieldSpec {
    FieldSpec::new(FieldKind::Object(properties))
}

fn required(name: &'static str, spec: FieldSpec) -> Property {
    Property {
        name,
        required: true,
        spec,
    }
}

fn optional(name: &'static str, spec: FieldSpec) -> Property {
    Property {
        name,
        required: false,
        spec,
    }
}

// ---------------------------------------------------------------------------
// The contract
// ---------------------------------------------------------------------------

/// The versioned extraction contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema {
    version: &'static str,
    root: FieldSpec,
}

static SCHEMA: LazyLock<ExtractionSchema> = LazyLock::new(ExtractionSchema::audit_report);

/// Returns the process-wide extraction contract.
pub fn extraction_schema() -> &'static ExtractionSchema {
    &SCHEMA
}

impl ExtractionSchema {
    /// Builds the audit-report contract.
    fn audit_report() -> Self {
        let summary = object(vec![
            required(
                COMPANY_NAME_KEY,
                string().described("Full company name as printed on the report cover."),
            ),
            required(
                "auditor_name",
                string().described("Name of the audit firm."),
            ),
            required(
                "fiscal_period",
                string().described("Fiscal period under review, e.g. 'fiscal year ended 19 March 2020'."),
            ),
            required(
                "opinion_type",
                one_of(OpinionType::VALUES).described("Type of opinion expressed by the auditor."),
            ),
            required(
                "auditor_risk_level",
                one_of(RiskLevel::VALUES)
                    .described("Overall risk level as stated or implied by the auditor and inspector."),
            ),
            required(
                "model_risk_level",
                one_of(RiskLevel::VALUES)
                    .described("Overall risk level according to your own independent judgement."),
            ),
            required(
                "model_risk_rationale",
                string().described("Reasons and details behind your own risk level."),
            ),
            required(
                "key_findings",
                array_of(string()).described("Three strings holding the most important findings and conclusions."),
            ),
        ])
        .described("Basic report information and the main conclusions at a glance.");

        let opinion_clause = object(vec![
            required("opinion", string()),
            required("reasons_summary", string()),
        ]);

        let basis_clause = object(vec![
            required(APPLICABLE_KEY, boolean()),
            optional(
                ITEMS_KEY,
                array_of(object(vec![
                    required("item_number", integer()),
                    required("title", string()),
                    required("description", string()),
                    required("reason_type", one_of(BasisReason::VALUES)),
                ])),
            ),
        ]);

        let emphasis_clause = object(vec![
            required(APPLICABLE_KEY, boolean()),
            optional(
                ITEMS_KEY,
                array_of(object(vec![
                    required("title", string()),
                    required("description", string()),
                    required("highlighted_risk", string()),
                ])),
            ),
        ]);

        let legal_clause = object(vec![
            required(APPLICABLE_KEY, boolean()),
            optional(
                VIOLATIONS_KEY,
                array_of(object(vec![
                    required("violation_title", string()),
                    required("description", string()),
                    required("legal_bases", array_of(one_of(LegalBasis::VALUES))),
                ])),
            ),
        ]);

        let analysis = object(vec![
            optional(OPINION_CLAUSE_KEY, opinion_clause),
            optional(BASIS_CLAUSE_KEY, basis_clause),
            optional(EMPHASIS_CLAUSE_KEY, emphasis_clause),
            optional(LEGAL_CLAUSE_KEY, legal_clause),
        ])
        .described("Structured, clause-by-clause analysis of the report text.");

        let checklist = array_of(object(vec![
            required(TOPIC_KEY, one_of(ChecklistTopic::VALUES)),
            required("reported_in_document", boolean()),
            required("status", one_of(ChecklistStatus::VALUES)),
            required(
                "numeric_value",
                string().described(
                    "Amount stated by the auditor or inspector for this topic. \
                     Do not read it from the financial statements; return NaN when absent.",
                ),
            ),
            required("details", string()),
        ]));

        let report = object(vec![
            optional(SUMMARY_KEY, summary),
            optional(ANALYSIS_KEY, analysis),
            optional(CHECKLIST_KEY, checklist),
        ])
        .described("Complete analysis of the independent auditor's report.");

        Self {
            version: SCHEMA_VERSION,
            root: object(vec![required(ROOT_KEY, report)]),
        }
    }

    /// Version string of this contract.
    pub fn version(&self) -> &'static str {
        self.version
    }

    /// The root object spec.
    pub fn root(&self) -> &FieldSpec {
        &self.root
    }

    /// Follows a path of property names from the root.
    pub fn spec_at(&self, path: &[&str]) -> Option<&FieldSpec> {
        path.iter()
            .try_fold(&self.root, |spec, name| spec.property(name))
    }

    /// Names of the top-level properties marked required.
    pub fn required_top_level(&self) -> Vec<&'static str> {
        self.root
            .properties()
            .map(|ps| ps.iter().filter(|p| p.required).map(|p| p.name).collect())
            .unwrap_or_default()
    }

    /// Renders the whole contract as the engine's response schema.
    pub fn to_json(&self) -> serde_json::Value {
        self.root.to_json()
    }

    /// Declared columns of the rows in the list at `path` (an array of objects).
    pub fn item_columns(&self, path: &[&str]) -> Vec<&'static str> {
        self.spec_at(path)
            .and_then(FieldSpec::items)
            .map(FieldSpec::property_names)
            .unwrap_or_default()
    }

    /// Declared columns of the object at `path`.
    pub fn object_columns(&self, path: &[&str]) -> Vec<&'static str> {
        self.spec_at(path)
            .map(FieldSpec::property_names)
            .unwrap_or_default()
    }
}
