//! Closed vocabularies used by the extraction schema.
//!
//! Each vocabulary is a Rust enum whose wire strings are the only values the
//! engine may return for the corresponding field. The declaration order of the
//! variants is the order in which the values are listed in the schema, and, for
//! [`ChecklistTopic`], the row order of the checklist sheet.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Macro for wire-string enums.
// Generates: enum, ALL, VALUES, as_str(), parse(), Display, serde via wire string.
// ---------------------------------------------------------------------------
macro_rules! wire_enum {
    (
        $(#[$attr:meta])*
        $name:ident {
            $( $(#[$vattr:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vattr])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Every wire string, in declaration order.
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            /// Returns the wire string for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// Parses a wire string, returning `None` for values outside the vocabulary.
            pub fn parse(value: &str) -> Option<Self> {
                match value.trim() {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $name::parse(&raw).ok_or_else(|| {
                    serde::de::Error::unknown_variant(&raw, $name::VALUES)
                })
            }
        }
    };
}

wire_enum! {
    /// The auditor's opinion on the financial statements.
    OpinionType {
        Unqualified => "unqualified",
        Qualified => "qualified",
        Adverse => "adverse",
        Disclaimer => "disclaimer",
    }
}

wire_enum! {
    /// Overall risk classification.
    ///
    /// Used twice in the summary: once as stated by the auditor and inspector,
    /// once as the engine's own judgement. The two are never reconciled.
    RiskLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

wire_enum! {
    /// Why an item was raised in the basis-for-opinion clause.
    BasisReason {
        ScopeLimitation => "scope-limitation",
        AccountingDeparture => "departure-from-accounting-standards",
        Other => "other",
    }
}

wire_enum! {
    /// Statutes and standards a legal-compliance violation may cite.
    LegalBasis {
        MonetaryAndBankingLaw => "Monetary and Banking Law",
        UsuryFreeBankingLaw => "Usury-Free Banking Operations Law",
        /// Usually the most relevant basis for bank audits.
        CentralBankRegulations => "Central Bank regulations and directives",
        ArticlesOfAssociation => "Bank articles of association",
        CommercialCode => "Commercial Code (where relevant)",
        AccountingStandards => "Accounting standards",
        AuditingStandards => "Auditing standards",
    }
}

wire_enum! {
    /// How a checklist topic was treated in the report.
    ChecklistStatus {
        NotApplicable => "not-applicable",
        ReviewedNoRisk => "reviewed-no-risk",
        KeyQualifyingIssue => "key-qualifying-issue",
        CriticalRisk => "critical-risk",
    }
}

wire_enum! {
    /// The fixed list of audit topics every report is checked against.
    ChecklistTopic {
        CapitalAdequacy => "capital adequacy",
        CurrencyTranslation => "foreign currency translation and foreign operations",
        TaxesAndPenalties => "taxes and tax penalties",
        AssetRevaluation => "revaluation of fixed and intangible assets",
        ForeignExchangeObligations => "foreign exchange obligations and disputes with the central bank",
        Barter => "barter",
        MissingConfirmations => "non-receipt of accounting confirmations",
        CentralBankAccountDiscrepancies => "central bank current account discrepancies",
        CapitalAdequacyRatio => "capital adequacy ratio",
        BaselRatios => "Basel accord ratios",
        FacilitiesAndCredits => "facilities and credits",
        GovernmentDividends => "government dividends",
        UnfinishedProjects => "unfinished execution projects",
        RelatedPartyTransactions => "related party transactions",
        Provisioning => "provisioning",
    }
}
