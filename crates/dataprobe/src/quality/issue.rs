//! Quality issue types.

use serde::{Deserialize, Serialize};

/// Kind of quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Share of missing values above the configured threshold.
    HighNullPercentage,
    /// Text column whose samples are partly numeric.
    MixedDataTypes,
    /// Both all-uppercase and all-lowercase samples.
    InconsistentCasing,
    /// Samples with characters other than letters, digits and whitespace.
    SpecialCharacters,
    /// Almost every non-null value is distinct.
    HighCardinality,
}

impl IssueType {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            IssueType::HighNullPercentage => "High Null Percentage",
            IssueType::MixedDataTypes => "Mixed Data Types",
            IssueType::InconsistentCasing => "Inconsistent Casing",
            IssueType::SpecialCharacters => "Special Characters",
            IssueType::HighCardinality => "High Cardinality",
        }
    }
}

/// Severity of a quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

/// A data quality issue found in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub column: String,
    pub issue_type: IssueType,
    pub description: String,
    pub severity: Severity,
}

impl QualityIssue {
    pub fn new(
        column: impl Into<String>,
        issue_type: IssueType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            issue_type,
            description: description.into(),
            severity,
        }
    }
}
