//! Heuristic data quality issues derived from profiling metrics.

mod detector;
mod issue;

pub use detector::{
    ColumnContext, HighCardinalityCheck, HighNullCheck, InconsistentCasingCheck, MixedTypesCheck,
    QualityCheck, QualityIssueDetector, QualityThresholds, SpecialCharactersCheck,
};
pub use issue::{IssueType, QualityIssue, Severity};
