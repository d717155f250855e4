//! Heuristic quality checks over merged profiling metrics.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use super::issue::{IssueType, QualityIssue, Severity};
use crate::profile::{ColumnStats, DatasetMetrics, SchemaBucket};

/// Thresholds, in percent. Comparisons are strict.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Null share above which a column is flagged.
    pub high_null: f64,
    /// Null share above which the flag is high severity.
    pub severe_null: f64,
    /// Distinct share of non-null rows above which a column is flagged.
    pub high_cardinality: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            high_null: 20.0,
            severe_null: 50.0,
            high_cardinality: 90.0,
        }
    }
}

/// What a check sees for one column.
pub struct ColumnContext<'a> {
    pub name: &'a str,
    pub stats: &'a ColumnStats,
    pub metrics: &'a DatasetMetrics,
}

impl ColumnContext<'_> {
    fn in_bucket(&self, bucket: SchemaBucket) -> bool {
        self.metrics.schema_info.contains(bucket, self.name)
    }

    fn samples(&self) -> &[String] {
        &self.stats.sample_values
    }
}

/// A single quality heuristic.
pub trait QualityCheck: Send + Sync {
    /// Kind of issue this check raises.
    fn issue_type(&self) -> IssueType;

    /// Inspect one column.
    fn check(&self, column: &ColumnContext<'_>) -> Option<QualityIssue>;
}

/// Flags columns with many missing values.
pub struct HighNullCheck {
    thresholds: QualityThresholds,
}

impl QualityCheck for HighNullCheck {
    fn issue_type(&self) -> IssueType {
        IssueType::HighNullPercentage
    }

    fn check(&self, column: &ColumnContext<'_>) -> Option<QualityIssue> {
        let total = column.metrics.total_rows;
        let nulls = column.stats.null_count;
        if nulls == 0 || total == 0 {
            return None;
        }
        let pct = nulls as f64 / total as f64 * 100.0;
        if pct <= self.thresholds.high_null {
            return None;
        }
        let severity = if pct > self.thresholds.severe_null {
            Severity::High
        } else {
            Severity::Medium
        };
        Some(QualityIssue::new(
            column.name,
            self.issue_type(),
            severity,
            format!("Column has {pct:.1}% null values"),
        ))
    }
}

/// Flags text columns whose samples are partly, not wholly, numeric.
pub struct MixedTypesCheck;

impl QualityCheck for MixedTypesCheck {
    fn issue_type(&self) -> IssueType {
        IssueType::MixedDataTypes
    }

    fn check(&self, column: &ColumnContext<'_>) -> Option<QualityIssue> {
        if !column.in_bucket(SchemaBucket::String) {
            return None;
        }
        let samples = column.samples();
        let numeric = samples.iter().filter(|s| is_plain_number(s)).count();
        (numeric > 0 && numeric < samples.len()).then(|| {
            QualityIssue::new(
                column.name,
                self.issue_type(),
                Severity::Medium,
                "Column contains mix of numeric and non-numeric values",
            )
        })
    }
}

/// Flags text columns with both upper- and lower-case samples.
pub struct InconsistentCasingCheck;

impl QualityCheck for InconsistentCasingCheck {
    fn issue_type(&self) -> IssueType {
        IssueType::InconsistentCasing
    }

    fn check(&self, column: &ColumnContext<'_>) -> Option<QualityIssue> {
        if !column.in_bucket(SchemaBucket::String) {
            return None;
        }
        let samples = column.samples();
        let upper = samples.iter().any(|s| is_all_upper(s));
        let lower = samples.iter().any(|s| is_all_lower(s));
        (upper && lower).then(|| {
            QualityIssue::new(
                column.name,
                self.issue_type(),
                Severity::Low,
                "Column contains mix of upper and lower case values",
            )
        })
    }
}

/// Flags text columns with punctuation or symbols in their samples.
pub struct SpecialCharactersCheck;

impl QualityCheck for SpecialCharactersCheck {
    fn issue_type(&self) -> IssueType {
        IssueType::SpecialCharacters
    }

    fn check(&self, column: &ColumnContext<'_>) -> Option<QualityIssue> {
        if !column.in_bucket(SchemaBucket::String) {
            return None;
        }
        let special = column
            .samples()
            .iter()
            .any(|s| s.chars().any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace()));
        special.then(|| {
            QualityIssue::new(
                column.name,
                self.issue_type(),
                Severity::Low,
                "Column contains special characters",
            )
        })
    }
}

/// Flags non-numeric columns where nearly every value is distinct.
pub struct HighCardinalityCheck {
    thresholds: QualityThresholds,
}

impl QualityCheck for HighCardinalityCheck {
    fn issue_type(&self) -> IssueType {
        IssueType::HighCardinality
    }

    fn check(&self, column: &ColumnContext<'_>) -> Option<QualityIssue> {
        if column.in_bucket(SchemaBucket::Numeric) {
            return None;
        }
        let unique = column.stats.unique_count;
        let non_null = column.metrics.total_rows.saturating_sub(column.stats.null_count);
        if unique == 0 || non_null == 0 {
            return None;
        }
        let pct = unique as f64 / non_null as f64 * 100.0;
        (pct > self.thresholds.high_cardinality).then(|| {
            QualityIssue::new(
                column.name,
                self.issue_type(),
                Severity::Medium,
                format!("Column has {pct:.1}% unique values"),
            )
        })
    }
}

/// Runs every quality check over every column of merged metrics.
///
/// Each (issue type, column) pair is reported at most once per call, and a
/// call never depends on earlier ones, so re-running on the same metrics
/// yields the same list.
pub struct QualityIssueDetector {
    checks: Vec<Box<dyn QualityCheck>>,
}

impl QualityIssueDetector {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self {
            checks: vec![
                Box::new(HighNullCheck {
                    thresholds: thresholds.clone(),
                }),
                Box::new(MixedTypesCheck),
                Box::new(InconsistentCasingCheck),
                Box::new(SpecialCharactersCheck),
                Box::new(HighCardinalityCheck { thresholds }),
            ],
        }
    }

    /// Issues for the given metrics, grouped by column in column order.
    pub fn detect(&self, metrics: &DatasetMetrics) -> Vec<QualityIssue> {
        if metrics.total_rows == 0 {
            return Vec::new();
        }

        let mut seen: HashSet<(IssueType, &str)> = HashSet::new();
        let mut issues = Vec::new();

        for (name, entry) in &metrics.column_stats {
            let Some(stats) = entry.as_computed() else {
                continue;
            };
            let context = ColumnContext {
                name,
                stats,
                metrics,
            };
            for check in &self.checks {
                if !seen.insert((check.issue_type(), name.as_str())) {
                    continue;
                }
                if let Some(issue) = check.check(&context) {
                    issues.push(issue);
                }
            }
        }

        debug!(issues = issues.len(), "quality checks finished");
        issues
    }

    /// Replace the metrics' issue list with a fresh detection.
    pub fn annotate(&self, metrics: &mut DatasetMetrics) {
        metrics.data_quality_issues = self.detect(metrics);
    }
}

impl Default for QualityIssueDetector {
    fn default() -> Self {
        Self::new(QualityThresholds::default())
    }
}

/// `^-?\d*\.?\d+$`
fn is_plain_number(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    match body.split_once('.') {
        Some((whole, frac)) => all_digits(whole) && !frac.is_empty() && all_digits(frac),
        None => !body.is_empty() && all_digits(body),
    }
}

/// At least one cased character and no lowercase ones.
fn is_all_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

/// At least one cased character and no uppercase ones.
fn is_all_lower(s: &str) -> bool {
    s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase)
}
