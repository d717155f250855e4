//! Validation outcome types.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::coercion::round2;

use super::rule::ValidationRule;

/// Most unexpected values listed per rule.
pub const PARTIAL_UNEXPECTED_LIMIT: usize = 20;

/// Row-level tallies for one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultDetail {
    pub element_count: usize,
    pub missing_count: usize,
    pub missing_percent: f64,
    pub unexpected_count: usize,
    pub unexpected_percent: f64,
    pub partial_unexpected_list: Vec<Value>,
}

/// Raw per-row outcome of an expectation, before percentages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowOutcome {
    pub element_count: usize,
    pub missing_count: usize,
    pub unexpected_count: usize,
    pub unexpected_values: Vec<Value>,
    /// Count missing rows in the `unexpected_percent` denominator.
    pub missing_is_unexpected: bool,
}

impl RowOutcome {
    pub fn new(element_count: usize) -> Self {
        Self {
            element_count,
            ..Self::default()
        }
    }

    pub fn missing(&mut self) {
        self.missing_count += 1;
    }

    pub fn unexpected(&mut self, value: Value) {
        self.unexpected_count += 1;
        if self.unexpected_values.len() < PARTIAL_UNEXPECTED_LIMIT {
            self.unexpected_values.push(value);
        }
    }

    /// Whether the rule holds, honoring an optional `mostly` fraction.
    pub fn success(&self, mostly: Option<f64>) -> bool {
        let considered = self.considered();
        match mostly {
            Some(mostly) if considered > 0 => {
                let expected = (considered - self.unexpected_count) as f64 / considered as f64;
                expected >= mostly
            }
            _ => self.unexpected_count == 0,
        }
    }

    fn considered(&self) -> usize {
        if self.missing_is_unexpected {
            self.element_count
        } else {
            self.element_count - self.missing_count
        }
    }

    pub fn into_detail(self) -> ResultDetail {
        let pct = |part: usize, whole: usize| {
            if whole == 0 { 0.0 } else { round2(part as f64 / whole as f64 * 100.0) }
        };
        ResultDetail {
            element_count: self.element_count,
            missing_count: self.missing_count,
            missing_percent: pct(self.missing_count, self.element_count),
            unexpected_count: self.unexpected_count,
            unexpected_percent: pct(self.unexpected_count, self.considered()),
            partial_unexpected_list: self.unexpected_values,
        }
    }
}

/// Hard failure raised while preparing or running one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExceptionInfo {
    pub raised_exception: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
}

impl ExceptionInfo {
    pub fn raised(message: impl Into<String>) -> Self {
        Self {
            raised_exception: true,
            exception_message: Some(message.into()),
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Outcome of one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub success: bool,
    /// Not evaluated because the expectation type is unsupported.
    #[serde(skip_serializing_if = "is_false")]
    pub skipped: bool,
    /// The rule as executed, after renames and synthetic-column rewrites.
    pub expectation_config: ValidationRule,
    pub result: ResultDetail,
    pub exception_info: ExceptionInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RuleResult {
    pub fn evaluated(rule: ValidationRule, outcome: RowOutcome, mostly: Option<f64>) -> Self {
        Self {
            success: outcome.success(mostly),
            skipped: false,
            expectation_config: rule,
            result: outcome.into_detail(),
            exception_info: ExceptionInfo::default(),
            warnings: Vec::new(),
        }
    }

    pub fn failed(rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            expectation_config: rule,
            result: ResultDetail::default(),
            exception_info: ExceptionInfo::raised(message),
            warnings: Vec::new(),
        }
    }

    pub fn skipped(rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::failed(rule, message)
        }
    }
}

/// Counts over all rules of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStatistics {
    pub evaluated_expectations: usize,
    pub successful_expectations: usize,
    pub unsuccessful_expectations: usize,
    pub skipped_expectations: usize,
    /// `None` when nothing was evaluated.
    pub success_percent: Option<f64>,
}

/// Result of validating a dataset against a rule list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// True when every evaluated rule succeeded. Skipped rules do not count.
    pub success: bool,
    pub statistics: ValidationStatistics,
    pub results: Vec<RuleResult>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub column_renames: IndexMap<String, String>,
}

impl ValidationReport {
    pub fn new(results: Vec<RuleResult>, column_renames: IndexMap<String, String>) -> Self {
        let skipped = results.iter().filter(|r| r.skipped).count();
        let evaluated = results.len() - skipped;
        let successful = results.iter().filter(|r| !r.skipped && r.success).count();
        let statistics = ValidationStatistics {
            evaluated_expectations: evaluated,
            successful_expectations: successful,
            unsuccessful_expectations: evaluated - successful,
            skipped_expectations: skipped,
            success_percent: (evaluated > 0)
                .then(|| round2(successful as f64 / evaluated as f64 * 100.0)),
        };
        Self {
            success: successful == evaluated,
            statistics,
            results,
            column_renames,
        }
    }

    /// Rules that were evaluated and failed.
    pub fn failures(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.skipped && !r.success)
    }
}
