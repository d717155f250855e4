//! Row-level expectation checks.

use regex::Regex;
use serde_json::{Value, json};

use crate::coercion::{epoch_seconds, parse_number, round_to, to_number};
use crate::error::{ProbeError, Result};
use crate::input::{CellValue, Column, ColumnSource};

use super::report::RowOutcome;
use super::rule::{ExpectationType, ValidationRule};

/// A single expectation kind.
pub trait Expectation: Send + Sync {
    /// Which rules this check handles.
    fn expectation_type(&self) -> ExpectationType;

    /// Check every row of the referenced column(s).
    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome>;
}

fn lookup<'a>(source: &'a dyn ColumnSource, name: &str) -> Result<&'a Column> {
    source
        .column(name)
        .ok_or_else(|| ProbeError::ColumnNotFound(name.to_string()))
}

fn cell_json(value: &CellValue) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(value.render()))
}

/// Walk the `column` argument. Nulls are missing; with `missing_is_unexpected`
/// they also count against the rule. Other values fail when `check` is false.
fn column_map(
    source: &dyn ColumnSource,
    rule: &ValidationRule,
    missing_is_unexpected: bool,
    check: impl Fn(&CellValue) -> bool,
) -> Result<RowOutcome> {
    let column = lookup(source, rule.str_kwarg("column")?)?;
    let mut outcome = RowOutcome::new(column.len());
    outcome.missing_is_unexpected = missing_is_unexpected;
    for value in &column.values {
        if value.is_null() {
            outcome.missing();
            if missing_is_unexpected {
                outcome.unexpected(Value::Null);
            }
        } else if !check(value) {
            outcome.unexpected(cell_json(value));
        }
    }
    Ok(outcome)
}

/// Numeric reading of a cell, rounded when the rule asks for it.
fn rule_number(rule: &ValidationRule, value: &CellValue) -> Option<f64> {
    let n = to_number(value).ok()?;
    Some(match rule.meta.decimal_places {
        Some(dp) => round_to(n, dp),
        None => n,
    })
}

fn required_f64(rule: &ValidationRule, key: &str) -> Result<f64> {
    rule.f64_kwarg(key)?.ok_or_else(|| ProbeError::InvalidRule {
        expectation_type: rule.expectation_type.clone(),
        message: format!("missing required argument '{key}'"),
    })
}

pub struct NotNullExpectation;

impl Expectation for NotNullExpectation {
    fn expectation_type(&self) -> ExpectationType {
        ExpectationType::NotBeNull
    }

    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome> {
        column_map(source, rule, true, |_| true)
    }
}

/// Not null and not blank.
pub struct NotEmptyExpectation;

impl Expectation for NotEmptyExpectation {
    fn expectation_type(&self) -> ExpectationType {
        ExpectationType::NotBeEmpty
    }

    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome> {
        column_map(source, rule, true, |v| !v.render().trim().is_empty())
    }
}

/// Inclusive bounds unless `strict_min`/`strict_max` are set. Either bound
/// may be omitted but not both. Non-numeric values are unexpected.
pub struct BetweenExpectation;

impl Expectation for BetweenExpectation {
    fn expectation_type(&self) -> ExpectationType {
        ExpectationType::BeBetween
    }

    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome> {
        let min = rule.f64_kwarg("min_value")?;
        let max = rule.f64_kwarg("max_value")?;
        if min.is_none() && max.is_none() {
            return Err(ProbeError::InvalidRule {
                expectation_type: rule.expectation_type.clone(),
                message: "at least one of 'min_value' and 'max_value' is required".to_string(),
            });
        }
        let strict_min = rule.bool_kwarg("strict_min");
        let strict_max = rule.bool_kwarg("strict_max");

        column_map(source, rule, false, |value| {
            let Some(n) = rule_number(rule, value) else {
                return false;
            };
            let above = min.is_none_or(|m| if strict_min { n > m } else { n >= m });
            let below = max.is_none_or(|m| if strict_max { n < m } else { n <= m });
            above && below
        })
    }
}

/// Strictly greater than `value`.
pub struct GreaterThanExpectation;

impl Expectation for GreaterThanExpectation {
    fn expectation_type(&self) -> ExpectationType {
        ExpectationType::BeGreaterThan
    }

    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome> {
        let bound = required_f64(rule, "value")?;
        column_map(source, rule, false, |v| rule_number(rule, v).is_some_and(|n| n > bound))
    }
}

/// Strictly less than `value`.
pub struct LessThanExpectation;

impl Expectation for LessThanExpectation {
    fn expectation_type(&self) -> ExpectationType {
        ExpectationType::BeLessThan
    }

    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome> {
        let bound = required_f64(rule, "value")?;
        column_map(source, rule, false, |v| rule_number(rule, v).is_some_and(|n| n < bound))
    }
}

/// Regex search over the text form of each value.
pub struct RegexExpectation {
    /// Values must match (`true`) or must not match (`false`).
    pub should_match: bool,
}

impl Expectation for RegexExpectation {
    fn expectation_type(&self) -> ExpectationType {
        if self.should_match {
            ExpectationType::MatchRegex
        } else {
            ExpectationType::NotMatchRegex
        }
    }

    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome> {
        let regex = Regex::new(rule.str_kwarg("regex")?)?;
        column_map(source, rule, false, |v| regex.is_match(&v.render()) == self.should_match)
    }
}

/// Row-wise equality of `column_A` and `column_B`. Rows where both sides
/// are missing are ignored.
pub struct PairEqualExpectation;

/// Comparable number for a prepared operand cell.
fn comparable(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Int(i) => Some(*i as f64),
        CellValue::Float(v) if v.is_finite() => Some(*v),
        CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::Date(_) | CellValue::DateTime(_) => {
            value.as_datetime().map(|dt| epoch_seconds(&dt) as f64)
        }
        CellValue::Text(s) => parse_number(s).ok(),
        _ => None,
    }
}

fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

impl Expectation for PairEqualExpectation {
    fn expectation_type(&self) -> ExpectationType {
        ExpectationType::ColumnPairValuesToBeEqual
    }

    fn evaluate(&self, source: &dyn ColumnSource, rule: &ValidationRule) -> Result<RowOutcome> {
        let left = lookup(source, rule.str_kwarg("column_A")?)?;
        let right = lookup(source, rule.str_kwarg("column_B")?)?;

        let mut outcome = RowOutcome::new(left.len());
        for (a, b) in left.values.iter().zip(&right.values) {
            if a.is_null() && b.is_null() {
                outcome.missing();
                continue;
            }
            let equal = match (comparable(a), comparable(b)) {
                (Some(x), Some(y)) => nearly_equal(x, y),
                _ => false,
            };
            if !equal {
                outcome.unexpected(json!([cell_json(a), cell_json(b)]));
            }
        }
        Ok(outcome)
    }
}

/// Every supported expectation.
pub fn default_expectations() -> Vec<Box<dyn Expectation>> {
    vec![
        Box::new(NotNullExpectation),
        Box::new(BetweenExpectation),
        Box::new(RegexExpectation { should_match: false }),
        Box::new(RegexExpectation { should_match: true }),
        Box::new(NotEmptyExpectation),
        Box::new(GreaterThanExpectation),
        Box::new(LessThanExpectation),
        Box::new(PairEqualExpectation),
    ]
}
