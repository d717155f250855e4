//! Declarative validation rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProbeError, Result};

/// Supported expectation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpectationType {
    #[serde(rename = "expect_column_values_to_not_be_null")]
    NotBeNull,
    #[serde(rename = "expect_column_values_to_be_between")]
    BeBetween,
    #[serde(rename = "expect_column_values_to_not_match_regex")]
    NotMatchRegex,
    #[serde(rename = "expect_column_values_to_match_regex")]
    MatchRegex,
    #[serde(rename = "expect_column_values_to_not_be_empty")]
    NotBeEmpty,
    #[serde(rename = "expect_column_values_to_be_greater_than")]
    BeGreaterThan,
    #[serde(rename = "expect_column_values_to_be_less_than")]
    BeLessThan,
    #[serde(rename = "expect_column_pair_values_to_be_equal")]
    ColumnPairValuesToBeEqual,
}

impl ExpectationType {
    pub const ALL: [ExpectationType; 8] = [
        ExpectationType::NotBeNull,
        ExpectationType::BeBetween,
        ExpectationType::NotMatchRegex,
        ExpectationType::MatchRegex,
        ExpectationType::NotBeEmpty,
        ExpectationType::BeGreaterThan,
        ExpectationType::BeLessThan,
        ExpectationType::ColumnPairValuesToBeEqual,
    ];

    /// Wire name, e.g. `expect_column_values_to_not_be_null`.
    pub fn name(&self) -> &'static str {
        match self {
            ExpectationType::NotBeNull => "expect_column_values_to_not_be_null",
            ExpectationType::BeBetween => "expect_column_values_to_be_between",
            ExpectationType::NotMatchRegex => "expect_column_values_to_not_match_regex",
            ExpectationType::MatchRegex => "expect_column_values_to_match_regex",
            ExpectationType::NotBeEmpty => "expect_column_values_to_not_be_empty",
            ExpectationType::BeGreaterThan => "expect_column_values_to_be_greater_than",
            ExpectationType::BeLessThan => "expect_column_values_to_be_less_than",
            ExpectationType::ColumnPairValuesToBeEqual => "expect_column_pair_values_to_be_equal",
        }
    }
}

impl fmt::Display for ExpectationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExpectationType {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        ExpectationType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ProbeError::InvalidRule {
                expectation_type: s.to_string(),
                message: "unsupported expectation type".to_string(),
            })
    }
}

/// Formatting hints and free-form annotations attached to a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One declarative check.
///
/// `expectation_type` stays a plain string so that rule files naming
/// unsupported expectations still load; they are skipped at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub expectation_type: String,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    #[serde(default)]
    pub meta: RuleMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl ValidationRule {
    pub fn new(expectation_type: ExpectationType) -> Self {
        Self {
            expectation_type: expectation_type.name().to_string(),
            kwargs: Map::new(),
            meta: RuleMeta::default(),
            rule_id: None,
        }
    }

    /// `expect_column_values_to_not_be_null` on `column`.
    pub fn not_null(column: &str) -> Self {
        Self::new(ExpectationType::NotBeNull).with_kwarg("column", column)
    }

    /// `expect_column_values_to_be_between` on `column`.
    pub fn between(column: &str, min_value: f64, max_value: f64) -> Self {
        Self::new(ExpectationType::BeBetween)
            .with_kwarg("column", column)
            .with_kwarg("min_value", min_value)
            .with_kwarg("max_value", max_value)
    }

    /// `expect_column_values_to_be_greater_than` on `column`.
    pub fn greater_than(column: &str, value: f64) -> Self {
        Self::new(ExpectationType::BeGreaterThan)
            .with_kwarg("column", column)
            .with_kwarg("value", value)
    }

    /// `expect_column_values_to_be_less_than` on `column`.
    pub fn less_than(column: &str, value: f64) -> Self {
        Self::new(ExpectationType::BeLessThan)
            .with_kwarg("column", column)
            .with_kwarg("value", value)
    }

    /// `expect_column_pair_values_to_be_equal` between a column and a column
    /// name or arithmetic expression.
    pub fn pair_equal(column_a: &str, column_b: &str) -> Self {
        Self::new(ExpectationType::ColumnPairValuesToBeEqual)
            .with_kwarg("column_A", column_a)
            .with_kwarg("column_B", column_b)
    }

    pub fn with_kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }

    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn with_decimal_places(mut self, decimal_places: u32) -> Self {
        self.meta.decimal_places = Some(decimal_places);
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.meta.date_format = Some(date_format.into());
        self
    }

    /// Parsed expectation type.
    pub fn kind(&self) -> Result<ExpectationType> {
        self.expectation_type.parse()
    }

    fn invalid(&self, message: impl Into<String>) -> ProbeError {
        ProbeError::InvalidRule {
            expectation_type: self.expectation_type.clone(),
            message: message.into(),
        }
    }

    /// Required string argument.
    pub fn str_kwarg(&self, key: &str) -> Result<&str> {
        match self.kwargs.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(self.invalid(format!("'{key}' must be a string"))),
            None => Err(self.invalid(format!("missing required argument '{key}'"))),
        }
    }

    /// Optional numeric argument. Numeric strings are accepted.
    pub fn f64_kwarg(&self, key: &str) -> Result<Option<f64>> {
        match self.kwargs.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(format!("'{key}' must be a number"))),
            Some(_) => Err(self.invalid(format!("'{key}' must be a number"))),
        }
    }

    /// Optional boolean argument, false when absent.
    pub fn bool_kwarg(&self, key: &str) -> bool {
        self.kwargs.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The `mostly` threshold, if given, clamped to `0..=1`.
    pub fn mostly(&self) -> Result<Option<f64>> {
        Ok(self.f64_kwarg("mostly")?.map(|m| m.clamp(0.0, 1.0)))
    }

    /// The `$eval` expression of a `value: {"$eval": ...}` argument.
    pub fn eval_expression(&self) -> Option<&str> {
        self.kwargs.get("value")?.get("$eval")?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_rule() {
        let rule: ValidationRule = serde_json::from_value(json!({
            "expectation_type": "expect_column_values_to_be_between",
            "kwargs": {"column": "age", "min_value": 0, "max_value": "120"},
            "meta": {"decimal_places": 2, "notes": "adults"}
        }))
        .unwrap();

        assert_eq!(rule.kind().unwrap(), ExpectationType::BeBetween);
        assert_eq!(rule.str_kwarg("column").unwrap(), "age");
        assert_eq!(rule.f64_kwarg("min_value").unwrap(), Some(0.0));
        assert_eq!(rule.f64_kwarg("max_value").unwrap(), Some(120.0));
        assert_eq!(rule.meta.decimal_places, Some(2));
        assert_eq!(rule.meta.extra["notes"], "adults");
    }

    #[test]
    fn test_unknown_type_still_loads() {
        let rule: ValidationRule = serde_json::from_value(json!({
            "expectation_type": "expect_table_row_count_to_equal",
            "kwargs": {"value": 3}
        }))
        .unwrap();
        assert!(matches!(rule.kind(), Err(ProbeError::InvalidRule { .. })));
    }

    #[test]
    fn test_missing_kwarg() {
        let rule = ValidationRule::new(ExpectationType::NotBeNull);
        let err = rule.str_kwarg("column").unwrap_err();
        assert!(err.to_string().contains("missing required argument 'column'"));
    }

    #[test]
    fn test_eval_expression() {
        let rule = ValidationRule::new(ExpectationType::ColumnPairValuesToBeEqual)
            .with_kwarg("column_A", "total")
            .with_kwarg("value", json!({"$eval": "price * qty"}));
        assert_eq!(rule.eval_expression(), Some("price * qty"));
    }

    #[test]
    fn test_wire_names_round_trip() {
        for kind in ExpectationType::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.name());
            assert_eq!(kind.name().parse::<ExpectationType>().unwrap(), kind);
        }
    }
}
