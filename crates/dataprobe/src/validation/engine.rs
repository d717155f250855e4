//! Rule-validation engine.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::coercion::{coerce_datetime, coerce_numeric};
use crate::error::{ProbeError, Result};
use crate::expression::{ExpressionEvaluator, replace_whole_word};
use crate::inference::{ColumnType, TypeClassifier};
use crate::input::{CellValue, Column, ColumnSource, StorageType, TabularDataset};

use super::expectations::{Expectation, default_expectations};
use super::frame::{Frame, space_renames};
use super::report::{RuleResult, ValidationReport};
use super::rule::{ExpectationType, ValidationRule};

/// Runs a rule list against a dataset.
///
/// Rules run in order over a shared working frame: column names with
/// spaces are renamed first, pair-equality rules then materialize coerced
/// operands and computed expression columns, and each rule is checked. A
/// failing rule never stops the rules after it.
pub struct RuleValidationEngine {
    classifier: TypeClassifier,
    expectations: Vec<Box<dyn Expectation>>,
}

impl RuleValidationEngine {
    pub fn new(classifier: TypeClassifier) -> Self {
        Self {
            classifier,
            expectations: default_expectations(),
        }
    }

    /// Validate `dataset` against `rules`. The dataset is not modified.
    pub fn validate(&self, dataset: &TabularDataset, rules: &[ValidationRule]) -> ValidationReport {
        let renames = space_renames(dataset);
        let mut frame = Frame::new(dataset, &renames);

        let mut results = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let rule = rename_references(rule, &renames);
            results.push(self.run_rule(&mut frame, rule, index));
        }

        let report = ValidationReport::new(results, renames);
        info!(
            rules = rules.len(),
            successful = report.statistics.successful_expectations,
            skipped = report.statistics.skipped_expectations,
            success = report.success,
            "validation finished"
        );
        report
    }

    fn run_rule(&self, frame: &mut Frame<'_>, mut rule: ValidationRule, index: usize) -> RuleResult {
        let expectation = rule
            .kind()
            .ok()
            .and_then(|kind| self.expectations.iter().find(|e| e.expectation_type() == kind));
        let Some(expectation) = expectation else {
            warn!(expectation_type = %rule.expectation_type, "skipping unsupported expectation");
            let message = format!("Unsupported expectation type '{}'", rule.expectation_type);
            return RuleResult::skipped(rule, message);
        };

        let mut warnings = Vec::new();
        if expectation.expectation_type() == ExpectationType::ColumnPairValuesToBeEqual {
            if let Err(err) = self.prepare_pair(frame, &mut rule, index, &mut warnings) {
                warn!(rule = index, error = %err, "could not prepare pair-equality operands");
                return RuleResult::failed(rule, err.to_string());
            }
        }

        let outcome = rule
            .mostly()
            .and_then(|mostly| Ok((expectation.evaluate(&*frame, &rule)?, mostly)));
        let mut result = match outcome {
            Ok((outcome, mostly)) => RuleResult::evaluated(rule, outcome, mostly),
            Err(err) => {
                warn!(rule = index, error = %err, "rule raised an error");
                RuleResult::failed(rule, err.to_string())
            }
        };
        result.warnings = warnings;
        result
    }

    /// Replace the operands of a pair-equality rule with synthetic columns:
    /// `column_A` and a plain `column_B` are coerced, an expression in
    /// `column_B` or a `$eval` value is computed.
    fn prepare_pair(
        &self,
        frame: &mut Frame<'_>,
        rule: &mut ValidationRule,
        index: usize,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let decimal_places = rule.meta.decimal_places;
        let date_format = rule.meta.date_format.clone();

        let column_a = rule.str_kwarg("column_A")?.to_string();
        let left = self.coerce_operand(frame, &column_a, decimal_places, date_format.as_deref())?;
        rule.kwargs.insert("column_A".to_string(), Value::String(left));

        let expression = match rule.kwargs.get("column_B") {
            Some(Value::String(column_b)) if frame.column(column_b).is_some() => {
                let column_b = column_b.clone();
                let right =
                    self.coerce_operand(frame, &column_b, decimal_places, date_format.as_deref())?;
                rule.kwargs.insert("column_B".to_string(), Value::String(right));
                return Ok(());
            }
            Some(Value::String(expression)) => expression.clone(),
            _ => match rule.eval_expression() {
                Some(expression) => expression.to_string(),
                None => {
                    return Err(ProbeError::InvalidRule {
                        expectation_type: rule.expectation_type.clone(),
                        message: "requires 'column_B' or a '$eval' value".to_string(),
                    });
                }
            },
        };

        let suffix = rule.rule_id.clone().unwrap_or_else(|| index.to_string());
        let generated = format!("__expr_col_{suffix}");
        let evaluation = ExpressionEvaluator::new(self.classifier.clone())
            .with_decimal_places(decimal_places)
            .with_date_format(date_format)
            .evaluate(&*frame, &expression)?;
        info!(column = %generated, expression = %expression, "computed expression column");

        warnings.extend(evaluation.warnings.iter().cloned());
        frame.insert(evaluation.to_column(&generated), generated.clone());
        rule.meta
            .extra
            .insert("expression_column".to_string(), Value::String(expression));
        rule.meta
            .extra
            .insert("generated_column_name".to_string(), Value::String(generated.clone()));
        rule.kwargs.insert("column_B".to_string(), Value::String(generated));
        Ok(())
    }

    /// Coerce a column to datetimes or decimals, by its classified type, and
    /// add it to the frame. Returns the synthetic column name.
    fn coerce_operand(
        &self,
        frame: &mut Frame<'_>,
        name: &str,
        decimal_places: Option<u32>,
        date_format: Option<&str>,
    ) -> Result<String> {
        let column = frame
            .column(name)
            .ok_or_else(|| ProbeError::ColumnNotFound(name.to_string()))?;
        let info = self.classifier.classify(column);

        let (synthetic, coerced) = match info.column_type {
            ColumnType::Datetime(_) => {
                let values = coerce_datetime(&column.values, date_format)
                    .into_iter()
                    .map(|dt| dt.map(CellValue::DateTime).unwrap_or(CellValue::Null))
                    .collect();
                let synthetic = format!("__datetime_{name}");
                let coerced =
                    Column::new(synthetic.clone(), values).with_storage(StorageType::DateTime);
                (synthetic, coerced)
            }
            _ => {
                let synthetic = format!("__decimal_{name}");
                let values = coerce_numeric(&column.values, decimal_places);
                let coerced =
                    Column::from_floats(synthetic.clone(), values).with_storage(StorageType::Float);
                (synthetic, coerced)
            }
        };

        debug!(column = name, synthetic = %synthetic, base_type = info.base_type(), "coerced operand");
        frame.insert(coerced, synthetic.clone());
        Ok(synthetic)
    }
}

impl Default for RuleValidationEngine {
    fn default() -> Self {
        Self::new(TypeClassifier::default())
    }
}

/// Apply column renames to every column reference in a rule. Plain column
/// arguments are renamed on exact match; expressions are rewritten token by
/// token so a rename never touches part of a longer name.
pub fn rename_references(rule: &ValidationRule, renames: &IndexMap<String, String>) -> ValidationRule {
    let mut rule = rule.clone();
    if renames.is_empty() {
        return rule;
    }

    let mut ordered: Vec<(&String, &String)> = renames.iter().collect();
    ordered.sort_by_key(|(old, _)| std::cmp::Reverse(old.len()));
    let rewrite = |text: &str| {
        ordered
            .iter()
            .fold(text.to_string(), |acc, (old, new)| replace_whole_word(&acc, old, new))
    };

    for key in ["column", "column_A"] {
        if let Some(Value::String(name)) = rule.kwargs.get_mut(key) {
            if let Some(renamed) = renames.get(name.as_str()) {
                *name = renamed.clone();
            }
        }
    }
    if let Some(Value::String(column_b)) = rule.kwargs.get_mut("column_B") {
        *column_b = rewrite(column_b);
    }
    if let Some(Value::Array(list)) = rule.kwargs.get_mut("column_list") {
        for item in list.iter_mut() {
            if let Value::String(name) = item {
                if let Some(renamed) = renames.get(name.as_str()) {
                    *name = renamed.clone();
                }
            }
        }
    }
    if let Some(Value::String(expression)) =
        rule.kwargs.get_mut("value").and_then(|v| v.get_mut("$eval"))
    {
        *expression = rewrite(expression);
    }
    if let Some(Value::String(expression)) = rule.meta.extra.get_mut("expression_column") {
        *expression = rewrite(expression);
    }
    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sales() -> TabularDataset {
        TabularDataset::new(vec![
            Column::from_strs("unit price", [Some("$2.50"), Some("$4.00"), Some("$1.25")]),
            Column::from_ints("qty", [Some(2), Some(3), Some(4)]),
            Column::from_strs("total", [Some("5.00"), Some("12.00"), Some("6.00")]),
            Column::from_ints("age", [Some(30), None, Some(41)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_not_null_failure_fails_report() {
        let report = RuleValidationEngine::default()
            .validate(&sales(), &[ValidationRule::not_null("age")]);
        assert!(!report.success);
        assert_eq!(report.results[0].result.unexpected_count, 1);
        assert_eq!(report.statistics.unsuccessful_expectations, 1);
    }

    #[test]
    fn test_pair_equality_against_expression_with_spaces() {
        let data = sales();
        let rule = ValidationRule::pair_equal("total", "unit price * qty")
            .with_rule_id("t1")
            .with_decimal_places(2);
        let report = RuleValidationEngine::default().validate(&data, &[rule]);

        let result = &report.results[0];
        assert!(!result.success);
        assert_eq!(result.result.unexpected_count, 1);
        assert_eq!(result.result.partial_unexpected_list, vec![json!([6.0, 5.0])]);
        assert_eq!(result.expectation_config.kwargs["column_A"], "__decimal_total");
        assert_eq!(result.expectation_config.kwargs["column_B"], "__expr_col_t1");
        assert_eq!(
            result.expectation_config.meta.extra["expression_column"],
            "unit_price * qty"
        );
        assert_eq!(report.column_renames["unit price"], "unit_price");
        // The caller's dataset keeps its original columns.
        assert_eq!(data.column_count(), 4);
        assert!(data.column("unit price").is_some());
    }

    #[test]
    fn test_pair_equality_with_eval_value() {
        let rule = ValidationRule::new(ExpectationType::ColumnPairValuesToBeEqual)
            .with_kwarg("column_A", "qty")
            .with_kwarg("value", json!({"$eval": "age - age + qty"}));
        let report = RuleValidationEngine::default().validate(&sales(), &[rule]);
        let result = &report.results[0];
        // Integer operands read nulls as 0, so the missing age cancels out.
        assert!(result.success);
        assert_eq!(result.result.unexpected_count, 0);
        assert_eq!(result.expectation_config.kwargs["column_B"], "__expr_col_0");
    }

    #[test]
    fn test_pair_equality_between_columns() {
        let data = TabularDataset::new(vec![
            Column::from_strs("a", [Some("1,000"), Some("(5)")]),
            Column::from_floats("b", [Some(1000.0), Some(-5.0)]),
        ])
        .unwrap();
        let report = RuleValidationEngine::default()
            .validate(&data, &[ValidationRule::pair_equal("a", "b")]);
        assert!(report.success);
        assert_eq!(report.results[0].expectation_config.kwargs["column_B"], "__decimal_b");
    }

    #[test]
    fn test_bad_expression_fails_only_its_rule() {
        let rules = [
            ValidationRule::pair_equal("total", "qty * nonexistent"),
            ValidationRule::between("qty", 1.0, 10.0),
        ];
        let report = RuleValidationEngine::default().validate(&sales(), &rules);
        let broken = &report.results[0];
        assert!(!broken.success);
        assert!(broken.exception_info.raised_exception);
        assert!(
            broken
                .exception_info
                .exception_message
                .as_deref()
                .unwrap()
                .starts_with("Invalid expression")
        );
        assert!(report.results[1].success);
        assert!(!report.success);
    }

    #[test]
    fn test_deeply_nested_expression_fails_only_its_rule() {
        let nested = format!("{}qty{}", "(".repeat(20_000), ")".repeat(20_000));
        let rules = [
            ValidationRule::pair_equal("total", &nested),
            ValidationRule::not_null("qty"),
        ];
        let report = RuleValidationEngine::default().validate(&sales(), &rules);

        let broken = &report.results[0];
        assert!(broken.exception_info.raised_exception);
        assert!(
            broken
                .exception_info
                .exception_message
                .as_deref()
                .unwrap()
                .contains("nests deeper than")
        );
        assert!(report.results[1].success);
        assert_eq!(report.statistics.evaluated_expectations, 2);
    }

    #[test]
    fn test_unknown_expectation_is_skipped() {
        let rule: ValidationRule = serde_json::from_value(json!({
            "expectation_type": "expect_table_row_count_to_equal",
            "kwargs": {"value": 3}
        }))
        .unwrap();
        let report = RuleValidationEngine::default()
            .validate(&sales(), &[rule, ValidationRule::not_null("qty")]);
        assert!(report.success);
        assert!(report.results[0].skipped);
        assert_eq!(report.statistics.evaluated_expectations, 1);
    }

    #[test]
    fn test_rename_references_whole_tokens() {
        let mut renames = IndexMap::new();
        renames.insert("unit price".to_string(), "unit_price".to_string());
        renames.insert("price".to_string(), "price_x".to_string());
        let rule = ValidationRule::pair_equal("unit price", "unit price * 2 + price");
        let renamed = rename_references(&rule, &renames);
        assert_eq!(renamed.kwargs["column_A"], "unit_price");
        assert_eq!(renamed.kwargs["column_B"], "unit_price * 2 + price_x");
    }
}
