//! Column resolution and vectorized evaluation.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::coercion::{coerce_datetime, coerce_numeric, epoch_seconds, round_to, to_bool, to_number};
use crate::error::{ProbeError, Result};
use crate::inference::{ColumnType, NumericKind, TypeClassifier};
use crate::input::{Column, ColumnSource, StorageType, TabularDataset};

use super::{ExpressionError, parse, tokenize};

/// Name of the numeric stand-in created for a referenced column.
pub fn synthetic_name(column: &str) -> String {
    format!("__numeric_{}", column.replace(' ', "_"))
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace every whole-word occurrence of `old` with `new`. A match must not
/// be preceded or followed by a letter, digit or underscore.
pub fn replace_whole_word(text: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev: Option<char> = None;
    while let Some(c) = rest.chars().next() {
        let boundary_before = !prev.is_some_and(is_word);
        let boundary_after = || !rest[old.len()..].chars().next().is_some_and(is_word);
        if boundary_before && rest.starts_with(old) && boundary_after() {
            out.push_str(new);
            prev = old.chars().next_back();
            rest = &rest[old.len()..];
            continue;
        }
        out.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Result of evaluating an expression over every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Expression as given.
    pub expression: String,
    /// Expression after column names were swapped for synthetic names.
    pub rewritten: String,
    /// One result per row; `None` where an operand was missing or the result
    /// was not finite.
    pub values: Vec<Option<f64>>,
    /// Numeric stand-ins built for the referenced columns.
    pub synthetic_columns: Vec<Column>,
    /// Coercion problems worth surfacing to the caller.
    pub warnings: Vec<String>,
}

impl Evaluation {
    /// Turn the result series into a float column.
    pub fn to_column(&self, name: impl Into<String>) -> Column {
        Column::from_floats(name, self.values.iter().copied()).with_storage(StorageType::Float)
    }
}

/// Evaluates arithmetic expressions whose operands are column names.
///
/// Every referenced column is classified and coerced into a numeric
/// synthetic column first: datetimes become Unix epoch seconds, integer
/// columns read invalid entries as 0, booleans become 0/1, and everything
/// else goes through decimal coercion with failures read as 0.
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    classifier: TypeClassifier,
    decimal_places: Option<u32>,
    date_format: Option<String>,
}

impl ExpressionEvaluator {
    pub fn new(classifier: TypeClassifier) -> Self {
        Self {
            classifier,
            decimal_places: None,
            date_format: None,
        }
    }

    /// Round decimal coercion and the final result to this many places.
    pub fn with_decimal_places(mut self, decimal_places: Option<u32>) -> Self {
        self.decimal_places = decimal_places;
        self
    }

    /// Parse datetime operands with this format before falling back.
    pub fn with_date_format(mut self, date_format: Option<String>) -> Self {
        self.date_format = date_format;
        self
    }

    /// Evaluate `expression` against the columns of `source`.
    pub fn evaluate(&self, source: &dyn ColumnSource, expression: &str) -> Result<Evaluation> {
        self.evaluate_with_mapping(source, expression, None)
    }

    /// Evaluate after applying an explicit rename map to the expression text.
    pub fn evaluate_with_mapping(
        &self,
        source: &dyn ColumnSource,
        expression: &str,
        mapping: Option<&IndexMap<String, String>>,
    ) -> Result<Evaluation> {
        let invalid = |err: ExpressionError| ProbeError::InvalidExpression {
            expression: expression.to_string(),
            message: err.to_string(),
        };

        let mut text = expression.to_string();
        for (old, new) in mapping.into_iter().flatten() {
            text = replace_whole_word(&text, old, new);
        }

        let (rewritten, referenced) = resolve_columns(&text, &source.column_names());
        let expr = tokenize(&rewritten).and_then(|tokens| parse(&tokens)).map_err(invalid)?;

        let mut lookup: HashMap<String, Vec<Option<f64>>> = HashMap::new();
        let mut synthetic_columns = Vec::with_capacity(referenced.len());
        let mut warnings = Vec::new();
        for (original, synthetic) in &referenced {
            let Some(column) = source.column(original) else {
                return Err(ProbeError::ColumnNotFound(original.clone()));
            };
            let (values, warning) = self.numeric_view(column);
            warnings.extend(warning);
            synthetic_columns.push(
                Column::from_floats(synthetic.clone(), values.iter().copied())
                    .with_storage(StorageType::Float),
            );
            lookup.insert(synthetic.clone(), values);
        }

        if let Some(unknown) = expr.columns().into_iter().find(|name| !lookup.contains_key(*name)) {
            return Err(invalid(ExpressionError::UnknownIdentifier(unknown.to_string())));
        }

        let values = (0..source.row_count())
            .map(|row| {
                let value = expr.eval(&|name: &str| {
                    lookup.get(name).and_then(|col| col.get(row).copied().flatten())
                });
                match self.decimal_places {
                    Some(dp) => value.map(|v| round_to(v, dp)),
                    None => value,
                }
            })
            .collect();

        debug!(expression, rewritten = %rewritten, "evaluated expression");
        Ok(Evaluation {
            expression: expression.to_string(),
            rewritten,
            values,
            synthetic_columns,
            warnings,
        })
    }

    /// Evaluate and append the result to `dataset` as a single new column.
    /// Synthetic operand columns are not added.
    pub fn materialize_into(
        &self,
        dataset: &mut TabularDataset,
        name: &str,
        expression: &str,
    ) -> Result<Evaluation> {
        let evaluation = self.evaluate(dataset, expression)?;
        dataset.push_column(evaluation.to_column(name))?;
        Ok(evaluation)
    }

    /// Numeric stand-in for a column, chosen by its classified type.
    fn numeric_view(&self, column: &Column) -> (Vec<Option<f64>>, Option<String>) {
        let info = self.classifier.classify(column);
        debug!(
            column = %column.name,
            base_type = info.base_type(),
            specific_type = info.specific_type(),
            "materializing numeric column"
        );

        match info.column_type {
            ColumnType::Datetime(_) => {
                let stamps = coerce_datetime(&column.values, self.date_format.as_deref());
                let values = stamps
                    .iter()
                    .map(|dt| dt.as_ref().map(|dt| epoch_seconds(dt) as f64))
                    .collect();
                (values, None)
            }
            ColumnType::Numeric(NumericKind::Integer) => {
                let values = column
                    .values
                    .iter()
                    .map(|v| Some(to_number(v).map(f64::trunc).unwrap_or(0.0)))
                    .collect();
                (values, None)
            }
            ColumnType::Boolean => {
                let values = column
                    .values
                    .iter()
                    .map(|v| Some(if to_bool(v) == Ok(true) { 1.0 } else { 0.0 }))
                    .collect();
                (values, None)
            }
            _ => {
                let coerced = coerce_numeric(&column.values, self.decimal_places);
                let mut failed = 0;
                let values = column
                    .values
                    .iter()
                    .zip(coerced)
                    .map(|(raw, value)| match value {
                        None if !raw.is_null() => {
                            failed += 1;
                            Some(0.0)
                        }
                        other => other,
                    })
                    .collect();
                let warning = (failed > 0).then(|| {
                    warn!(column = %column.name, failed, "non-numeric values read as 0");
                    format!(
                        "Column '{}' has {} value(s) that could not be converted to a number; using 0",
                        column.name, failed
                    )
                });
                (values, warning)
            }
        }
    }
}

/// Swap column names in `text` for backtick-quoted synthetic names.
///
/// Names are matched longest first at word boundaries, so a column called
/// `unit price` wins over one called `unit`. Backtick-quoted names are
/// matched exactly. Returns the rewritten text and the `(column, synthetic)`
/// pairs in first-use order.
fn resolve_columns(text: &str, columns: &[&str]) -> (String, Vec<(String, String)>) {
    let mut candidates: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|name| name.starts_with(|c: char| c.is_alphabetic() || c == '_'))
        .collect();
    candidates.sort_by_key(|name| std::cmp::Reverse(name.len()));

    let mut referenced: Vec<(String, String)> = Vec::new();
    let mut reference = |name: &str| -> String {
        if let Some((_, synthetic)) = referenced.iter().find(|(col, _)| col == name) {
            return format!("`{synthetic}`");
        }
        let base = synthetic_name(name);
        let mut synthetic = base.clone();
        let mut n = 1;
        while referenced.iter().any(|(_, s)| *s == synthetic) {
            n += 1;
            synthetic = format!("{base}_{n}");
        }
        referenced.push((name.to_string(), synthetic.clone()));
        format!("`{synthetic}`")
    };

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev: Option<char> = None;
    while let Some(c) = rest.chars().next() {
        if c == '`' {
            let Some(len) = rest[1..].find('`') else {
                // Left for the tokenizer to report.
                out.push_str(rest);
                break;
            };
            let quoted = &rest[1..1 + len];
            if columns.contains(&quoted) {
                out.push_str(&reference(quoted));
            } else {
                out.push_str(&rest[..len + 2]);
            }
            rest = &rest[len + 2..];
            prev = Some('`');
            continue;
        }

        if !prev.is_some_and(is_word) {
            let matched = candidates.iter().find(|name| {
                rest.starts_with(**name) && !rest[name.len()..].chars().next().is_some_and(is_word)
            });
            if let Some(name) = matched {
                out.push_str(&reference(name));
                prev = name.chars().next_back();
                rest = &rest[name.len()..];
                continue;
            }
        }

        out.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }

    (out, referenced)
}
