//! Flattening of JSON-valued columns into scalar columns.
//!
//! A column whose sampled values include JSON objects or arrays is replaced by:
//! - `{col}_value` holding the scalar (non-nested) leftovers,
//! - `{col}_{key}` for each key of the first sampled object,
//! - `{col}_{key}` list columns when the values are arrays of objects,
//! - `{col}_length` and `{col}_items` when the values are plain arrays.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use super::dataset::{CellValue, Column, TabularDataset};
use crate::error::Result;

/// Number of leading non-null values inspected to decide whether a column is nested.
const NESTED_SAMPLE: usize = 10;

/// Flatten every nested column of the dataset. Non-nested columns pass through untouched.
pub fn flatten_nested(dataset: &TabularDataset) -> Result<TabularDataset> {
    if !dataset.has_nested() {
        return Ok(dataset.clone());
    }

    let mut out = Vec::with_capacity(dataset.column_count());
    for column in dataset.columns() {
        match flatten_column(column) {
            Some(replacements) => {
                debug!(
                    column = %column.name,
                    produced = replacements.len(),
                    "flattened nested column"
                );
                out.extend(replacements);
            }
            None => out.push(column.clone()),
        }
    }

    dedupe_names(&mut out);
    TabularDataset::new(out)
}

fn flatten_column(column: &Column) -> Option<Vec<Column>> {
    let sample: Vec<&Value> = column
        .non_null()
        .take(NESTED_SAMPLE)
        .filter_map(|v| match v {
            CellValue::Json(json) => Some(json),
            _ => None,
        })
        .collect();

    let first = sample.first()?;
    let name = &column.name;
    let mut produced = Vec::new();

    let scalar_rest: Vec<CellValue> = column
        .values
        .iter()
        .map(|v| match v {
            CellValue::Json(_) => CellValue::Null,
            other => other.clone(),
        })
        .collect();
    if scalar_rest.iter().any(|v| !v.is_null()) {
        produced.push(Column::new(format!("{name}_value"), scalar_rest).flattened());
    }

    match *first {
        Value::Object(map) => {
            for key in map.keys() {
                let values = column
                    .values
                    .iter()
                    .map(|v| match v {
                        CellValue::Json(Value::Object(obj)) => {
                            obj.get(key).map(CellValue::from_json).unwrap_or(CellValue::Null)
                        }
                        _ => CellValue::Null,
                    })
                    .collect();
                produced.push(Column::new(format!("{name}_{key}"), values).flattened());
            }
        }
        Value::Array(items) if items.first().map(Value::is_object).unwrap_or(false) => {
            let mut keys: IndexSet<String> = IndexSet::new();
            for value in &column.values {
                if let CellValue::Json(Value::Array(items)) = value {
                    for item in items {
                        if let Value::Object(obj) = item {
                            keys.extend(obj.keys().cloned());
                        }
                    }
                }
            }
            for key in keys {
                let values = column
                    .values
                    .iter()
                    .map(|v| match v {
                        CellValue::Json(Value::Array(items)) => CellValue::Json(Value::Array(
                            items
                                .iter()
                                .filter_map(|item| item.as_object())
                                .map(|obj| obj.get(&key).cloned().unwrap_or(Value::Null))
                                .collect(),
                        )),
                        _ => CellValue::Null,
                    })
                    .collect();
                produced.push(Column::new(format!("{name}_{key}"), values).flattened());
            }
        }
        Value::Array(_) => {
            let lengths = column
                .values
                .iter()
                .map(|v| match v {
                    CellValue::Json(Value::Array(items)) => CellValue::Int(items.len() as i64),
                    _ => CellValue::Null,
                })
                .collect();
            let items = column
                .values
                .iter()
                .map(|v| match v {
                    CellValue::Json(arr @ Value::Array(_)) => CellValue::Json(arr.clone()),
                    _ => CellValue::Null,
                })
                .collect();
            produced.push(Column::new(format!("{name}_length"), lengths).flattened());
            produced.push(Column::new(format!("{name}_items"), items).flattened());
        }
        _ => return None,
    }

    Some(produced)
}

/// Suffix flattened names that collide with an existing column.
fn dedupe_names(columns: &mut [Column]) {
    let mut seen: IndexSet<String> = IndexSet::new();
    for column in columns.iter_mut() {
        let mut candidate = column.name.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", column.name, n);
        }
        column.name = candidate.clone();
        seen.insert(candidate);
    }
}
