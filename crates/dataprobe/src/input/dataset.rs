//! In-memory tabular dataset: named, equal-length, typed columns.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProbeError, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing value.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
    /// Nested object or array, as produced by JSON-shaped sources.
    Json(Value),
}

impl CellValue {
    /// Build a text cell, mapping `None` to a null.
    pub fn text(value: Option<&str>) -> Self {
        match value {
            Some(s) => CellValue::Text(s.to_string()),
            None => CellValue::Null,
        }
    }

    /// Whether this cell is a missing marker. `NaN` floats count as missing.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            CellValue::Json(Value::Null) => true,
            _ => false,
        }
    }

    /// Render the cell the way it appears in reports.
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => "null".to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(v) => format_float(*v),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => {
                if dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Json(v) => v.to_string(),
        }
    }

    /// Timestamp view of temporal cells.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => d.and_hms_opt(0, 0, 0),
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Hashable identity used for distinct counting. `None` for nulls.
    pub fn key(&self) -> Option<ValueKey> {
        if self.is_null() {
            return None;
        }
        Some(match self {
            CellValue::Bool(b) => ValueKey::Bool(*b),
            CellValue::Int(i) => ValueKey::Int(*i),
            CellValue::Float(v) => ValueKey::Float(v.to_bits()),
            CellValue::Date(d) => ValueKey::Date(*d),
            CellValue::DateTime(dt) => ValueKey::DateTime(*dt),
            CellValue::Text(s) => ValueKey::Text(s.clone()),
            CellValue::Json(v) => ValueKey::Json(v.to_string()),
            CellValue::Null => return None,
        })
    }

    /// Convert a JSON value into a cell.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
            },
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => CellValue::Json(value.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Distinct-value identity of a non-null cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
    Json(String),
}

/// Floats keep a trailing `.0` when integral so `2.0` never reads as an integer.
pub(crate) fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Native storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Text,
    /// JSON objects.
    Nested,
    /// JSON arrays.
    Array,
}

impl StorageType {
    /// Infer the storage type from the non-null values of a column.
    pub fn infer(values: &[CellValue]) -> Self {
        let mut storage: Option<StorageType> = None;
        for value in values.iter().filter(|v| !v.is_null()) {
            let this = match value {
                CellValue::Bool(_) => StorageType::Boolean,
                CellValue::Int(_) => StorageType::Integer,
                CellValue::Float(_) => StorageType::Float,
                CellValue::Date(_) => StorageType::Date,
                CellValue::DateTime(_) => StorageType::DateTime,
                CellValue::Json(Value::Array(_)) => StorageType::Array,
                CellValue::Json(_) => StorageType::Nested,
                CellValue::Text(_) | CellValue::Null => StorageType::Text,
            };
            storage = Some(match (storage, this) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(StorageType::Integer), StorageType::Float)
                | (Some(StorageType::Float), StorageType::Integer) => StorageType::Float,
                (Some(StorageType::Date), StorageType::DateTime)
                | (Some(StorageType::DateTime), StorageType::Date) => StorageType::DateTime,
                (Some(StorageType::Array), StorageType::Nested)
                | (Some(StorageType::Nested), StorageType::Array) => StorageType::Nested,
                _ => return StorageType::Text,
            });
        }
        storage.unwrap_or(StorageType::Text)
    }

    /// Storage label reported in column statistics.
    pub fn label(&self) -> &'static str {
        match self {
            StorageType::Integer => "int64",
            StorageType::Float => "float64",
            StorageType::Boolean => "bool",
            StorageType::Date => "date",
            StorageType::DateTime => "datetime",
            StorageType::Text => "str",
            StorageType::Nested => "struct",
            StorageType::Array => "list",
        }
    }

    /// Returns true if this storage is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, StorageType::Integer | StorageType::Float)
    }

    /// Returns true if this storage is temporal.
    pub fn is_temporal(&self) -> bool {
        matches!(self, StorageType::Date | StorageType::DateTime)
    }
}

/// Where a column came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrigin {
    #[default]
    Source,
    /// Produced by flattening a nested column.
    Flattened,
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
    pub storage: StorageType,
    /// Type label declared by the source system (e.g. a database schema).
    pub source_type: Option<String>,
    pub origin: ColumnOrigin,
}

impl Column {
    /// Create a column, inferring its storage type from the values.
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let storage = StorageType::infer(&values);
        Self {
            name: name.into(),
            values,
            storage,
            source_type: None,
            origin: ColumnOrigin::Source,
        }
    }

    /// Text column; `None` entries become nulls.
    pub fn from_strs<'a>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<&'a str>>,
    ) -> Self {
        Self::new(name, values.into_iter().map(CellValue::text).collect())
    }

    /// Integer column; `None` entries become nulls.
    pub fn from_ints(name: impl Into<String>, values: impl IntoIterator<Item = Option<i64>>) -> Self {
        Self::new(
            name,
            values
                .into_iter()
                .map(|v| v.map(CellValue::Int).unwrap_or(CellValue::Null))
                .collect(),
        )
    }

    /// Float column; `None` entries become nulls.
    pub fn from_floats(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<f64>>,
    ) -> Self {
        Self::new(
            name,
            values
                .into_iter()
                .map(|v| v.map(CellValue::Float).unwrap_or(CellValue::Null))
                .collect(),
        )
    }

    /// Attach the source system's type label.
    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }

    /// Override the inferred storage type.
    pub fn with_storage(mut self, storage: StorageType) -> Self {
        self.storage = storage;
        self
    }

    /// Mark the column as produced by flattening.
    pub fn flattened(mut self) -> Self {
        self.origin = ColumnOrigin::Flattened;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing cells.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Non-null cells in row order.
    pub fn non_null(&self) -> impl Iterator<Item = &CellValue> {
        self.values.iter().filter(|v| !v.is_null())
    }
}

/// Read access to named columns. Implemented by datasets and by the
/// validation working frame, which layers synthetic columns on top.
pub trait ColumnSource {
    /// Number of rows shared by every column.
    fn row_count(&self) -> usize;

    /// Look up a column by name.
    fn column(&self, name: &str) -> Option<&Column>;

    /// Names of all visible columns, in order.
    fn column_names(&self) -> Vec<&str>;
}

/// An ordered set of equal-length named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    columns: Vec<Column>,
}

impl TabularDataset {
    /// Build a dataset, checking that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut dataset = Self { columns: Vec::with_capacity(columns.len()) };
        for column in columns {
            dataset.push_column(column)?;
        }
        Ok(dataset)
    }

    /// Append a column.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.iter().any(|c| c.name == column.name) {
            return Err(ProbeError::DuplicateColumn(column.name));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                let actual = column.len();
                return Err(ProbeError::RaggedColumns {
                    column: column.name,
                    expected: first.len(),
                    actual,
                });
            }
        }
        self.columns.push(column);
        Ok(())
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Whether the dataset holds any JSON-valued columns.
    pub fn has_nested(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.values.iter().any(|v| matches!(v, CellValue::Json(_))))
    }
}

impl ColumnSource for TabularDataset {
    fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_inference() {
        let ints = vec![CellValue::Int(1), CellValue::Null, CellValue::Int(3)];
        assert_eq!(StorageType::infer(&ints), StorageType::Integer);

        let mixed = vec![CellValue::Int(1), CellValue::Float(2.5)];
        assert_eq!(StorageType::infer(&mixed), StorageType::Float);

        let objects = vec![CellValue::Json(json!({"a": 1})), CellValue::Null];
        assert_eq!(StorageType::infer(&objects), StorageType::Nested);

        let text = vec![CellValue::Int(1), CellValue::Text("x".into())];
        assert_eq!(StorageType::infer(&text), StorageType::Text);
    }

    #[test]
    fn test_render_float_keeps_decimal_point() {
        assert_eq!(CellValue::Float(2.0).render(), "2.0");
        assert_eq!(CellValue::Float(1.25).render(), "1.25");
        assert_eq!(CellValue::Int(2).render(), "2");
    }

    #[test]
    fn test_nan_is_null() {
        assert!(CellValue::Float(f64::NAN).is_null());
        assert!(CellValue::Float(f64::NAN).key().is_none());
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = TabularDataset::new(vec![
            Column::from_ints("a", [Some(1), Some(2)]),
            Column::from_ints("b", [Some(1)]),
        ]);
        assert!(matches!(result, Err(ProbeError::RaggedColumns { .. })));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = TabularDataset::new(vec![
            Column::from_ints("a", [Some(1)]),
            Column::from_ints("a", [Some(2)]),
        ]);
        assert!(matches!(result, Err(ProbeError::DuplicateColumn(_))));
    }
}
