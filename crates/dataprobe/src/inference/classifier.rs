//! Semantic type classification of a column from a value sample.

use std::collections::HashSet;

use chrono::{NaiveDateTime, Timelike};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::coercion::{decimal_places_of, is_boolean_token, parse_strict, round2, to_number};
use crate::input::{CellValue, Column};

/// Distinct-value ratio under which a column may be categorical.
const CATEGORICAL_RATIO: f64 = 0.1;
/// Distinct-value count under which a column may be categorical.
const CATEGORICAL_MAX_DISTINCT: usize = 50;

/// Numeric sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// Every sampled value has a zero fractional part.
    Integer,
    Float,
}

/// Temporal sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    /// Natively typed, every sampled timestamp at midnight.
    Date,
    /// Parsed from text.
    DateTime,
    /// Natively typed with a time component.
    Datetime64,
}

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Numeric(NumericKind),
    Datetime(TemporalKind),
    Boolean,
    Categorical,
    String,
    Unknown,
}

impl ColumnType {
    /// Coarse type label.
    pub fn base_type(&self) -> &'static str {
        match self {
            ColumnType::Numeric(_) => "numeric",
            ColumnType::Datetime(_) => "datetime",
            ColumnType::Boolean => "boolean",
            ColumnType::Categorical => "categorical",
            ColumnType::String => "string",
            ColumnType::Unknown => "unknown",
        }
    }

    /// Fine-grained type label.
    pub fn specific_type(&self) -> &'static str {
        match self {
            ColumnType::Numeric(NumericKind::Integer) => "integer",
            ColumnType::Numeric(NumericKind::Float) => "float",
            ColumnType::Datetime(TemporalKind::Date) => "date",
            ColumnType::Datetime(TemporalKind::DateTime) => "datetime",
            ColumnType::Datetime(TemporalKind::Datetime64) => "datetime64",
            other => other.base_type(),
        }
    }
}

/// Classification result for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTypeInfo {
    pub column_type: ColumnType,
    /// Example rendering of a sampled value.
    pub sample_format: Option<String>,
    /// Distinct values over sampled values.
    pub unique_ratio: f64,
}

impl ColumnTypeInfo {
    fn unknown() -> Self {
        Self {
            column_type: ColumnType::Unknown,
            sample_format: None,
            unique_ratio: 0.0,
        }
    }

    pub fn base_type(&self) -> &'static str {
        self.column_type.base_type()
    }

    pub fn specific_type(&self) -> &'static str {
        self.column_type.specific_type()
    }
}

impl Serialize for ColumnTypeInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ColumnTypeInfo", 4)?;
        state.serialize_field("base_type", self.base_type())?;
        state.serialize_field("specific_type", self.specific_type())?;
        state.serialize_field("sample_format", &self.sample_format)?;
        state.serialize_field("unique_ratio", &round2(self.unique_ratio))?;
        state.end()
    }
}

/// Infers a column's semantic type from its first non-null values.
///
/// Checks run in a fixed order and the first match wins:
/// native temporal storage, boolean tokens, strict datetime text, numeric
/// coercion, low cardinality, and finally plain string. Numeric runs before
/// the cardinality check so low-cardinality numeric codes stay numeric.
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    sample_size: usize,
}

impl TypeClassifier {
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Classify a column.
    pub fn classify(&self, column: &Column) -> ColumnTypeInfo {
        let sample: Vec<&CellValue> = column.non_null().take(self.sample_size).collect();
        if sample.is_empty() {
            return ColumnTypeInfo::unknown();
        }

        let distinct = sample.iter().filter_map(|v| v.key()).collect::<HashSet<_>>().len();
        let unique_ratio = distinct as f64 / sample.len() as f64;
        let info = |column_type, sample_format| ColumnTypeInfo {
            column_type,
            sample_format,
            unique_ratio,
        };

        if column.storage.is_temporal() {
            let stamps: Vec<NaiveDateTime> = sample.iter().filter_map(|v| v.as_datetime()).collect();
            let at_midnight = stamps
                .iter()
                .all(|dt| dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0);
            return match stamps.first() {
                Some(first) if at_midnight => info(
                    ColumnType::Datetime(TemporalKind::Date),
                    Some(first.format("%Y-%m-%d").to_string()),
                ),
                Some(first) => info(
                    ColumnType::Datetime(TemporalKind::Datetime64),
                    Some(first.format("%Y-%m-%d %H:%M:%S").to_string()),
                ),
                None => ColumnTypeInfo::unknown(),
            };
        }

        if sample.iter().all(|v| is_boolean_token(v)) {
            return info(ColumnType::Boolean, None);
        }

        let parsed: Option<Vec<NaiveDateTime>> =
            sample.iter().map(|v| parse_strict(v).ok()).collect();
        if let Some(first) = parsed.as_ref().and_then(|p| p.first()) {
            return info(
                ColumnType::Datetime(TemporalKind::DateTime),
                Some(first.format("%Y-%m-%d %H:%M:%S").to_string()),
            );
        }

        let numbers: Option<Vec<f64>> = sample.iter().map(|v| to_number(v).ok()).collect();
        if let Some(numbers) = numbers {
            let first = numbers.first().copied().unwrap_or_default();
            return if numbers.iter().all(|n| n.fract() == 0.0) {
                info(
                    ColumnType::Numeric(NumericKind::Integer),
                    Some(format!("{first:.0}")),
                )
            } else {
                let decimals = numbers
                    .iter()
                    .map(|n| decimal_places_of(&n.to_string()))
                    .max()
                    .unwrap_or(0);
                info(
                    ColumnType::Numeric(NumericKind::Float),
                    Some(format!("{first:.decimals$}")),
                )
            };
        }

        if unique_ratio < CATEGORICAL_RATIO && distinct < CATEGORICAL_MAX_DISTINCT {
            return info(ColumnType::Categorical, None);
        }

        info(ColumnType::String, None)
    }
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn classify(column: Column) -> ColumnTypeInfo {
        TypeClassifier::default().classify(&column)
    }

    #[test]
    fn test_empty_column_is_unknown() {
        let info = classify(Column::from_strs("x", [None, None]));
        assert_eq!(info.column_type, ColumnType::Unknown);
        assert_eq!(info.unique_ratio, 0.0);
    }

    #[test]
    fn test_native_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let info = classify(Column::new("d", vec![CellValue::Date(d)]));
        assert_eq!(info.specific_type(), "date");
        assert_eq!(info.base_type(), "datetime");

        let dt = d.and_hms_opt(13, 0, 0).unwrap();
        let info = classify(Column::new("dt", vec![CellValue::DateTime(dt)]));
        assert_eq!(info.specific_type(), "datetime64");
        assert_eq!(info.sample_format.as_deref(), Some("2024-01-02 13:00:00"));
    }

    #[test]
    fn test_boolean_before_numeric() {
        let info = classify(Column::from_ints("flag", [Some(1), Some(0), Some(1)]));
        assert_eq!(info.column_type, ColumnType::Boolean);

        let info = classify(Column::from_strs("yn", [Some("Yes"), Some("no")]));
        assert_eq!(info.column_type, ColumnType::Boolean);

        // 1.0 and 0.0 are not boolean tokens, so a float flag column stays numeric.
        let info = classify(Column::from_floats("ratio", [Some(1.0), Some(0.0), Some(1.0)]));
        assert_eq!(info.base_type(), "numeric");
    }

    #[test]
    fn test_text_dates() {
        let info = classify(Column::from_strs("when", [Some("2024-01-02"), Some("03/04/2024")]));
        assert_eq!(info.column_type, ColumnType::Datetime(TemporalKind::DateTime));
        assert_eq!(info.sample_format.as_deref(), Some("2024-01-02 00:00:00"));
    }

    #[test]
    fn test_numeric_subtypes() {
        let info = classify(Column::from_strs("n", [Some("$1,200"), Some("(5)"), Some("7")]));
        assert_eq!(info.column_type, ColumnType::Numeric(NumericKind::Integer));
        assert_eq!(info.sample_format.as_deref(), Some("1200"));

        let info = classify(Column::from_floats("f", [Some(1.5), Some(2.125), Some(3.0)]));
        assert_eq!(info.column_type, ColumnType::Numeric(NumericKind::Float));
        assert_eq!(info.sample_format.as_deref(), Some("1.500"));
    }

    #[test]
    fn test_low_cardinality_numeric_codes_stay_numeric() {
        let codes: Vec<Option<i64>> = (0..100).map(|i| Some(10 + i % 3)).collect();
        let info = classify(Column::from_ints("code", codes));
        assert_eq!(info.column_type, ColumnType::Numeric(NumericKind::Integer));
    }

    #[test]
    fn test_categorical_and_string() {
        let values: Vec<Option<&str>> = (0..100)
            .map(|i| Some(if i % 2 == 0 { "red" } else { "blue" }))
            .collect();
        assert_eq!(
            classify(Column::from_strs("color", values)).column_type,
            ColumnType::Categorical
        );

        let names = ["alice", "bob", "carol"].map(Some);
        assert_eq!(classify(Column::from_strs("name", names)).column_type, ColumnType::String);
    }

    #[test]
    fn test_sample_size_limits_inspection() {
        let mut values = vec![Some("1"); 5];
        values.push(Some("not a number"));
        let info = TypeClassifier::new(5).classify(&Column::from_strs("n", values));
        assert_eq!(info.column_type, ColumnType::Boolean);
    }

    #[test]
    fn test_serializes_rounded_labels() {
        let info = classify(Column::from_strs("name", [Some("a"), Some("b"), Some("a")]));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["base_type"], "string");
        assert_eq!(json["unique_ratio"], 0.67);
    }
}
