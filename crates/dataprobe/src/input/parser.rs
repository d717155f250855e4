//! Delimited-text reader producing typed datasets.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use super::dataset::{CellValue, Column, ColumnSource, TabularDataset};
use super::source::{SourceFormat, SourceMetadata};
use crate::error::{ProbeError, Result};

/// Field renderings read as missing (compared case-insensitively after trimming).
const NULL_TOKENS: &[&str] = &["", "na", "n/a", "null", "none", "nil", "nan", ".", "-"];

/// Parser configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Field delimiter; sniffed from the data when unset.
    pub delimiter: Option<u8>,
    pub has_header: bool,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
    pub quote: u8,
    /// Store ISO-8601 date/datetime columns natively instead of as text.
    pub parse_dates: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
            parse_dates: true,
        }
    }
}

/// Reads CSV, TSV, semicolon and pipe separated text into a
/// [`TabularDataset`], giving each column the narrowest storage that holds
/// all of its non-missing fields.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read and parse a file, returning the dataset and a description of
    /// the source.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(TabularDataset, SourceMetadata)> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|source| ProbeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let format = match self.config.delimiter {
            Some(d) => SourceFormat::from_delimiter(d),
            None => SourceFormat::sniff(&contents)?,
        };
        let dataset = self.parse_bytes(&contents, format.delimiter())?;

        let metadata = SourceMetadata::describe(
            path.to_path_buf(),
            &contents,
            format,
            dataset.row_count(),
            dataset.column_count(),
        );
        debug!(
            file = %metadata.file,
            format = %metadata.format,
            rows = metadata.row_count,
            columns = metadata.column_count,
            "read source file"
        );
        Ok((dataset, metadata))
    }

    /// Parse in-memory text with a known delimiter. Short rows are padded
    /// with missing values and long rows truncated to the header width.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<TabularDataset> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let header: Option<Vec<String>> = if self.config.has_header {
            Some(reader.headers()?.iter().map(str::to_string).collect())
        } else {
            None
        };

        let limit = self.config.max_rows.unwrap_or(usize::MAX);
        let rows = reader
            .records()
            .take(limit)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let names = match header {
            Some(names) => names,
            None => {
                let width = rows.first().map(csv::StringRecord::len).unwrap_or(0);
                (1..=width).map(|i| format!("column_{i}")).collect()
            }
        };
        if names.is_empty() {
            return Err(ProbeError::EmptyData("No columns found".to_string()));
        }
        if rows.is_empty() {
            return Err(ProbeError::EmptyData("No data rows found".to_string()));
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let fields: Vec<&str> = rows.iter().map(|row| row.get(index).unwrap_or("")).collect();
                type_column(name, &fields, self.config.parse_dates)
            })
            .collect();
        TabularDataset::new(columns)
    }
}

/// Whether a raw field stands for a missing value.
pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_TOKENS.iter().any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Native storage picked for a column of raw fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Text,
}

impl FieldKind {
    /// Narrowest kind that reads every field, tried in declaration order.
    fn detect(fields: &[&str], parse_dates: bool) -> Self {
        let candidates = [
            FieldKind::Integer,
            FieldKind::Float,
            FieldKind::Boolean,
            FieldKind::Date,
            FieldKind::DateTime,
        ];
        if fields.is_empty() {
            return FieldKind::Text;
        }
        candidates
            .into_iter()
            .filter(|kind| parse_dates || !matches!(kind, FieldKind::Date | FieldKind::DateTime))
            .find(|kind| fields.iter().all(|f| kind.read(f).is_some()))
            .unwrap_or(FieldKind::Text)
    }

    fn read(&self, field: &str) -> Option<CellValue> {
        match self {
            FieldKind::Integer => field.parse().ok().map(CellValue::Int),
            FieldKind::Float => field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(CellValue::Float),
            FieldKind::Boolean => match field.to_ascii_lowercase().as_str() {
                "true" => Some(CellValue::Bool(true)),
                "false" => Some(CellValue::Bool(false)),
                _ => None,
            },
            FieldKind::Date => NaiveDate::parse_from_str(field, "%Y-%m-%d")
                .ok()
                .map(CellValue::Date),
            FieldKind::DateTime => ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(field, fmt).ok())
                .map(CellValue::DateTime),
            FieldKind::Text => Some(CellValue::Text(field.to_string())),
        }
    }
}

fn type_column(name: String, fields: &[&str], parse_dates: bool) -> Column {
    let present: Vec<&str> = fields
        .iter()
        .map(|f| f.trim())
        .filter(|f| !is_null_token(f))
        .collect();
    let kind = FieldKind::detect(&present, parse_dates);

    let values = fields
        .iter()
        .map(|field| {
            let trimmed = field.trim();
            if is_null_token(trimmed) {
                CellValue::Null
            } else {
                kind.read(trimmed)
                    .unwrap_or_else(|| CellValue::Text(field.to_string()))
            }
        })
        .collect();
    Column::new(name, values)
}
