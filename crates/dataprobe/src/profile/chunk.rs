//! Analysis of one contiguous row range.

use std::fmt;
use std::ops::Range;

use chrono::Timelike;
use indexmap::{IndexMap, IndexSet};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::stats::{ColumnStatsComputer, StatsEntry};
use crate::error::{ProbeError, Result};
use crate::input::{CellValue, Column, ColumnOrigin, ColumnSource, StorageType, TabularDataset};

/// Keywords in a source-system type label that mark a column numeric.
const NUMERIC_TYPE_KEYWORDS: &[&str] = &["int", "float", "decimal", "numeric"];

/// Leading non-null values checked for a time-of-day component.
const TIME_SAMPLE: usize = 10;

/// Schema category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaBucket {
    Numeric,
    String,
    Date,
    Datetime,
    Nested,
    Array,
    Flattened,
}

impl SchemaBucket {
    pub const ALL: [SchemaBucket; 7] = [
        SchemaBucket::Numeric,
        SchemaBucket::String,
        SchemaBucket::Date,
        SchemaBucket::Datetime,
        SchemaBucket::Nested,
        SchemaBucket::Array,
        SchemaBucket::Flattened,
    ];

    /// Key of the bucket's column list in serialized schema info.
    pub fn key(&self) -> &'static str {
        match self {
            SchemaBucket::Numeric => "numeric_columns",
            SchemaBucket::String => "string_columns",
            SchemaBucket::Date => "date_columns",
            SchemaBucket::Datetime => "datetime_columns",
            SchemaBucket::Nested => "nested_columns",
            SchemaBucket::Array => "array_columns",
            SchemaBucket::Flattened => "flattened_columns",
        }
    }
}

/// Columns grouped by schema bucket. Each bucket holds a column at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaInfo {
    buckets: IndexMap<SchemaBucket, IndexSet<String>>,
}

impl SchemaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bucket: SchemaBucket, column: impl Into<String>) {
        self.buckets.entry(bucket).or_default().insert(column.into());
    }

    pub fn contains(&self, bucket: SchemaBucket, column: &str) -> bool {
        self.buckets
            .get(&bucket)
            .map(|cols| cols.contains(column))
            .unwrap_or(false)
    }

    /// Columns in a bucket, in insertion order.
    pub fn columns(&self, bucket: SchemaBucket) -> impl Iterator<Item = &str> {
        self.buckets
            .get(&bucket)
            .into_iter()
            .flat_map(|cols| cols.iter().map(String::as_str))
    }

    /// Union with another schema.
    pub fn merge(&mut self, other: &SchemaInfo) {
        for bucket in SchemaBucket::ALL {
            for column in other.columns(bucket) {
                self.insert(bucket, column);
            }
        }
    }
}

impl Serialize for SchemaInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SchemaBucket::ALL.len()))?;
        for bucket in SchemaBucket::ALL {
            let columns: Vec<&str> = self.columns(bucket).collect();
            map.serialize_entry(bucket.key(), &columns)?;
        }
        map.end()
    }
}

/// Result of analysing one row range.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMetrics {
    /// First row of the range.
    pub row_offset: usize,
    /// Rows in the range.
    pub total_rows: usize,
    pub schema_info: SchemaInfo,
    pub column_stats: IndexMap<String, StatsEntry>,
}

/// Work done by a profiler worker for one row range.
pub trait ChunkAnalysis: fmt::Debug + Send + Sync {
    fn analyze(&self, dataset: &TabularDataset, range: Range<usize>) -> Result<ChunkMetrics>;
}

/// Buckets every column of a row range and computes its statistics.
#[derive(Debug, Clone, Default)]
pub struct ChunkAnalyzer {
    stats: ColumnStatsComputer,
}

impl ChunkAnalyzer {
    pub fn new(stats: ColumnStatsComputer) -> Self {
        Self { stats }
    }
}

impl ChunkAnalysis for ChunkAnalyzer {
    /// Analyse rows `range` of `dataset`.
    fn analyze(&self, dataset: &TabularDataset, range: Range<usize>) -> Result<ChunkMetrics> {
        let rows = dataset.row_count();
        let empty_range_of_rows = range.is_empty() && rows > 0;
        if range.start > range.end || range.end > rows || empty_range_of_rows {
            return Err(ProbeError::ChunkRange {
                start: range.start,
                end: range.end,
                rows,
            });
        }

        let mut schema_info = SchemaInfo::new();
        let mut column_stats = IndexMap::with_capacity(dataset.column_count());

        for column in dataset.columns() {
            let values = &column.values[range.clone()];
            let bucket = bucket_for(column, values);
            schema_info.insert(bucket, column.name.as_str());
            if column.origin == ColumnOrigin::Flattened {
                schema_info.insert(SchemaBucket::Flattened, column.name.as_str());
            }

            let entry = StatsEntry::from(self.stats.compute(
                column,
                values,
                bucket == SchemaBucket::Numeric,
            ));
            column_stats.insert(column.name.clone(), entry);
        }

        Ok(ChunkMetrics {
            row_offset: range.start,
            total_rows: range.len(),
            schema_info,
            column_stats,
        })
    }
}

/// Place a column in a bucket: native storage first, then the source type label.
pub fn bucket_for(column: &Column, values: &[CellValue]) -> SchemaBucket {
    match column.storage {
        s if s.is_numeric() => SchemaBucket::Numeric,
        StorageType::DateTime => {
            let has_time = values
                .iter()
                .filter(|v| !v.is_null())
                .take(TIME_SAMPLE)
                .filter_map(CellValue::as_datetime)
                .any(|dt| dt.num_seconds_from_midnight() != 0 || dt.nanosecond() != 0);
            if has_time {
                SchemaBucket::Datetime
            } else {
                SchemaBucket::Date
            }
        }
        StorageType::Date => SchemaBucket::Date,
        StorageType::Nested => SchemaBucket::Nested,
        StorageType::Array => SchemaBucket::Array,
        _ if has_numeric_source_type(column) => SchemaBucket::Numeric,
        _ => SchemaBucket::String,
    }
}

fn has_numeric_source_type(column: &Column) -> bool {
    column
        .source_type
        .as_deref()
        .map(|label| {
            let label = label.to_lowercase();
            NUMERIC_TYPE_KEYWORDS.iter().any(|kw| label.contains(kw))
        })
        .unwrap_or(false)
}
