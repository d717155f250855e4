//! Per-column descriptive statistics.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use super::summary::NumericSummary;
use crate::coercion::{round2, to_number};
use crate::error::{ProbeError, Result};
use crate::input::{CellValue, Column};

/// Key used for missing values in value frequency tables.
pub const NULL_KEY: &str = "null";

/// Frequency of one distinct value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub count: usize,
    /// Share of all rows, rounded to 2 decimals.
    pub percentage: f64,
}

/// Descriptive statistics of one column over some row range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column_name: String,
    /// Storage label of the column (`int64`, `str`, ...).
    pub data_type: String,
    pub total_rows: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    /// Distinct non-null values.
    pub unique_count: usize,
    /// Distinct values over non-null rows; absent when every row is null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_percentage: Option<f64>,
    /// Up to the configured limit of distinct non-null values, in order of
    /// first appearance.
    pub sample_values: Vec<String>,
    /// Value text to frequency, most frequent first.
    pub value_counts: IndexMap<String, ValueCount>,
    /// Present for numeric-bucketed columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_summary: Option<NumericSummary>,
}

impl ColumnStats {
    /// Non-null row count.
    pub fn non_null_count(&self) -> usize {
        self.total_rows - self.null_count
    }

    /// Recompute percentages from the current counts.
    pub(crate) fn refresh_percentages(&mut self) {
        self.null_percentage = percent(self.null_count, self.total_rows);
        let non_null = self.non_null_count();
        self.unique_percentage = (non_null > 0).then(|| percent(self.unique_count, non_null));
        for entry in self.value_counts.values_mut() {
            entry.percentage = percent(entry.count, self.total_rows);
        }
    }

    /// Order value counts by descending frequency, ties in insertion order.
    pub(crate) fn sort_value_counts(&mut self) {
        self.value_counts.sort_by(|_, a, _, b| b.count.cmp(&a.count));
    }
}

/// Statistics for a column, or the reason they could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatsEntry {
    Computed(ColumnStats),
    Failed { error: String },
}

impl StatsEntry {
    pub fn as_computed(&self) -> Option<&ColumnStats> {
        match self {
            StatsEntry::Computed(stats) => Some(stats),
            StatsEntry::Failed { .. } => None,
        }
    }
}

impl From<Result<ColumnStats>> for StatsEntry {
    fn from(result: Result<ColumnStats>) -> Self {
        match result {
            Ok(stats) => StatsEntry::Computed(stats),
            Err(e) => StatsEntry::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Computes [`ColumnStats`] for a slice of a column.
#[derive(Debug, Clone)]
pub struct ColumnStatsComputer {
    sample_value_limit: usize,
}

impl ColumnStatsComputer {
    pub fn new(sample_value_limit: usize) -> Self {
        Self { sample_value_limit }
    }

    /// Compute statistics for `values`, a row range of `column`.
    ///
    /// Temporal columns render samples and frequency keys as `YYYY-MM-DD`.
    /// `numeric` requests a [`NumericSummary`] over the values that coerce to
    /// numbers.
    pub fn compute(&self, column: &Column, values: &[CellValue], numeric: bool) -> Result<ColumnStats> {
        let total_rows = values.len();
        if total_rows == 0 {
            return Err(ProbeError::Stats {
                column: column.name.clone(),
                message: "no rows to summarize".to_string(),
            });
        }

        let temporal = column.storage.is_temporal();
        let render = |value: &CellValue| -> Result<String> {
            if !temporal {
                return Ok(value.render());
            }
            value
                .as_datetime()
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .ok_or_else(|| ProbeError::Stats {
                    column: column.name.clone(),
                    message: format!("cannot format '{}' as a date", value.render()),
                })
        };

        let mut null_count = 0;
        let mut distinct = HashSet::new();
        let mut sample_values = Vec::new();
        let mut value_counts: IndexMap<String, ValueCount> = IndexMap::new();

        for value in values {
            let Some(key) = value.key() else {
                null_count += 1;
                continue;
            };
            let text = render(value)?;
            if distinct.insert(key) && sample_values.len() < self.sample_value_limit {
                sample_values.push(text.clone());
            }
            value_counts
                .entry(text)
                .or_insert(ValueCount {
                    count: 0,
                    percentage: 0.0,
                })
                .count += 1;
        }

        // Shares the key with a literal "null" text value.
        if null_count > 0 {
            value_counts
                .entry(NULL_KEY.to_string())
                .or_insert(ValueCount {
                    count: 0,
                    percentage: 0.0,
                })
                .count += null_count;
        }

        let numeric_summary = numeric.then(|| {
            values
                .iter()
                .filter_map(|v| to_number(v).ok())
                .collect::<NumericSummary>()
        });

        let mut stats = ColumnStats {
            column_name: column.name.clone(),
            data_type: column.storage.label().to_string(),
            total_rows,
            null_count,
            null_percentage: 0.0,
            unique_count: distinct.len(),
            unique_percentage: None,
            sample_values,
            value_counts,
            numeric_summary,
        };
        stats.refresh_percentages();
        stats.sort_value_counts();
        Ok(stats)
    }
}

impl Default for ColumnStatsComputer {
    fn default() -> Self {
        Self::new(10)
    }
}

/// `part / whole * 100`, rounded to 2 decimals.
pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}
