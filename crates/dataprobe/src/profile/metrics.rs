//! Dataset-level profiling result.

use indexmap::IndexMap;
use serde::Serialize;

use super::chunk::SchemaInfo;
use super::insights::{DatasetInsights, DatasetSummary};
use super::stats::StatsEntry;
use crate::quality::QualityIssue;

/// How the profiling run was carried out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisInfo {
    /// Rows in the input dataset.
    pub total_rows: usize,
    /// Rows covered by chunks that completed.
    pub processed_rows: usize,
    pub processed_in_chunks: bool,
    pub parallel_processing: bool,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub failed_chunks: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error_occurred: bool,
}

/// Merged statistics for a whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetMetrics {
    /// Sum of the rows of every retained chunk.
    pub total_rows: usize,
    pub total_columns: usize,
    pub schema_info: SchemaInfo,
    pub column_stats: IndexMap<String, StatsEntry>,
    pub summary: DatasetSummary,
    pub insights: DatasetInsights,
    pub data_quality_issues: Vec<QualityIssue>,
    pub analysis_info: AnalysisInfo,
    /// Set when no part of the dataset could be profiled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatasetMetrics {
    /// A result carrying only an error and the known row count.
    pub fn failed(total_rows: usize, error: impl Into<String>) -> Self {
        Self {
            analysis_info: AnalysisInfo {
                total_rows,
                error_occurred: true,
                ..Default::default()
            },
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Whether profiling produced no usable result.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_metrics_serialize_error() {
        let metrics = DatasetMetrics::failed(42, "boom");
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["analysis_info"]["total_rows"], 42);
        assert_eq!(json["analysis_info"]["error_occurred"], true);
        assert_eq!(json["analysis_info"]["processed_rows"], 0);
    }

    #[test]
    fn test_successful_metrics_omit_error_fields() {
        let json = serde_json::to_value(DatasetMetrics::default()).unwrap();
        assert!(json.get("error").is_none());
        assert!(json["analysis_info"].get("error_occurred").is_none());
    }
}
