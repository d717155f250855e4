//! Dataprobe: columnar profiling and rule validation for tabular datasets.
//!
//! Dataprobe takes an in-memory table and produces two structured reports:
//! profiling metrics (per-column statistics, schema buckets and flagged
//! quality issues) and a validation report against a declarative rule list.
//!
//! # Core Principles
//!
//! - **Chunked and parallel**: large tables are split into row ranges,
//!   profiled on a bounded worker pool and merged deterministically
//! - **Tolerant coercion**: currency, percentages, parenthesised negatives
//!   and many date renderings are read; bad values degrade, never abort
//! - **Non-destructive**: the caller's dataset is never modified
//!
//! # Example
//!
//! ```no_run
//! use dataprobe::{DataProbe, ValidationRule};
//!
//! let probe = DataProbe::new();
//! let rules = vec![ValidationRule::not_null("age")];
//! let result = probe.analyze_file("customers.csv", Some(&rules)).unwrap();
//!
//! println!("Rows: {}", result.metrics.total_rows);
//! println!("Issues: {}", result.metrics.data_quality_issues.len());
//! println!("Valid: {}", result.validation.map(|v| v.success).unwrap_or(true));
//! ```

pub mod coercion;
pub mod error;
pub mod expression;
pub mod inference;
pub mod input;
pub mod profile;
pub mod quality;
pub mod validation;

mod probe;

pub use crate::probe::{AnalysisResult, DataProbe, ProbeConfig, load_rules};
pub use error::{ProbeError, Result};
pub use expression::{Evaluation, ExpressionEvaluator};
pub use inference::{ColumnType, ColumnTypeInfo, TypeClassifier};
pub use input::{CellValue, Column, ColumnSource, SourceMetadata, TabularDataset};
pub use profile::{ColumnStats, DatasetMetrics, Profiler, ProfilerConfig};
pub use quality::{IssueType, QualityIssue, QualityIssueDetector, Severity};
pub use validation::{RuleValidationEngine, ValidationReport, ValidationRule};
