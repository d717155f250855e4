//! Chunked, parallel column profiling.
//!
//! A [`Profiler`] splits a dataset into row ranges ([`ChunkPlan`]), runs a
//! [`ChunkAnalyzer`] on each range in a bounded worker pool and reduces the
//! resulting [`ChunkMetrics`] into [`DatasetMetrics`] with [`merge_chunks`].
//! Statistics that need every row at once (quartiles, duplicates,
//! correlations) are added afterwards from the whole dataset.

mod chunk;
mod insights;
mod metrics;
mod scheduler;
mod stats;
mod summary;

pub use chunk::{ChunkAnalysis, ChunkAnalyzer, ChunkMetrics, SchemaBucket, SchemaInfo, bucket_for};
pub use insights::{
    CategoricalSpread, CorrelatedPair, DatasetInsights, DatasetSummary, NumericSeries, OutlierCounts,
};
pub use metrics::{AnalysisInfo, DatasetMetrics};
pub use scheduler::{ChunkPlan, Profiler, ProfilerConfig, merge_chunks};
pub use stats::{ColumnStats, ColumnStatsComputer, NULL_KEY, StatsEntry, ValueCount};
pub use summary::{NumericSummary, Quartiles};
