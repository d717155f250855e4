//! Chunk planning, parallel execution and deterministic merge.

use std::any::Any;
use std::borrow::Cow;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::chunk::{ChunkAnalysis, ChunkAnalyzer, ChunkMetrics, SchemaBucket, SchemaInfo};
use super::insights::{DatasetInsights, DatasetSummary, NumericSeries};
use super::metrics::{AnalysisInfo, DatasetMetrics};
use super::stats::{ColumnStatsComputer, StatsEntry, ValueCount};
use super::summary::Quartiles;
use crate::error::{ProbeError, Result};
use crate::input::{ColumnSource, TabularDataset, flatten};

/// Profiling configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Values sampled per column for type classification.
    pub sample_size: usize,
    /// Lower bound on rows per chunk.
    pub min_chunk_rows: usize,
    /// Upper bound on rows per chunk.
    pub max_chunk_rows: usize,
    /// Target number of chunks before the bounds apply.
    pub chunk_divisor: usize,
    /// Maximum concurrent chunk workers.
    pub max_workers: usize,
    /// Distinct sample values kept per column.
    pub sample_value_limit: usize,
    /// Flatten JSON-valued columns before profiling.
    pub flatten_nested: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            min_chunk_rows: 10_000,
            max_chunk_rows: 100_000,
            chunk_divisor: 10,
            max_workers: 8,
            sample_value_limit: 10,
            flatten_nested: true,
        }
    }
}

impl ProfilerConfig {
    pub fn with_chunk_bounds(mut self, min_rows: usize, max_rows: usize) -> Self {
        self.min_chunk_rows = min_rows.max(1);
        self.max_chunk_rows = max_rows.max(self.min_chunk_rows);
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }
}

/// Contiguous, non-overlapping row ranges covering a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_size: usize,
    pub ranges: Vec<Range<usize>>,
}

impl ChunkPlan {
    /// Chunk size is `total / divisor` clamped to the configured bounds.
    /// Datasets no larger than one chunk get a single range.
    pub fn new(total_rows: usize, config: &ProfilerConfig) -> Self {
        let target = total_rows / config.chunk_divisor.max(1);
        let chunk_size = target.max(config.min_chunk_rows).min(config.max_chunk_rows).max(1);

        if total_rows <= chunk_size {
            return Self {
                chunk_size,
                ranges: vec![0..total_rows],
            };
        }

        let ranges = (0..total_rows)
            .step_by(chunk_size)
            .map(|start| start..(start + chunk_size).min(total_rows))
            .collect();
        Self { chunk_size, ranges }
    }

    pub fn is_chunked(&self) -> bool {
        self.ranges.len() > 1
    }
}

/// Profiles datasets by fanning chunks out to a bounded worker pool and
/// reducing their results after all of them finish.
#[derive(Debug, Clone)]
pub struct Profiler {
    config: ProfilerConfig,
    analyzer: Arc<dyn ChunkAnalysis>,
}

impl Profiler {
    pub fn new(config: ProfilerConfig) -> Self {
        let analyzer = ChunkAnalyzer::new(ColumnStatsComputer::new(config.sample_value_limit));
        Self {
            config,
            analyzer: Arc::new(analyzer),
        }
    }

    /// Replace the per-chunk analysis.
    pub fn with_analyzer(mut self, analyzer: impl ChunkAnalysis + 'static) -> Self {
        self.analyzer = Arc::new(analyzer);
        self
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Profile a dataset. Failures are reported inside the returned metrics.
    pub fn profile(&self, dataset: &TabularDataset) -> DatasetMetrics {
        let total_rows = dataset.row_count();

        let dataset: Cow<'_, TabularDataset> = if self.config.flatten_nested && dataset.has_nested() {
            match flatten::flatten_nested(dataset) {
                Ok(flat) => Cow::Owned(flat),
                Err(e) => {
                    warn!(error = %e, "failed to flatten nested columns");
                    return DatasetMetrics::failed(total_rows, e.to_string());
                }
            }
        } else {
            Cow::Borrowed(dataset)
        };

        let plan = ChunkPlan::new(total_rows, &self.config);
        let results = if plan.is_chunked() {
            info!(
                rows = total_rows,
                chunks = plan.ranges.len(),
                chunk_size = plan.chunk_size,
                "processing dataset in chunks"
            );
            self.run_parallel(&dataset, &plan)
        } else {
            vec![self.analyze_chunk(&dataset, 0..total_rows)]
        };

        let mut metrics = merge_chunks(results);
        if !metrics.is_error() {
            attach_whole_dataset_stats(&mut metrics, &dataset);
        }
        metrics.total_columns = dataset.column_count();
        metrics.analysis_info.total_rows = total_rows;
        metrics.analysis_info.processed_in_chunks = plan.is_chunked();
        metrics.analysis_info.parallel_processing = plan.is_chunked();
        metrics.analysis_info.chunk_count = plan.ranges.len();
        metrics.analysis_info.chunk_size = plan.chunk_size;

        debug!(
            rows = metrics.total_rows,
            columns = metrics.total_columns,
            failed_chunks = metrics.analysis_info.failed_chunks,
            "profiling finished"
        );
        metrics
    }

    fn run_parallel(&self, dataset: &TabularDataset, plan: &ChunkPlan) -> Vec<Result<ChunkMetrics>> {
        let workers = self.config.max_workers.max(1).min(plan.ranges.len());
        let work = || -> Vec<Result<ChunkMetrics>> {
            plan.ranges
                .par_iter()
                .map(|range| self.analyze_chunk(dataset, range.clone()))
                .collect()
        };

        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(work),
            Err(e) => {
                warn!(error = %e, "could not build worker pool, using the global pool");
                work()
            }
        }
    }

    /// Run one chunk, turning a panic into an error so the chunk is dropped
    /// like any other failure.
    fn analyze_chunk(&self, dataset: &TabularDataset, range: Range<usize>) -> Result<ChunkMetrics> {
        let (start, end) = (range.start, range.end);
        panic::catch_unwind(AssertUnwindSafe(|| self.analyzer.analyze(dataset, range))).unwrap_or_else(
            |payload| {
                Err(ProbeError::ChunkPanic {
                    start,
                    end,
                    message: panic_message(payload.as_ref()),
                })
            },
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Quartiles, dataset summary and cross-column insights, computed over all
/// rows of `dataset` once the chunk merge is done.
fn attach_whole_dataset_stats(metrics: &mut DatasetMetrics, dataset: &TabularDataset) {
    let numeric: Vec<NumericSeries<'_>> = metrics
        .schema_info
        .columns(SchemaBucket::Numeric)
        .filter_map(|name| dataset.column(name))
        .map(NumericSeries::of)
        .collect();

    let quartiles: Vec<Option<Quartiles>> = numeric
        .par_iter()
        .map(|series| Quartiles::of(&mut series.present()))
        .collect();
    for (series, quartiles) in numeric.iter().zip(quartiles) {
        if let Some(StatsEntry::Computed(stats)) = metrics.column_stats.get_mut(series.name) {
            if let Some(summary) = stats.numeric_summary.as_mut() {
                summary.set_quartiles(quartiles);
            }
        }
    }

    let text: Vec<&str> = metrics.schema_info.columns(SchemaBucket::String).collect();
    metrics.summary = DatasetSummary::compute(dataset);
    metrics.insights = DatasetInsights::compute(dataset, &numeric, &text);
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

/// Reduce chunk results into dataset metrics.
///
/// Failed chunks are logged and dropped. Retained chunks are ordered by row
/// offset first, so the outcome does not depend on completion order.
/// Per column, row, null, unique and value counts are summed, numeric
/// summaries combined, and percentages recomputed from the sums; the first
/// chunk seeds the rest. Unique counts therefore over-count values repeated
/// across chunks. A column that failed in any retained chunk is reported
/// with the first failure by row offset, so its counts never cover only
/// part of the rows.
pub fn merge_chunks(results: Vec<Result<ChunkMetrics>>) -> DatasetMetrics {
    let attempted = results.len();
    let mut chunks: Vec<ChunkMetrics> = Vec::with_capacity(attempted);
    let mut last_error = None;
    for result in results {
        match result {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => {
                warn!(error = %e, "chunk failed, dropping it from the merge");
                last_error = Some(e.to_string());
            }
        }
    }
    let failed_chunks = attempted - chunks.len();

    if chunks.is_empty() {
        let mut metrics = DatasetMetrics::failed(
            0,
            last_error.unwrap_or_else(|| "no chunks to merge".to_string()),
        );
        metrics.analysis_info.failed_chunks = failed_chunks;
        return metrics;
    }
    chunks.sort_by_key(|c| c.row_offset);

    let mut schema_info = SchemaInfo::new();
    let mut column_stats: IndexMap<String, StatsEntry> = IndexMap::new();
    let mut total_rows = 0;

    for chunk in &chunks {
        total_rows += chunk.total_rows;
        schema_info.merge(&chunk.schema_info);

        for (name, entry) in &chunk.column_stats {
            let Some(incoming) = entry.as_computed() else {
                if !matches!(column_stats.get(name), Some(StatsEntry::Failed { .. })) {
                    column_stats.insert(name.clone(), entry.clone());
                }
                continue;
            };
            match column_stats.get_mut(name) {
                Some(StatsEntry::Failed { .. }) => {}
                Some(StatsEntry::Computed(acc)) => {
                    acc.total_rows += incoming.total_rows;
                    acc.null_count += incoming.null_count;
                    acc.unique_count += incoming.unique_count;
                    for (value, count) in &incoming.value_counts {
                        acc.value_counts
                            .entry(value.clone())
                            .or_insert_with(|| ValueCount {
                                count: 0,
                                percentage: 0.0,
                            })
                            .count += count.count;
                    }
                    if let (Some(a), Some(b)) = (acc.numeric_summary.as_mut(), incoming.numeric_summary.as_ref()) {
                        a.merge(b);
                    }
                }
                None => {
                    column_stats.insert(name.clone(), entry.clone());
                }
            }
        }
    }

    for entry in column_stats.values_mut() {
        if let StatsEntry::Computed(stats) = entry {
            stats.refresh_percentages();
            stats.sort_value_counts();
        }
    }

    let processed_rows = total_rows;
    DatasetMetrics {
        total_rows,
        total_columns: column_stats.len(),
        schema_info,
        column_stats,
        summary: DatasetSummary::default(),
        insights: DatasetInsights::default(),
        data_quality_issues: Vec::new(),
        analysis_info: AnalysisInfo {
            total_rows,
            processed_rows,
            failed_chunks,
            ..Default::default()
        },
        error: None,
    }
}
