//! Whole-dataset statistics that cannot be merged from chunks: duplicate
//! rows, quartiles, z-score outliers, correlations and categorical spread.

use std::collections::HashSet;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use super::stats::percent;
use crate::coercion::{round2, to_number};
use crate::input::{Column, ColumnSource, TabularDataset, ValueKey};

/// Absolute correlation above which a column pair is reported.
pub const HIGH_CORRELATION: f64 = 0.7;

/// Z-score beyond which a value counts as an anomaly.
pub const ANOMALY_Z: f64 = 3.0;

/// Z-score beyond which an anomaly counts as extreme.
pub const EXTREME_Z: f64 = 5.0;

/// Most frequent values kept per categorical column.
const MOST_COMMON: usize = 3;

/// Missing cells and duplicated rows over the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub missing_cells: usize,
    pub missing_cells_pct: f64,
    /// Rows identical to an earlier row in every column.
    pub duplicate_rows: usize,
    pub duplicate_rows_pct: f64,
}

impl DatasetSummary {
    pub fn compute(dataset: &TabularDataset) -> Self {
        let rows = dataset.row_count();
        let columns = dataset.columns();
        let missing_cells: usize = columns.iter().map(Column::null_count).sum();

        let mut seen: HashSet<Vec<Option<ValueKey>>> = HashSet::with_capacity(rows);
        let duplicate_rows = (0..rows)
            .filter(|&row| !seen.insert(columns.iter().map(|c| c.values[row].key()).collect()))
            .count();

        Self {
            missing_cells,
            missing_cells_pct: percent(missing_cells, rows * columns.len()),
            duplicate_rows,
            duplicate_rows_pct: percent(duplicate_rows, rows),
        }
    }
}

/// Values more than [`ANOMALY_Z`] and [`EXTREME_Z`] sample standard
/// deviations from the mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutlierCounts {
    pub anomalies: usize,
    pub extreme: usize,
}

impl OutlierCounts {
    pub fn of(values: &[f64]) -> Self {
        let Some((mean, std)) = mean_and_std(values) else {
            return Self::default();
        };
        if std == 0.0 {
            return Self::default();
        }
        let z: Vec<f64> = values.iter().map(|v| ((v - mean) / std).abs()).collect();
        Self {
            anomalies: z.iter().filter(|&&z| z > ANOMALY_Z).count(),
            extreme: z.iter().filter(|&&z| z > EXTREME_Z).count(),
        }
    }
}

/// A strongly correlated pair of numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedPair {
    pub column1: String,
    pub column2: String,
    pub correlation: f64,
}

/// Spread of a text column's values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSpread {
    pub unique_values: usize,
    /// Up to three most frequent values with their counts.
    pub most_common: IndexMap<String, usize>,
    /// Shannon entropy in bits, with shares taken over all rows.
    pub distribution_entropy: f64,
}

/// Cross-column findings for a profiled dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetInsights {
    pub outliers: IndexMap<String, OutlierCounts>,
    /// Pairwise Pearson correlations over rows where both values are present.
    /// Pairs without a defined correlation are left out.
    pub correlations: IndexMap<String, IndexMap<String, f64>>,
    pub high_correlations: Vec<CorrelatedPair>,
    /// Columns whose variance exceeds the mean variance by more than one
    /// standard deviation of the variances.
    pub high_variance_columns: Vec<String>,
    pub categorical: IndexMap<String, CategoricalSpread>,
}

/// A numeric column aligned by row, missing or unparsable cells as `None`.
#[derive(Debug, Clone)]
pub struct NumericSeries<'a> {
    pub name: &'a str,
    pub values: Vec<Option<f64>>,
}

impl<'a> NumericSeries<'a> {
    pub fn of(column: &'a Column) -> Self {
        let values = column
            .values
            .iter()
            .map(|v| to_number(v).ok().filter(|n| n.is_finite()))
            .collect();
        Self {
            name: &column.name,
            values,
        }
    }

    pub fn present(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

impl DatasetInsights {
    /// Compute insights from numeric series and the names of text columns.
    pub fn compute(dataset: &TabularDataset, numeric: &[NumericSeries<'_>], text: &[&str]) -> Self {
        let outliers = numeric
            .par_iter()
            .map(|series| (series.name.to_string(), OutlierCounts::of(&series.present())))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        let mut correlations: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();
        let mut high_correlations = Vec::new();
        for (i, a) in numeric.iter().enumerate() {
            for (j, b) in numeric.iter().enumerate() {
                let Some(r) = pearson(&a.values, &b.values) else {
                    continue;
                };
                correlations
                    .entry(a.name.to_string())
                    .or_default()
                    .insert(b.name.to_string(), round2(r));
                if j > i && r.abs() > HIGH_CORRELATION {
                    high_correlations.push(CorrelatedPair {
                        column1: a.name.to_string(),
                        column2: b.name.to_string(),
                        correlation: round2(r),
                    });
                }
            }
        }

        let categorical = text
            .iter()
            .filter_map(|name| dataset.column(name))
            .map(|column| (column.name.clone(), spread(column)))
            .collect();

        Self {
            outliers,
            correlations,
            high_correlations,
            high_variance_columns: high_variance(numeric),
            categorical,
        }
    }
}

fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var.sqrt()))
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let r = cov / (var_x * var_y).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

fn high_variance(numeric: &[NumericSeries<'_>]) -> Vec<String> {
    let variances: Vec<(&str, f64)> = numeric
        .iter()
        .filter_map(|s| mean_and_std(&s.present()).map(|(_, std)| (s.name, std * std)))
        .collect();
    let spread: Vec<f64> = variances.iter().map(|(_, v)| *v).collect();
    let Some((mean, std)) = mean_and_std(&spread) else {
        return Vec::new();
    };
    variances
        .into_iter()
        .filter(|(_, v)| *v > mean + std)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn spread(column: &Column) -> CategoricalSpread {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for value in column.values.iter().filter(|v| !v.is_null()) {
        *counts.entry(value.render()).or_default() += 1;
    }
    let rows = column.len() as f64;
    let distribution_entropy = counts
        .values()
        .map(|&c| {
            let p = c as f64 / rows;
            -p * p.log2()
        })
        .sum::<f64>();

    let unique_values = counts.len();
    counts.sort_by(|_, a, _, b| b.cmp(a));
    counts.truncate(MOST_COMMON);
    CategoricalSpread {
        unique_values,
        most_common: counts,
        distribution_entropy: round2(distribution_entropy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(columns: Vec<Column>) -> TabularDataset {
        TabularDataset::new(columns).unwrap()
    }

    #[test]
    fn test_summary_counts_missing_and_duplicates() {
        let data = dataset(vec![
            Column::from_ints("a", [Some(1), Some(1), None, Some(1)]),
            Column::from_strs("b", [Some("x"), Some("x"), None, Some("y")]),
        ]);
        let summary = DatasetSummary::compute(&data);
        assert_eq!(summary.missing_cells, 2);
        assert_eq!(summary.missing_cells_pct, 25.0);
        assert_eq!(summary.duplicate_rows, 1);
        assert_eq!(summary.duplicate_rows_pct, 25.0);
    }

    #[test]
    fn test_outliers_use_sample_deviation() {
        let mut values = vec![10.0; 30];
        values.push(1000.0);
        let counts = OutlierCounts::of(&values);
        assert_eq!(counts.anomalies, 1);
        assert_eq!(counts.extreme, 1);

        assert_eq!(OutlierCounts::of(&[5.0, 5.0, 5.0]), OutlierCounts::default());
        assert_eq!(OutlierCounts::of(&[1.0, 2.0, 3.0]).anomalies, 0);
    }

    #[test]
    fn test_correlations_and_variance() {
        let data = dataset(vec![
            Column::from_ints("x", (1..=6).map(Some)),
            Column::from_ints("y", (1..=6).map(|i| Some(i * 2))),
            Column::from_ints("z", [Some(3), Some(1), Some(3), Some(1), Some(3), Some(1)]),
            Column::from_ints("big", (1..=6).map(|i| Some(i * 1000))),
        ]);
        let series: Vec<NumericSeries> = data.columns().iter().map(NumericSeries::of).collect();
        let insights = DatasetInsights::compute(&data, &series, &[]);

        assert_eq!(insights.correlations["x"]["y"], 1.0);
        assert_eq!(insights.correlations["x"]["x"], 1.0);
        let pairs: Vec<(&str, &str)> = insights
            .high_correlations
            .iter()
            .map(|p| (p.column1.as_str(), p.column2.as_str()))
            .collect();
        assert!(pairs.contains(&("x", "y")));
        assert!(pairs.contains(&("x", "big")));
        assert!(!pairs.iter().any(|(a, b)| *a == "z" || *b == "z"));
        assert_eq!(insights.high_variance_columns, vec!["big"]);
    }

    #[test]
    fn test_constant_column_has_no_correlation() {
        let data = dataset(vec![
            Column::from_ints("x", (1..=4).map(Some)),
            Column::from_ints("flat", [Some(2); 4]),
        ]);
        let series: Vec<NumericSeries> = data.columns().iter().map(NumericSeries::of).collect();
        let insights = DatasetInsights::compute(&data, &series, &[]);
        assert!(!insights.correlations["x"].contains_key("flat"));
        assert!(!insights.correlations.contains_key("flat"));
    }

    #[test]
    fn test_categorical_spread() {
        let data = dataset(vec![Column::from_strs(
            "color",
            [Some("red"), Some("blue"), Some("red"), None, Some("green"), Some("red"), Some("blue"), Some("teal")],
        )]);
        let insights = DatasetInsights::compute(&data, &[], &["color"]);
        let spread = &insights.categorical["color"];
        assert_eq!(spread.unique_values, 4);
        let top: Vec<(&str, usize)> = spread.most_common.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(top, vec![("red", 3), ("blue", 2), ("green", 1)]);
        // 3/8, 2/8, 1/8, 1/8 over eight rows
        assert_eq!(spread.distribution_entropy, 1.78);
    }
}
