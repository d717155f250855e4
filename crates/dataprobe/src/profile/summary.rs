//! Mergeable numeric summary built with Welford's online algorithm, plus
//! whole-column quartiles.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::coercion::round2;

/// 25th, 50th and 75th percentiles, linearly interpolated between the
/// closest ranks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    /// Quartiles of `values`, which are sorted in place. `None` when no
    /// finite value is present.
    pub fn of(values: &mut Vec<f64>) -> Option<Self> {
        values.retain(|v| v.is_finite());
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(Self {
            q1: quantile(values, 0.25),
            median: quantile(values, 0.5),
            q3: quantile(values, 0.75),
        })
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// Streaming mean/variance accumulator.
///
/// Single pass, constant memory. Two summaries over disjoint row ranges
/// combine exactly with the parallel variance formula, so chunk order does
/// not matter beyond float rounding. Quartiles are not mergeable: they are
/// attached once the whole column is known and dropped by [`merge`].
///
/// [`merge`]: NumericSummary::merge
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    count: usize,
    mean: f64,
    m2: f64, // sum of squared differences from the mean
    min: f64,
    max: f64,
    quartiles: Option<Quartiles>,
}

impl NumericSummary {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            quartiles: None,
        }
    }

    /// Add a value. Non-finite values are ignored.
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Combine with a summary over other rows (Chan et al.).
    pub fn merge(&mut self, other: &NumericSummary) {
        self.quartiles = None;
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            self.quartiles = None;
            return;
        }

        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;

        self.mean += delta * n_b / n;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Smallest value, `None` when empty.
    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// Largest value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Sample variance (n - 1 denominator), `None` below two values.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub fn quartiles(&self) -> Option<Quartiles> {
        self.quartiles
    }

    pub(crate) fn set_quartiles(&mut self, quartiles: Option<Quartiles>) {
        self.quartiles = quartiles;
    }
}

impl Default for NumericSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<f64> for NumericSummary {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut summary = Self::new();
        for value in iter {
            summary.add(value);
        }
        summary
    }
}

impl Serialize for NumericSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let quartile = |pick: fn(&Quartiles) -> f64| self.quartiles.as_ref().map(|q| round2(pick(q)));
        let mut state = serializer.serialize_struct("NumericSummary", 8)?;
        state.serialize_field("count", &self.count)?;
        state.serialize_field("mean", &round2(self.mean))?;
        state.serialize_field("std", &round2(self.std()))?;
        state.serialize_field("min", &self.min().map(round2))?;
        state.serialize_field("25%", &quartile(|q| q.q1))?;
        state.serialize_field("50%", &quartile(|q| q.median))?;
        state.serialize_field("75%", &quartile(|q| q.q3))?;
        state.serialize_field("max", &self.max().map(round2))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welford_matches_two_pass() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let summary: NumericSummary = values.iter().copied().collect();
        assert_eq!(summary.count(), 8);
        assert!((summary.mean() - 5.0).abs() < 1e-12);
        assert!((summary.std() - 2.0).abs() < 1e-12);
        assert_eq!(summary.min(), Some(2.0));
        assert_eq!(summary.max(), Some(9.0));
    }

    #[test]
    fn test_merge_equals_single_pass() {
        let values: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.37).sin() * 100.0).collect();
        let whole: NumericSummary = values.iter().copied().collect();

        let mut left: NumericSummary = values[..313].iter().copied().collect();
        let right: NumericSummary = values[313..].iter().copied().collect();
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!((left.mean() - whole.mean()).abs() < 1e-9);
        assert!((left.variance() - whole.variance()).abs() < 1e-6);
        assert_eq!(left.min(), whole.min());
        assert_eq!(left.max(), whole.max());
    }

    #[test]
    fn test_empty_summary() {
        let mut empty = NumericSummary::new();
        assert_eq!(empty.min(), None);
        assert_eq!(empty.std(), 0.0);

        let other: NumericSummary = [1.0, 3.0].into_iter().collect();
        empty.merge(&other);
        assert_eq!(empty, other);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        let q = Quartiles::of(&mut values).unwrap();
        assert_eq!(q.q1, 1.75);
        assert_eq!(q.median, 2.5);
        assert_eq!(q.q3, 3.25);

        let q = Quartiles::of(&mut vec![7.0]).unwrap();
        assert_eq!((q.q1, q.median, q.q3), (7.0, 7.0, 7.0));
        assert_eq!(Quartiles::of(&mut vec![f64::NAN]), None);
    }

    #[test]
    fn test_merge_drops_quartiles() {
        let mut summary: NumericSummary = [1.0, 2.0, 3.0].into_iter().collect();
        summary.set_quartiles(Quartiles::of(&mut vec![1.0, 2.0, 3.0]));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["50%"], 2.0);

        summary.merge(&[4.0].into_iter().collect());
        assert_eq!(summary.quartiles(), None);
        assert!(serde_json::to_value(&summary).unwrap()["50%"].is_null());
        assert_eq!(summary.sample_variance(), Some(5.0 / 3.0));
    }

    #[test]
    fn test_ignores_non_finite() {
        let summary: NumericSummary = [1.0, f64::NAN, f64::INFINITY, 3.0].into_iter().collect();
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.mean(), 2.0);
    }
}
