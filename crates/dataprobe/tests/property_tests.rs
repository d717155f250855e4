//! Property-based tests for the profiling and coercion pipeline.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p dataprobe --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p dataprobe --test property_tests
//! ```

use proptest::prelude::*;

use dataprobe::coercion::{parse_number, round2};
use dataprobe::profile::{ChunkAnalysis, ChunkAnalyzer, ChunkPlan, merge_chunks};
use dataprobe::{
    Column, ColumnSource, ExpressionEvaluator, Profiler, ProfilerConfig, QualityIssueDetector, TabularDataset,
    TypeClassifier,
};

// =============================================================================
// Test Strategies
// =============================================================================

/// Nullable integer cells.
fn int_cells() -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(prop::option::weighted(0.8, -1000i64..1000), 1..200)
}

/// Text that looks like hand-entered numbers, dates and labels.
fn messy_text() -> impl Strategy<Value = Option<String>> {
    prop::option::weighted(
        0.85,
        prop_oneof![
            "[$£€]?[0-9]{1,3}(,[0-9]{3})*(\\.[0-9]{1,2})?%?",
            "\\([0-9]{1,4}\\)",
            "20[0-2][0-9]-(0[1-9]|1[0-2])-(0[1-9]|1[0-9]|2[0-8])",
            "[a-zA-Z ]{0,12}",
        ],
    )
}

fn dataset_from(ints: Vec<Option<i64>>, texts: Vec<Option<String>>) -> TabularDataset {
    let rows = ints.len();
    let texts: Vec<Option<String>> = texts.into_iter().cycle().take(rows).collect();
    TabularDataset::new(vec![
        Column::from_ints("n", ints),
        Column::from_strs("t", texts.iter().map(|t| t.as_deref())),
    ])
    .expect("equal-length columns")
}

fn small_chunks() -> ProfilerConfig {
    ProfilerConfig::default()
        .with_chunk_bounds(7, 13)
        .with_max_workers(4)
}

// =============================================================================
// Profiling
// =============================================================================

proptest! {
    #[test]
    fn chunk_rows_sum_to_total(
        ints in int_cells(),
        texts in prop::collection::vec(messy_text(), 1..20),
    ) {
        let dataset = dataset_from(ints, texts);
        let rows = dataset.row_count();

        let metrics = Profiler::new(small_chunks()).profile(&dataset);
        prop_assert_eq!(metrics.total_rows, rows);
        for entry in metrics.column_stats.values() {
            let stats = entry.as_computed().expect("computed");
            prop_assert_eq!(stats.total_rows, rows);
            prop_assert_eq!(stats.null_count + stats.non_null_count(), rows);
            prop_assert_eq!(
                stats.null_percentage,
                round2(stats.null_count as f64 / rows as f64 * 100.0)
            );
        }
    }

    #[test]
    fn merge_ignores_completion_order(
        ints in int_cells(),
        texts in prop::collection::vec(messy_text(), 1..20),
        seed in any::<u64>(),
    ) {
        let dataset = dataset_from(ints, texts);
        let plan = ChunkPlan::new(dataset.row_count(), &small_chunks());
        let analyzer = ChunkAnalyzer::default();

        let ordered: Vec<_> = plan.ranges.iter().map(|r| analyzer.analyze(&dataset, r.clone())).collect();
        let mut ranges = plan.ranges.clone();
        let len = ranges.len();
        ranges.rotate_left((seed as usize) % len);
        ranges.reverse();
        let shuffled: Vec<_> = ranges.into_iter().map(|r| analyzer.analyze(&dataset, r)).collect();

        prop_assert_eq!(merge_chunks(ordered), merge_chunks(shuffled));
    }

    #[test]
    fn chunked_counts_match_single_pass(
        ints in int_cells(),
        texts in prop::collection::vec(messy_text(), 1..20),
    ) {
        let dataset = dataset_from(ints, texts);
        let chunked = Profiler::new(small_chunks()).profile(&dataset);
        let whole = Profiler::default().profile(&dataset);

        for (name, entry) in &whole.column_stats {
            let a = entry.as_computed().expect("computed");
            let b = chunked.column_stats[name].as_computed().expect("computed");
            prop_assert_eq!(a.null_count, b.null_count);
            for (value, count) in &a.value_counts {
                prop_assert_eq!(count.count, b.value_counts[value].count);
            }
        }
    }

    #[test]
    fn detection_is_idempotent(
        ints in int_cells(),
        texts in prop::collection::vec(messy_text(), 1..20),
    ) {
        let dataset = dataset_from(ints, texts);
        let detector = QualityIssueDetector::default();
        let mut metrics = Profiler::default().profile(&dataset);

        detector.annotate(&mut metrics);
        let first = metrics.data_quality_issues.clone();
        detector.annotate(&mut metrics);
        prop_assert_eq!(first, metrics.data_quality_issues);
    }
}

// =============================================================================
// Classification and Coercion
// =============================================================================

proptest! {
    #[test]
    fn classification_is_deterministic(texts in prop::collection::vec(messy_text(), 1..60)) {
        let column = Column::from_strs("t", texts.iter().map(|t| t.as_deref()));
        let classifier = TypeClassifier::default();
        prop_assert_eq!(classifier.classify(&column), classifier.classify(&column));
    }

    #[test]
    fn parse_number_never_panics(raw in "\\PC{0,40}") {
        let _ = parse_number(&raw);
    }

    #[test]
    fn parenthesised_is_negated(n in 0u32..1_000_000) {
        let plain = parse_number(&n.to_string()).expect("plain number");
        let wrapped = parse_number(&format!("({n})")).expect("negative number");
        prop_assert_eq!(wrapped, -plain);
    }

    #[test]
    fn expressions_never_panic(expr in "[a-z0-9+*/%()\\-. ]{0,30}") {
        let dataset = TabularDataset::new(vec![
            Column::from_ints("a", [Some(1), None, Some(3)]),
            Column::from_floats("b", [Some(0.5), Some(2.0), None]),
        ])
        .expect("valid dataset");
        let before = dataset.clone();
        let _ = ExpressionEvaluator::default().evaluate(&dataset, &expr);
        prop_assert_eq!(dataset, before);
    }

    #[test]
    fn nesting_depth_is_bounded(depth in 0usize..20_000, signs in any::<bool>()) {
        let dataset = TabularDataset::new(vec![Column::from_ints("a", [Some(2)])]).expect("valid dataset");
        let expr = if signs {
            format!("{}a", "-".repeat(depth))
        } else {
            format!("{}a{}", "(".repeat(depth), ")".repeat(depth))
        };
        let result = ExpressionEvaluator::default().evaluate(&dataset, &expr);
        prop_assert_eq!(result.is_ok(), depth < 256);
    }
}
