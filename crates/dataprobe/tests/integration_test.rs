//! Integration tests for dataprobe.

use std::io::Write;
use tempfile::NamedTempFile;

use dataprobe::input::StorageType;
use dataprobe::profile::SchemaBucket;
use dataprobe::{
    Column, ColumnSource, ColumnType, DataProbe, IssueType, ProbeConfig, ProfilerConfig,
    QualityIssueDetector, Severity, TabularDataset, ValidationRule,
};
use serde_json::json;

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn orders() -> TabularDataset {
    TabularDataset::new(vec![
        Column::from_ints("order_id", (1..=5).map(Some)),
        Column::from_floats("price", [Some(10.0), Some(2.5), Some(4.0), None, Some(1.0)]),
        Column::from_ints("quantity", [Some(2), Some(4), Some(1), Some(3), Some(10)]),
        Column::from_floats("total", [Some(20.0), Some(10.0), Some(4.0), None, Some(10.0)]),
    ])
    .expect("valid dataset")
}

// =============================================================================
// File Analysis
// =============================================================================

#[test]
fn test_analyze_basic_csv() {
    let content = "id,name,age,active\n\
                   1,Alice,30,true\n\
                   2,Bob,,false\n\
                   3,Carol,28,true\n";
    let file = create_test_file(content, ".csv");

    let result = DataProbe::new()
        .analyze_file(file.path(), None)
        .expect("Analysis failed");

    assert_eq!(result.source.row_count, 3);
    assert_eq!(result.source.column_count, 4);
    assert_eq!(result.source.format, "csv");
    assert_eq!(result.metrics.total_rows, 3);
    assert_eq!(result.metrics.total_columns, 4);
    assert!(result.validation.is_none());

    let age = result.metrics.column_stats["age"].as_computed().unwrap();
    assert_eq!(age.null_count, 1);
    assert_eq!(age.null_percentage, 33.33);
    assert!(result.metrics.schema_info.contains(SchemaBucket::Numeric, "age"));
    assert!(result.metrics.schema_info.contains(SchemaBucket::String, "name"));
}

#[test]
fn test_analyze_tsv_auto_detect() {
    let content = "sample_id\tcity\tscore\n\
                   S001\tOslo\t25\n\
                   S002\tLima\t30\n";
    let file = create_test_file(content, ".tsv");

    let result = DataProbe::new()
        .analyze_file(file.path(), None)
        .expect("Analysis failed");

    assert_eq!(result.source.format, "tsv");
    assert_eq!(result.metrics.total_columns, 3);
}

#[test]
fn test_analyze_with_sentence_rules() {
    let data = create_test_file("name,age\nAnn,30\nBob,\nCid,140\n", ".csv");
    let rules = create_test_file(
        "# customer rules\n\
         the 'age' column should not be null\n\
         the 'age' column should be between 0 and 120\n\
         the 'name' column should not be empty\n",
        ".txt",
    );

    let rules = dataprobe::load_rules(rules.path()).expect("rules load");
    assert_eq!(rules.len(), 3);

    let result = DataProbe::new()
        .analyze_file(data.path(), Some(&rules))
        .expect("Analysis failed");
    let report = result.validation.expect("report present");

    assert!(!report.success);
    assert_eq!(report.statistics.evaluated_expectations, 3);
    assert_eq!(report.statistics.successful_expectations, 1);
    assert_eq!(report.failures().count(), 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = DataProbe::new().analyze_file("/no/such/file.csv", None);
    assert!(matches!(result, Err(dataprobe::ProbeError::Io { .. })));
}

// =============================================================================
// Profiling Properties
// =============================================================================

#[test]
fn test_chunked_profile_row_total() {
    let dataset = TabularDataset::new(vec![
        Column::from_ints("n", (0..103).map(Some)),
        Column::from_strs("tag", (0..103).map(|i| Some(if i % 2 == 0 { "even" } else { "odd" }))),
    ])
    .unwrap();

    let config = ProbeConfig {
        profiler: ProfilerConfig::default()
            .with_chunk_bounds(10, 25)
            .with_max_workers(3),
        ..ProbeConfig::default()
    };
    let metrics = DataProbe::with_config(config).profile(&dataset);

    assert!(metrics.analysis_info.processed_in_chunks);
    assert!(metrics.analysis_info.chunk_count > 1);
    assert_eq!(metrics.total_rows, 103);
    assert_eq!(metrics.analysis_info.failed_chunks, 0);

    let tag = metrics.column_stats["tag"].as_computed().unwrap();
    assert_eq!(tag.total_rows, 103);
    assert_eq!(tag.value_counts["even"].count, 52);
    assert_eq!(tag.value_counts["odd"].count, 51);

    let whole = DataProbe::new().profile(&dataset);
    assert!(!whole.analysis_info.processed_in_chunks);
    let n_chunked = metrics.column_stats["n"].as_computed().unwrap();
    let n_whole = whole.column_stats["n"].as_computed().unwrap();
    assert_eq!(n_chunked.null_count, n_whole.null_count);
    let (a, b) = (
        n_chunked.numeric_summary.as_ref().unwrap(),
        n_whole.numeric_summary.as_ref().unwrap(),
    );
    assert!((a.mean() - b.mean()).abs() < 1e-9);
    assert!((a.std() - b.std()).abs() < 1e-9);
}

#[test]
fn test_half_null_column_is_medium_issue() {
    let dataset = TabularDataset::new(vec![Column::from_ints(
        "score",
        [Some(1), Some(2), Some(3), Some(4), Some(5), None, None, None, None, None],
    )])
    .unwrap();

    let metrics = DataProbe::new().profile(&dataset);
    let stats = metrics.column_stats["score"].as_computed().unwrap();
    assert_eq!(stats.null_percentage, 50.0);

    let issue = metrics
        .data_quality_issues
        .iter()
        .find(|i| i.issue_type == IssueType::HighNullPercentage)
        .expect("null issue");
    assert_eq!(issue.severity, Severity::Medium);
}

#[test]
fn test_detector_is_idempotent() {
    let dataset = TabularDataset::new(vec![
        Column::from_strs("city", [Some("Oslo"), Some("oslo"), Some("OSLO"), None, None]),
        Column::from_strs("code", [Some("a#1"), Some("b@2"), Some("c!3"), Some("d"), None]),
    ])
    .unwrap();

    let mut metrics = DataProbe::new().profile(&dataset);
    let first = metrics.data_quality_issues.clone();
    assert!(!first.is_empty());

    let detector = QualityIssueDetector::default();
    detector.annotate(&mut metrics);
    detector.annotate(&mut metrics);
    assert_eq!(metrics.data_quality_issues, first);
}

#[test]
fn test_profile_report_serializes() {
    let metrics = DataProbe::new().profile(&orders());
    let value = serde_json::to_value(&metrics).unwrap();

    assert_eq!(value["total_rows"], json!(5));
    assert!(value["schema_info"]["numeric_columns"].as_array().unwrap().len() == 4);
    assert_eq!(value["column_stats"]["price"]["null_percentage"], json!(20.0));
    assert!(value.get("error").is_none());
}

#[test]
fn test_profile_reports_whole_dataset_statistics() {
    let metrics = DataProbe::new().profile(&orders());
    let value = serde_json::to_value(&metrics).unwrap();

    assert_eq!(value["summary"]["missing_cells"], json!(2));
    assert_eq!(value["summary"]["missing_cells_pct"], json!(10.0));
    assert_eq!(value["summary"]["duplicate_rows"], json!(0));
    assert_eq!(value["column_stats"]["price"]["numeric_summary"]["50%"], json!(3.25));
    assert_eq!(value["column_stats"]["order_id"]["numeric_summary"]["75%"], json!(4.0));
    assert_eq!(value["insights"]["correlations"]["price"]["price"], json!(1.0));
    assert_eq!(value["insights"]["outliers"]["quantity"]["anomalies"], json!(0));
}

// =============================================================================
// Classification and Expressions
// =============================================================================

#[test]
fn test_classification_is_deterministic() {
    let dataset = TabularDataset::new(vec![Column::from_strs(
        "when",
        [Some("2024-01-05"), Some("2024-02-11"), Some("2024-03-01")],
    )])
    .unwrap();

    let probe = DataProbe::new();
    let first = probe.classify_column(&dataset, "when").unwrap();
    let second = probe.classify_column(&dataset, "when").unwrap();
    assert_eq!(first, second);
    assert!(matches!(first.column_type, ColumnType::Datetime(_)));
}

#[test]
fn test_expression_leaves_dataset_untouched() {
    let dataset = orders();
    let before = dataset.clone();

    let evaluation = DataProbe::new()
        .evaluate_expression(&dataset, "price * quantity", Some(2))
        .unwrap();

    assert_eq!(dataset, before);
    assert_eq!(
        evaluation.values,
        vec![Some(20.0), Some(10.0), Some(4.0), None, Some(10.0)]
    );

    let mut working = dataset.clone();
    let columns = working.column_count();
    dataprobe::ExpressionEvaluator::default()
        .materialize_into(&mut working, "line_total", "price * quantity")
        .unwrap();
    assert_eq!(working.column_count(), columns + 1);
    assert_eq!(working.column("line_total").unwrap().storage, StorageType::Float);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_not_null_rule_fails_on_null() {
    let dataset = TabularDataset::new(vec![Column::from_ints("age", [Some(30), None, Some(41)])]).unwrap();
    let rules = vec![ValidationRule::not_null("age")];

    let report = DataProbe::new().validate(&dataset, &rules);
    assert!(!report.success);
    assert!(!report.results[0].success);
    assert!(report.results[0].result.unexpected_count >= 1);
}

#[test]
fn test_pair_equality_against_expression() {
    let rules = vec![
        ValidationRule::pair_equal("total", "price * quantity").with_rule_id("line_total"),
    ];
    let report = DataProbe::new().validate(&orders(), &rules);

    assert!(report.success, "{:?}", report.results[0]);
    assert_eq!(report.results[0].result.missing_count, 1);
    assert_eq!(
        report.results[0].expectation_config.meta.extra["generated_column_name"],
        json!("__expr_col_line_total")
    );
}

#[test]
fn test_unknown_rule_is_skipped_not_fatal() {
    let rules: Vec<ValidationRule> = serde_json::from_value(json!([
        {"expectation_type": "expect_table_row_count_to_equal", "kwargs": {"value": 5}},
        {"expectation_type": "expect_column_values_to_be_greater_than",
         "kwargs": {"column": "quantity", "value": 0}}
    ]))
    .unwrap();

    let report = DataProbe::new().validate(&orders(), &rules);
    assert!(report.success);
    assert!(report.results[0].skipped);
    assert_eq!(report.statistics.skipped_expectations, 1);
    assert_eq!(report.statistics.evaluated_expectations, 1);
}

#[test]
fn test_spaced_column_names_are_renamed() {
    let dataset = TabularDataset::new(vec![
        Column::from_floats("unit price", [Some(2.0), Some(3.0)]),
        Column::from_ints("qty", [Some(2), Some(2)]),
        Column::from_floats("line total", [Some(4.0), Some(6.0)]),
    ])
    .unwrap();
    let rules = vec![ValidationRule::pair_equal("line total", "unit price * qty")];

    let report = DataProbe::new().validate(&dataset, &rules);
    assert!(report.success, "{:?}", report.results[0]);
    assert_eq!(report.column_renames["unit price"], "unit_price");
    assert_eq!(dataset.column_names(), vec!["unit price", "qty", "line total"]);
}
