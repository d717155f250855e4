//! Example: profile a tabular data file and print a readable summary.
//!
//! Usage:
//!   cargo run --example profile -- <file_path> [rules_file]

use std::env;
use std::path::Path;

use dataprobe::profile::SchemaBucket;
use dataprobe::{DataProbe, Severity, load_rules};

fn main() -> dataprobe::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example profile -- <file_path> [rules_file]");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    if !path.exists() {
        eprintln!("Error: File not found: {}", path.display());
        std::process::exit(1);
    }
    let rules = args.get(2).map(load_rules).transpose()?;

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Profile: {}", path.display());
    println!("{}", separator);
    println!();

    let result = DataProbe::new().analyze_file(path, rules.as_deref())?;
    let metrics = &result.metrics;

    println!("## Source");
    println!("  Format: {}", result.source.format);
    println!("  Rows: {}", result.source.row_count);
    println!("  Columns: {}", result.source.column_count);
    println!("  Chunks: {}", metrics.analysis_info.chunk_count);
    println!();

    println!("## Schema");
    for bucket in SchemaBucket::ALL {
        let columns: Vec<&str> = metrics.schema_info.columns(bucket).collect();
        if !columns.is_empty() {
            println!("  {:18} {}", bucket.key(), columns.join(", "));
        }
    }
    println!();

    println!("## Columns");
    for (name, entry) in &metrics.column_stats {
        match entry.as_computed() {
            Some(stats) => println!(
                "  {:20} {:8} nulls={:<6.2}% unique={}",
                name, stats.data_type, stats.null_percentage, stats.unique_count
            ),
            None => println!("  {:20} (failed)", name),
        }
    }
    println!();

    println!("## Quality Issues ({})", metrics.data_quality_issues.len());
    for issue in &metrics.data_quality_issues {
        let marker = match issue.severity {
            Severity::High => "!!!",
            Severity::Medium => "!! ",
            Severity::Low => "!  ",
        };
        println!("  {} {:20} {}", marker, issue.column, issue.description);
    }

    if let Some(report) = &result.validation {
        println!();
        println!(
            "## Validation: {} ({}/{} passed)",
            if report.success { "PASSED" } else { "FAILED" },
            report.statistics.successful_expectations,
            report.statistics.evaluated_expectations
        );
        for failure in report.failures() {
            println!(
                "  {} unexpected={}",
                failure.expectation_config.expectation_type, failure.result.unexpected_count
            );
        }
    }

    Ok(())
}
