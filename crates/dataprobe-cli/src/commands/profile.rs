//! Profile command - column statistics, schema buckets and quality issues.

use std::path::{Path, PathBuf};

use colored::Colorize;
use dataprobe::{QualityIssue, Severity};

use super::{CommandResult, build_probe, emit};
use crate::cli::OutputArgs;

pub fn run(file: PathBuf, output: OutputArgs, config: Option<&Path>, verbose: bool) -> CommandResult {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    eprintln!(
        "{} {}",
        "Profiling".cyan().bold(),
        file.display().to_string().white()
    );

    let probe = build_probe(config)?;
    let result = probe.analyze_file(&file, None)?;
    let metrics = &result.metrics;

    if let Some(error) = &metrics.error {
        eprintln!("{} {}", "Profiling failed:".red().bold(), error);
        emit(&result, &output)?;
        return Ok(false);
    }

    eprintln!(
        "{} rows, {} columns{}",
        metrics.total_rows.to_string().white().bold(),
        metrics.total_columns.to_string().white().bold(),
        if metrics.analysis_info.processed_in_chunks {
            format!(" ({} chunks)", metrics.analysis_info.chunk_count)
        } else {
            String::new()
        }
    );
    eprintln!(
        "{} missing cells ({}%), {} duplicate rows ({}%)",
        metrics.summary.missing_cells,
        metrics.summary.missing_cells_pct,
        metrics.summary.duplicate_rows,
        metrics.summary.duplicate_rows_pct
    );
    if verbose {
        for pair in &metrics.insights.high_correlations {
            eprintln!(
                "  {} {} ~ {} (r = {})",
                "correlated".cyan(),
                pair.column1,
                pair.column2,
                pair.correlation
            );
        }
    }

    print_issues(&metrics.data_quality_issues, verbose);
    emit(&result, &output)?;
    Ok(true)
}

fn print_issues(issues: &[QualityIssue], verbose: bool) {
    if issues.is_empty() {
        eprintln!("{}", "No quality issues found".green());
        return;
    }

    let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
    eprintln!(
        "Found {} quality issues ({} high, {} medium, {} low)",
        issues.len().to_string().white().bold(),
        count(Severity::High).to_string().red(),
        count(Severity::Medium).to_string().yellow(),
        count(Severity::Low).to_string().blue()
    );

    if verbose {
        for issue in issues {
            let severity = match issue.severity {
                Severity::High => issue.severity.label().red(),
                Severity::Medium => issue.severity.label().yellow(),
                Severity::Low => issue.severity.label().blue(),
            };
            eprintln!(
                "  {:8} {:20} {:22} {}",
                severity,
                issue.column,
                issue.issue_type.label(),
                issue.description
            );
        }
    }
}
