//! Validate command - run a rule list against a data file.

use std::path::{Path, PathBuf};

use colored::Colorize;
use dataprobe::{ValidationReport, load_rules};

use super::{CommandResult, build_probe, emit};
use crate::cli::OutputArgs;

pub fn run(
    file: PathBuf,
    rules: PathBuf,
    with_profile: bool,
    output: OutputArgs,
    config: Option<&Path>,
    verbose: bool,
) -> CommandResult {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let rules = load_rules(&rules)?;
    eprintln!(
        "{} {} against {} rules",
        "Validating".cyan().bold(),
        file.display().to_string().white(),
        rules.len()
    );

    let probe = build_probe(config)?;
    let result = probe.analyze_file(&file, Some(&rules))?;
    let Some(report) = &result.validation else {
        return Err("validation produced no report".into());
    };

    print_summary(report, verbose);
    if with_profile {
        emit(&result, &output)?;
    } else {
        emit(report, &output)?;
    }
    Ok(report.success)
}

fn print_summary(report: &ValidationReport, verbose: bool) {
    let stats = &report.statistics;
    let verdict = if report.success {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    eprintln!(
        "{} {}/{} rules passed{}",
        verdict,
        stats.successful_expectations,
        stats.evaluated_expectations,
        if stats.skipped_expectations > 0 {
            format!(", {} skipped", stats.skipped_expectations)
        } else {
            String::new()
        }
    );

    for result in &report.results {
        let config = &result.expectation_config;
        let target = config
            .kwargs
            .get("column")
            .or_else(|| config.kwargs.get("column_A"))
            .and_then(|v| v.as_str())
            .unwrap_or("-");

        if result.skipped {
            eprintln!("  {} {} ({})", "skip".blue(), config.expectation_type, target);
        } else if !result.success {
            let reason = result
                .exception_info
                .exception_message
                .clone()
                .unwrap_or_else(|| format!("{} unexpected values", result.result.unexpected_count));
            eprintln!("  {} {} ({}): {}", "fail".red(), config.expectation_type, target, reason);
        } else if verbose {
            eprintln!("  {} {} ({})", "pass".green(), config.expectation_type, target);
        }
    }
}
