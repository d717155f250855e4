//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dataprobe: profile and validate tabular data files
#[derive(Parser)]
#[command(name = "dataprobe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file (profiler, quality thresholds, parser)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}

/// Options shared by every command that writes a report.
#[derive(clap::Args, Clone)]
pub struct OutputArgs {
    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Profile a data file: column statistics, schema and quality issues
    Profile {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Validate a data file against a rule list
    Validate {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Rules file: JSON rule list, or one plain-English rule per line
        #[arg(short, long, value_name = "RULES")]
        rules: PathBuf,

        /// Also include profiling metrics in the report
        #[arg(long)]
        with_profile: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}
