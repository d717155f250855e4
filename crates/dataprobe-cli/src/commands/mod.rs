//! CLI command implementations.

pub mod profile;
pub mod validate;

use std::fs;

use dataprobe::{DataProbe, ProbeConfig};
use serde::Serialize;
use tracing::debug;

use crate::cli::OutputArgs;

pub type CommandResult = Result<bool, Box<dyn std::error::Error>>;

/// Build the engine from an optional config file.
pub fn build_probe(config: Option<&std::path::Path>) -> Result<DataProbe, Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            ProbeConfig::from_json_file(path)?
        }
        None => ProbeConfig::default(),
    };
    Ok(DataProbe::with_config(config))
}

/// Write a report as JSON to the output file or stdout.
pub fn emit<T: Serialize>(report: &T, args: &OutputArgs) -> Result<(), Box<dyn std::error::Error>> {
    let json = if args.pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    match &args.output {
        Some(path) => fs::write(path, json + "\n")?,
        None => println!("{}", json),
    }
    Ok(())
}
