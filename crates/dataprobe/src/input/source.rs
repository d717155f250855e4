//! Source formats and file fingerprints.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProbeError, Result};

/// Records sampled when sniffing the delimiter.
const SNIFF_RECORDS: usize = 20;

/// Delimited text layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Tsv,
    Csv,
    Semicolon,
    Pipe,
    Other(u8),
}

impl SourceFormat {
    /// Candidates tried by [`SourceFormat::sniff`], in tie-break order.
    const CANDIDATES: [SourceFormat; 4] = [
        SourceFormat::Tsv,
        SourceFormat::Csv,
        SourceFormat::Semicolon,
        SourceFormat::Pipe,
    ];

    pub fn from_delimiter(delimiter: u8) -> Self {
        match delimiter {
            b'\t' => SourceFormat::Tsv,
            b',' => SourceFormat::Csv,
            b';' => SourceFormat::Semicolon,
            b'|' => SourceFormat::Pipe,
            other => SourceFormat::Other(other),
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            SourceFormat::Tsv => b'\t',
            SourceFormat::Csv => b',',
            SourceFormat::Semicolon => b';',
            SourceFormat::Pipe => b'|',
            SourceFormat::Other(d) => *d,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceFormat::Tsv => "tsv",
            SourceFormat::Csv => "csv",
            SourceFormat::Semicolon => "csv-semicolon",
            SourceFormat::Pipe => "psv",
            SourceFormat::Other(_) => "delimited",
        }
    }

    /// Guess the layout from the leading records.
    ///
    /// A candidate scores by how many leading records agree with the header's
    /// field count, then by that field count. Single-field layouts never win;
    /// when nothing splits the header the data is read as CSV.
    pub fn sniff(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ProbeError::EmptyData("No lines to analyze".to_string()));
        }

        let mut best = (SourceFormat::Csv, 0usize, 0usize);
        for format in Self::CANDIDATES {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(format.delimiter())
                .has_headers(false)
                .flexible(true)
                .from_reader(bytes);
            let widths: Vec<usize> = reader
                .records()
                .take(SNIFF_RECORDS)
                .filter_map(|r| r.ok())
                .map(|r| r.len())
                .collect();

            let Some(&fields) = widths.first() else {
                continue;
            };
            if fields < 2 {
                continue;
            }
            let agreeing = widths.iter().filter(|&&w| w == fields).count();
            if (agreeing, fields) > (best.1, best.2) {
                best = (format, agreeing, fields);
            }
        }
        Ok(best.0)
    }
}

/// `sha256:`-prefixed hex digest of file contents.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(bytes))
}

/// Where a parsed dataset came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without directories.
    pub file: String,
    pub path: PathBuf,
    /// Content fingerprint, see [`fingerprint`].
    pub hash: String,
    pub size_bytes: u64,
    /// Format label such as `csv` or `tsv`.
    pub format: String,
    /// Data rows, header excluded.
    pub row_count: usize,
    pub column_count: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Describe `contents`, read from `path` and parsed as `format` into a
    /// table of the given shape.
    pub fn describe(
        path: PathBuf,
        contents: &[u8],
        format: SourceFormat,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash: fingerprint(contents),
            size_bytes: contents.len() as u64,
            format: format.label().to_string(),
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}
