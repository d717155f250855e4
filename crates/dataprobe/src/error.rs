//! Error types for the dataprobe library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dataprobe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Empty file or no data to analyze.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A referenced column does not exist in the dataset.
    #[error("Column not found: '{0}'")]
    ColumnNotFound(String),

    /// Columns of a dataset disagree on their row count.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share the same name.
    #[error("Duplicate column name: '{0}'")]
    DuplicateColumn(String),

    /// A chunk range falls outside the dataset.
    #[error("Chunk range {start}..{end} is outside a dataset of {rows} rows")]
    ChunkRange { start: usize, end: usize, rows: usize },

    /// A chunk worker panicked.
    #[error("Chunk {start}..{end} panicked: {message}")]
    ChunkPanic {
        start: usize,
        end: usize,
        message: String,
    },

    /// Statistics could not be computed for a column.
    #[error("Statistics error for column '{column}': {message}")]
    Stats { column: String, message: String },

    /// An arithmetic expression could not be parsed or evaluated.
    #[error("Invalid expression: {expression}. Error: {message}")]
    InvalidExpression { expression: String, message: String },

    /// A validation rule is missing required parameters or is malformed.
    #[error("Invalid rule '{expectation_type}': {message}")]
    InvalidRule {
        expectation_type: String,
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for dataprobe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;
