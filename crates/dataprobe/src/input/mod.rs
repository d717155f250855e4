//! Input datasets and source parsing.

mod dataset;
pub mod flatten;
mod parser;
mod source;

pub use dataset::{CellValue, Column, ColumnOrigin, ColumnSource, StorageType, TabularDataset, ValueKey};
pub use parser::{is_null_token, Parser, ParserConfig};
pub use source::{SourceFormat, SourceMetadata, fingerprint};
