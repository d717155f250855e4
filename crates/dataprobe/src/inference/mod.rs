//! Semantic type inference for columns.

mod classifier;

pub use classifier::{ColumnType, ColumnTypeInfo, NumericKind, TemporalKind, TypeClassifier};
