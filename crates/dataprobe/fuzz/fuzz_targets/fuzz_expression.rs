//! Fuzz target for expression parsing and evaluation.
//!
//! Arbitrary expressions over a small dataset must either evaluate to one
//! value per row or fail with an error, and never touch the dataset.

#![no_main]

use dataprobe::{Column, ExpressionEvaluator, TabularDataset};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|expression: &str| {
    if expression.len() > 500 {
        return;
    }

    let Ok(dataset) = TabularDataset::new(vec![
        Column::from_ints("qty", [Some(2), None, Some(-7)]),
        Column::from_floats("unit price", [Some(1.5), Some(0.0), None]),
        Column::from_strs("amount", [Some("$1,200"), Some("(3)"), Some("n/a")]),
    ]) else {
        return;
    };
    let before = dataset.clone();

    if let Ok(evaluation) = ExpressionEvaluator::default().evaluate(&dataset, expression) {
        assert_eq!(evaluation.values.len(), 3);
    }
    assert_eq!(dataset, before);
});
