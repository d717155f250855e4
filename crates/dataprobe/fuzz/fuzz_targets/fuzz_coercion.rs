//! Fuzz target for numeric and datetime coercion.
//!
//! Coercion must never panic, and a value that parses must be finite.

#![no_main]

use dataprobe::coercion::{coerce_datetime, coerce_numeric, parse_flexible, parse_number};
use dataprobe::input::CellValue;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000 {
        return;
    }
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(n) = parse_number(raw) {
        assert!(n.is_finite());
    }
    let _ = parse_flexible(raw);

    let values: Vec<CellValue> = raw.split(',').map(|s| CellValue::text(Some(s))).collect();
    assert_eq!(coerce_numeric(&values, Some(2)).len(), values.len());
    assert_eq!(coerce_datetime(&values, Some("%d/%m/%Y")).len(), values.len());
});
