//! Fuzz target for delimited parsing followed by profiling.
//!
//! Malformed input must be rejected with an error, and anything that parses
//! must profile without panicking.

#![no_main]

use dataprobe::input::Parser;
use dataprobe::{ColumnSource, DataProbe};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10_000 {
        return;
    }

    if let Ok(dataset) = Parser::new().parse_bytes(data, b',') {
        let metrics = DataProbe::new().profile(&dataset);
        assert!(metrics.is_error() || metrics.total_rows == dataset.row_count());
    }
});
