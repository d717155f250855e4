//! Profiling and validation performance benchmarks.
//!
//! Measures parsing, chunked profiling, expression evaluation and rule
//! validation over generated order data.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use dataprobe::input::Parser;
use dataprobe::{DataProbe, ExpressionEvaluator, Profiler, ProfilerConfig, ValidationRule};
use std::io::Write;
use tempfile::NamedTempFile;

/// Generate order data with messy prices, mixed dates and some gaps.
fn generate_orders(rows: usize) -> String {
    let mut data = String::new();
    data.push_str("order_id,customer,order_date,unit price,quantity,total,status\n");

    let customers = ["Acme", "acme", "Globex", "Initech", "Umbrella"];
    let statuses = ["shipped", "pending", "cancelled", ""];

    for row in 0..rows {
        let price = 5.0 + (row % 40) as f64 * 0.25;
        let quantity = 1 + row % 9;
        data.push_str(&format!("{},", row + 1));
        data.push_str(customers[row % customers.len()]);
        data.push(',');
        match row % 3 {
            0 => data.push_str(&format!("2024-{:02}-{:02}", (row % 12) + 1, (row % 28) + 1)),
            1 => data.push_str(&format!("{:02}/{:02}/2024", (row % 12) + 1, (row % 28) + 1)),
            _ => {}
        }
        data.push(',');
        if row % 17 == 0 {
            data.push_str(&format!("\"${:.2}\"", price));
        } else {
            data.push_str(&format!("{:.2}", price));
        }
        data.push_str(&format!(",{},{:.2},", quantity, price * quantity as f64));
        data.push_str(statuses[row % statuses.len()]);
        data.push('\n');
    }

    data
}

fn write_temp(data: &str) -> NamedTempFile {
    let mut temp = NamedTempFile::with_suffix(".csv").unwrap();
    temp.write_all(data.as_bytes()).unwrap();
    temp
}

/// Benchmark profiling with and without chunking.
fn bench_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("profile");
    group.sample_size(20);

    for rows in [1_000, 20_000, 100_000].iter() {
        let temp = write_temp(&generate_orders(*rows));
        let (dataset, _) = Parser::new().parse_file(temp.path()).unwrap();

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("chunked", rows), &dataset, |b, dataset| {
            let profiler = Profiler::default();
            b.iter(|| black_box(profiler.profile(dataset)))
        });
        group.bench_with_input(BenchmarkId::new("single_pass", rows), &dataset, |b, dataset| {
            let config = ProfilerConfig::default().with_chunk_bounds(usize::MAX, usize::MAX);
            let profiler = Profiler::new(config);
            b.iter(|| black_box(profiler.profile(dataset)))
        });
    }

    group.finish();
}

/// Benchmark parsing alone.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for rows in [1_000, 20_000].iter() {
        let data = generate_orders(*rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("orders_rows", rows), &data, |b, data| {
            let parser = Parser::new();
            b.iter(|| black_box(parser.parse_bytes(data.as_bytes(), b',').unwrap()))
        });
    }

    group.finish();
}

/// Benchmark expression evaluation and rule validation.
fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    let temp = write_temp(&generate_orders(20_000));
    let (dataset, _) = Parser::new().parse_file(temp.path()).unwrap();
    let probe = DataProbe::new();

    group.bench_function("expression_20k_rows", |b| {
        let evaluator = ExpressionEvaluator::default().with_decimal_places(Some(2));
        b.iter(|| black_box(evaluator.evaluate(&dataset, "`unit price` * quantity").unwrap()))
    });

    let rules = vec![
        ValidationRule::not_null("order_date"),
        ValidationRule::between("quantity", 1.0, 8.0),
        ValidationRule::greater_than("total", 0.0),
        ValidationRule::pair_equal("total", "unit price * quantity").with_decimal_places(2),
    ];
    group.bench_function("rules_20k_rows", |b| {
        b.iter(|| black_box(probe.validate(&dataset, &rules)))
    });

    group.finish();
}

criterion_group!(benches, bench_profile, bench_parse, bench_validate);
criterion_main!(benches);
