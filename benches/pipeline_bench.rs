//! Criterion benchmarks for aggregation and forecasting

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use salescast::services::{Aggregator, Pipeline};
use salescast::types::{Granularity, Metric, SaleRecord};

/// Deterministic daily sales for `products` over `days`, with trend and weekly swing
fn synthetic_records(products: i64, days: i64) -> Vec<SaleRecord> {
    let start = Utc.with_ymd_and_hms(2021, 1, 1, 9, 0, 0).unwrap();
    let mut records = Vec::with_capacity((products * days) as usize);

    for day in 0..days {
        for product_id in 1..=products {
            let trend = day / 30;
            let swing = (day + product_id) % 7;
            records.push(SaleRecord {
                timestamp: start + Duration::days(day),
                product_id,
                quantity: 5 + trend + swing,
                unit_price: 10.0 + product_id as f64,
            });
        }
    }

    records
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    // Three years of daily sales
    let records = synthetic_records(20, 3 * 365);
    group.throughput(Throughput::Elements(records.len() as u64));

    for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
        group.bench_with_input(
            BenchmarkId::from_parameter(granularity),
            &records,
            |b, records| {
                b.iter(|| {
                    Aggregator::aggregate(black_box(records), granularity, Metric::Revenue)
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let records = synthetic_records(20, 3 * 365);
    group.throughput(Throughput::Elements(records.len() as u64));

    let pipeline = Pipeline {
        granularity: Granularity::Week,
        horizon: 12,
        ..Pipeline::default()
    };

    group.bench_function("run", |b| {
        b.iter(|| pipeline.run(black_box(&records)).unwrap())
    });

    group.bench_function("run_per_product", |b| {
        b.iter(|| pipeline.run_per_product(black_box(&records)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_pipeline);
criterion_main!(benches);
