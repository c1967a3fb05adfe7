//! Breadth Computation Benchmarks — Daily Batch Hot Path
//!
//! Benchmarks the EMA recursion and the full cross-sectional metrics
//! pass over a realistically sized rolling store.
//!
//! Run with: cargo bench --bench ema_bench

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nse_breadth_pipeline::domain::breadth::{MetricsConfig, MetricsEngine};
use nse_breadth_pipeline::domain::ema::ema_series;
use nse_breadth_pipeline::domain::prices::{PricePoint, RollingStore};
use nse_breadth_pipeline::domain::symbol::Symbol;

fn close_series(len: usize, seed: f64) -> Vec<f64> {
    (0..len)
        .map(|i| seed + (i as f64 * 0.7).sin() * 25.0 + i as f64 * 0.1)
        .collect()
}

/// Benchmark one full-retention EMA pass (the 200-span series dominates).
fn bench_ema_series(c: &mut Criterion) {
    let closes = close_series(1400, 2500.0);

    c.bench_function("ema_200_over_1400_points", |b| {
        b.iter(|| {
            let _series = ema_series(black_box(&closes), black_box(200));
        });
    });
}

/// Benchmark the whole metrics pass over a 100-symbol universe with a
/// seeded (260-point) store, the shape of a typical incremental run.
fn bench_metrics_compute(c: &mut Criterion) {
    let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
    let mut store = RollingStore::new(1400);
    for i in 0..100 {
        let symbol = Symbol::normalize(&format!("SYM{i}")).unwrap();
        let closes = close_series(260, 100.0 + i as f64 * 13.0);
        let points: Vec<PricePoint> = closes
            .iter()
            .enumerate()
            .map(|(d, close)| PricePoint {
                symbol: symbol.clone(),
                date: end - Days::new((259 - d) as u64),
                close: *close,
            })
            .collect();
        store.upsert(points);
    }
    let engine = MetricsEngine::new(MetricsConfig::default());

    c.bench_function("breadth_compute_100x260", |b| {
        b.iter(|| {
            let _snapshot = engine.compute(black_box(&store)).unwrap();
        });
    });
}

criterion_group!(benches, bench_ema_series, bench_metrics_compute);
criterion_main!(benches);
