//! Aggregation throughput benchmarks.
//!
//! Run with: `cargo bench --package barwire-bench`

use barwire_bench::{bench_start, noisy_page, synthetic_samples};
use barwire_lib::{
    Aggregator, Asset, AssetId, Category, FxCalendar, IndicatorConfig, IndicatorSink,
    MemoryStore, Storage, TradingCalendar, normalize_page, sanitize,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

const SIZES: [usize; 2] = [10_000, 100_000];

fn asset() -> Asset {
    Asset::new(AssetId::new(1), "EUR_USD", Category::Forex)
}

fn feed_benchmark(c: &mut Criterion) {
    let calendar: Arc<dyn TradingCalendar> = Arc::new(FxCalendar::default());
    let mut group = c.benchmark_group("aggregator_feed");

    for size in SIZES {
        let samples = synthetic_samples(asset().id(), bench_start(), size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("null_sink", size), &samples, |b, samples| {
            b.iter(|| {
                let mut aggregator = Aggregator::new(asset().id(), Arc::clone(&calendar), ());
                for sample in samples {
                    aggregator.feed(black_box(sample)).ok();
                }
                black_box(aggregator.last_time())
            });
        });

        group.bench_with_input(
            BenchmarkId::new("indicator_sink", size),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let sink = IndicatorSink::new(&IndicatorConfig::defaults());
                    let mut aggregator = Aggregator::new(asset().id(), Arc::clone(&calendar), sink);
                    for sample in samples {
                        aggregator.feed(black_box(sample)).ok();
                        aggregator.sink_mut().drain_rows();
                    }
                    black_box(aggregator.samples_fed())
                });
            },
        );
    }

    group.finish();
}

fn normalize_benchmark(c: &mut Criterion) {
    let calendar = FxCalendar::default();
    let asset = asset();
    let samples = synthetic_samples(asset.id(), bench_start(), 5_000);
    let page = noisy_page(asset.symbol(), &samples);

    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(page.len() as u64));
    group.bench_function("page_5000", |b| {
        b.iter(|| black_box(normalize_page(black_box(&page), &asset, &calendar)));
    });
    group.bench_function("sanitize_5000", |b| {
        b.iter(|| black_box(sanitize(black_box(samples.clone()))));
    });
    group.finish();
}

fn storage_benchmark(c: &mut Criterion) {
    let Ok(runtime) = tokio::runtime::Runtime::new() else {
        eprintln!("Failed to start tokio runtime, skipping storage benchmark");
        return;
    };
    let asset = asset();
    let samples = synthetic_samples(asset.id(), bench_start(), 10_000);

    let mut group = c.benchmark_group("memory_store");
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("append_sanitize_10000", |b| {
        b.to_async(&runtime).iter(|| async {
            let store = MemoryStore::new();
            for batch in samples.chunks(500) {
                store.append(&asset, batch).await.ok();
            }
            black_box(store.sanitize(&asset).await.ok())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    feed_benchmark,
    normalize_benchmark,
    storage_benchmark
);
criterion_main!(benches);
