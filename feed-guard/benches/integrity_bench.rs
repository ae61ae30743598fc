//! Benchmarks for repair and clip over generated feeds.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use feed_guard::core::{IntegrityValidator, ValidationMode};
use feed_guard::prune::{BoundingBox, Pruner};
use feed_guard::store::MemoryStore;
use feed_guard::test_fixtures::{gtfs_schema, FeedBuilder};
use tokio::runtime::Runtime;

const SIZES: [(usize, usize, usize); 3] = [(5, 4, 10), (20, 10, 20), (50, 20, 30)];

fn benchmark_repair(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let schema = gtfs_schema();
    let mut group = c.benchmark_group("repair");

    for (routes, trips, stops) in SIZES {
        // One extra route points at a missing agency.
        let feed = rt.block_on(
            FeedBuilder::generated(routes, trips, stops)
                .row("routes", &[("route_id", "BROKEN"), ("agency_id", "NOPE")])
                .build(&schema),
        );
        let repaired = rt.block_on(async {
            let mut store = feed.clone();
            IntegrityValidator::new(&schema)
                .validate(&mut store, ValidationMode::Repair)
                .await
                .unwrap();
            store
        });
        let label = format!("{}_rows", feed.total_rows());

        group.bench_function(format!("consistent_{label}"), |b| {
            b.iter_batched(
                || repaired.clone(),
                |mut store: MemoryStore| {
                    rt.block_on(
                        IntegrityValidator::new(&schema).validate(&mut store, ValidationMode::Repair),
                    )
                    .unwrap()
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("one_violation_{label}"), |b| {
            b.iter_batched(
                || feed.clone(),
                |mut store: MemoryStore| {
                    rt.block_on(
                        IntegrityValidator::new(&schema).validate(&mut store, ValidationMode::Repair),
                    )
                    .unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn benchmark_clip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let schema = gtfs_schema();
    let mut group = c.benchmark_group("clip");

    for (routes, trips, stops) in SIZES {
        let feed = rt.block_on(FeedBuilder::generated(routes, trips, stops).build(&schema));
        // Keeps roughly the western half of the generated line of stops.
        let max_lon = (routes * stops) as f64 * 0.005;
        let region = BoundingBox::new(-1.0, -1.0, max_lon, 1.0).unwrap();

        group.bench_function(format!("half_{}_rows", feed.total_rows()), |b| {
            b.iter_batched(
                || feed.clone(),
                |mut store: MemoryStore| {
                    rt.block_on(Pruner::new(&schema).clip(&mut store, &region))
                        .unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_repair, benchmark_clip);
criterion_main!(benches);
