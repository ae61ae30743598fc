//! Property-based tests for validation and pruning.
//!
//! Feeds are generated with references drawn from a range slightly larger
//! than the set of existing ids, so a share of them dangles. The properties:
//!
//! - after a repair, a permissive validation finds nothing
//! - strict and permissive validation never modify the store
//! - a second prune with the same predicate deletes nothing
//! - a prune leaves no dangling reference behind

mod common;

use common::gtfs;
use feed_guard::core::{IntegrityValidator, ValidationMode};
use feed_guard::error::FeedError;
use feed_guard::prune::{BoundingBox, Pruner};
use feed_guard::schema::SchemaGraph;
use feed_guard::store::{MemoryStore, Store};
use proptest::prelude::*;

/// A generated feed: references are indexes, some past the end.
#[derive(Debug, Clone)]
struct FeedShape {
    agencies: usize,
    /// route -> agency
    routes: Vec<usize>,
    /// trip -> route
    trips: Vec<usize>,
    /// stop -> (parent stop, longitude)
    stops: Vec<(Option<usize>, f64)>,
    /// stop_time -> (trip, stop)
    stop_times: Vec<(usize, usize)>,
}

fn feed_shape() -> impl Strategy<Value = FeedShape> {
    (1usize..4, 1usize..6, 1usize..8, 1usize..10).prop_flat_map(|(agencies, routes, trips, stops)| {
        (
            Just(agencies),
            prop::collection::vec(0..agencies + 1, routes),
            prop::collection::vec(0..routes + 1, trips),
            prop::collection::vec((prop::option::of(0..stops + 1), 0.0f64..2.0), stops),
            prop::collection::vec((0..trips + 1, 0..stops + 1), 0..20),
        )
            .prop_map(|(agencies, routes, trips, stops, stop_times)| FeedShape {
                agencies,
                routes,
                trips,
                stops,
                stop_times,
            })
    })
}

async fn build(schema: &SchemaGraph, shape: &FeedShape) -> MemoryStore {
    let mut store = MemoryStore::with_schema(schema).await.unwrap();
    store
        .insert("calendar", &[("service_id", "WEEK")])
        .await
        .unwrap();
    for a in 0..shape.agencies {
        let id = format!("A{a}");
        store.insert("agency", &[("agency_id", id.as_str())]).await.unwrap();
    }
    for (r, agency) in shape.routes.iter().enumerate() {
        let (id, agency) = (format!("R{r}"), format!("A{agency}"));
        store
            .insert("routes", &[("route_id", id.as_str()), ("agency_id", agency.as_str())])
            .await
            .unwrap();
    }
    for (t, route) in shape.trips.iter().enumerate() {
        let (id, route) = (format!("T{t}"), format!("R{route}"));
        store
            .insert(
                "trips",
                &[("trip_id", id.as_str()), ("route_id", route.as_str()), ("service_id", "WEEK")],
            )
            .await
            .unwrap();
    }
    for (s, (parent, lon)) in shape.stops.iter().enumerate() {
        let id = format!("S{s}");
        let parent = parent.map(|p| format!("S{p}")).unwrap_or_default();
        let lon = lon.to_string();
        store
            .insert(
                "stops",
                &[
                    ("stop_id", id.as_str()),
                    ("parent_station", parent.as_str()),
                    ("stop_lon", lon.as_str()),
                    ("stop_lat", "0.5"),
                ],
            )
            .await
            .unwrap();
    }
    for (seq, (trip, stop)) in shape.stop_times.iter().enumerate() {
        let (trip, stop, seq) = (format!("T{trip}"), format!("S{stop}"), seq.to_string());
        store
            .insert(
                "stop_times",
                &[("trip_id", trip.as_str()), ("stop_id", stop.as_str()), ("stop_sequence", seq.as_str())],
            )
            .await
            .unwrap();
    }
    store
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_repair_reaches_closure(shape in feed_shape()) {
        runtime().block_on(async {
            let schema = gtfs();
            let mut store = build(&schema, &shape).await;
            let validator = IntegrityValidator::new(&schema);

            let report = validator.validate(&mut store, ValidationMode::Repair).await.unwrap();
            prop_assert_eq!(report.rows_deleted, store.deletions().len());
            prop_assert_eq!(report.has_violations(), report.rows_deleted > 0);

            let after = validator.validate(&mut store, ValidationMode::Permissive).await.unwrap();
            prop_assert!(after.violations.is_empty());
            Ok(())
        })?;
    }

    #[test]
    fn test_read_only_modes_do_not_mutate(shape in feed_shape()) {
        runtime().block_on(async {
            let schema = gtfs();
            let mut store = build(&schema, &shape).await;
            let validator = IntegrityValidator::new(&schema);

            let permissive = validator.validate(&mut store, ValidationMode::Permissive).await.unwrap();
            match validator.validate(&mut store, ValidationMode::Strict).await {
                Ok(report) => prop_assert!(report.is_consistent()),
                Err(FeedError::InvalidInput { violations }) => {
                    prop_assert_eq!(violations, permissive.violations);
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
            prop_assert!(store.deletions().is_empty());
            Ok(())
        })?;
    }

    #[test]
    fn test_prune_is_idempotent_and_closed(shape in feed_shape(), max_lon in 0.0f64..2.0) {
        runtime().block_on(async {
            let schema = gtfs();
            let mut store = build(&schema, &shape).await;
            let region = BoundingBox::new(0.0, 0.0, max_lon, 1.0).unwrap();
            let pruner = Pruner::new(&schema);

            pruner.clip(&mut store, &region).await.unwrap();
            let violations = IntegrityValidator::new(&schema).check(&store).await.unwrap();
            prop_assert!(violations.is_empty());

            let rows = store.total_rows();
            let second = pruner.clip(&mut store, &region).await.unwrap();
            prop_assert_eq!(second.total_deleted(), 0);
            prop_assert_eq!(second.repair.rows_deleted, 0);
            prop_assert_eq!(store.total_rows(), rows);
            Ok(())
        })?;
    }
}
