//! Shared feed construction for the integration tests.

#![allow(dead_code)]

use feed_guard::schema::SchemaGraph;
use feed_guard::store::{MemoryStore, Store};

pub type Record<'a> = (&'a str, &'a [(&'a str, &'a str)]);

pub fn gtfs() -> SchemaGraph {
    SchemaGraph::gtfs().expect("GTFS schema should build")
}

/// One agency, one weekday service, two routes with one trip each.
///
/// Route R1 calls at S1 and S2 near (10.0, 50.0); route R2 calls at S3 far
/// away. P1 is a platform of station ST1, which lies outside the (10.0, 50.0)
/// to (11.0, 51.0) box while P1 lies inside.
pub const BASE_FEED: &[Record<'static>] = &[
    ("agency", &[("agency_id", "A1"), ("agency_name", "Transit")]),
    ("calendar", &[("service_id", "WEEK"), ("monday", "1")]),
    ("routes", &[("route_id", "R1"), ("agency_id", "A1"), ("route_type", "3")]),
    ("routes", &[("route_id", "R2"), ("agency_id", "A1"), ("route_type", "3")]),
    ("trips", &[("trip_id", "T1"), ("route_id", "R1"), ("service_id", "WEEK")]),
    ("trips", &[("trip_id", "T2"), ("route_id", "R2"), ("service_id", "WEEK")]),
    ("stops", &[("stop_id", "S1"), ("stop_lon", "10.1"), ("stop_lat", "50.1")]),
    ("stops", &[("stop_id", "S2"), ("stop_lon", "10.2"), ("stop_lat", "50.2")]),
    ("stops", &[("stop_id", "S3"), ("stop_lon", "20.0"), ("stop_lat", "60.0")]),
    ("stops", &[("stop_id", "ST1"), ("stop_lon", "12.0"), ("stop_lat", "52.0"), ("location_type", "1")]),
    ("stops", &[("stop_id", "P1"), ("stop_lon", "10.3"), ("stop_lat", "50.3"), ("parent_station", "ST1")]),
    ("stop_times", &[("trip_id", "T1"), ("stop_sequence", "1"), ("stop_id", "S1")]),
    ("stop_times", &[("trip_id", "T1"), ("stop_sequence", "2"), ("stop_id", "P1")]),
    ("stop_times", &[("trip_id", "T2"), ("stop_sequence", "1"), ("stop_id", "S3")]),
];

/// Inserts `records` into `store`, which must declare their entities.
pub async fn load<S: Store + ?Sized>(store: &mut S, records: &[Record<'_>]) {
    for (entity, values) in records {
        store
            .insert(entity, values)
            .await
            .expect("record should insert");
    }
}

/// A memory store declaring the full schema and holding `records`.
pub async fn memory_feed(schema: &SchemaGraph, records: &[Record<'_>]) -> MemoryStore {
    let mut store = MemoryStore::with_schema(schema)
        .await
        .expect("schema should declare");
    load(&mut store, records).await;
    store
}

/// The ordered list of entities in a memory store's deletion journal.
pub fn deleted_entities(store: &MemoryStore) -> Vec<String> {
    store.deletions().iter().map(|(e, _)| e.clone()).collect()
}
