//! Common test fixtures for integrity and pruning scenarios.
//!
//! [`FeedBuilder`] assembles small GTFS feeds row by row. [`FeedBuilder::new`]
//! starts from a consistent feed:
//!
//! ```text
//! agency A1 ◄── routes R1 ◄── trips T1 ──► calendar WEEK
//!                              ▲
//!                 stop_times (T1, 1) ──► stops S1 (10.0, 50.0)
//!                 stop_times (T1, 2) ──► stops S2 (10.1, 50.1)
//! ```

#![allow(clippy::expect_used)]

use crate::error::Result;
use crate::schema::SchemaGraph;
use crate::store::{MemoryStore, Store};

/// The GTFS schema. Panics if it fails to build.
pub fn gtfs_schema() -> SchemaGraph {
    SchemaGraph::gtfs().expect("GTFS schema should build")
}

/// Row-by-row builder for GTFS test feeds.
#[derive(Debug, Clone, Default)]
pub struct FeedBuilder {
    rows: Vec<(String, Vec<(String, String)>)>,
}

impl FeedBuilder {
    /// A small consistent feed with one route, one trip and two stops.
    pub fn new() -> Self {
        Self::empty()
            .agency("A1")
            .calendar("WEEK")
            .route("R1", "A1")
            .trip("T1", "R1", "WEEK")
            .stop("S1", 10.0, 50.0)
            .stop("S2", 10.1, 50.1)
            .stop_time("T1", "1", "S1")
            .stop_time("T1", "2", "S2")
    }

    /// A feed without any rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A consistent feed of `routes` routes, each with `trips_per_route` trips
    /// calling at `stops_per_trip` stops.
    ///
    /// Stops lie on a line from (0.0, 0.0) eastwards in steps of 0.01 degrees
    /// and are shared between the trips of a route.
    pub fn generated(routes: usize, trips_per_route: usize, stops_per_trip: usize) -> Self {
        let mut feed = Self::empty().agency("A1").calendar("WEEK");
        for r in 0..routes {
            let route = format!("R{r}");
            feed = feed.route(&route, "A1");
            for s in 0..stops_per_trip {
                let stop = format!("S{r}_{s}");
                let lon = (r * stops_per_trip + s) as f64 * 0.01;
                feed = feed.stop(&stop, lon, 0.0);
            }
            for t in 0..trips_per_route {
                let trip = format!("T{r}_{t}");
                feed = feed.trip(&trip, &route, "WEEK");
                for s in 0..stops_per_trip {
                    feed = feed.stop_time(&trip, &(s + 1).to_string(), &format!("S{r}_{s}"));
                }
            }
        }
        feed
    }

    /// Adds a row with arbitrary columns.
    pub fn row(mut self, entity: &str, values: &[(&str, &str)]) -> Self {
        self.rows.push((
            entity.to_string(),
            values
                .iter()
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    pub fn agency(self, agency_id: &str) -> Self {
        self.row(
            "agency",
            &[
                ("agency_id", agency_id),
                ("agency_name", "Transit"),
                ("agency_url", "https://example.com"),
                ("agency_timezone", "Europe/Berlin"),
            ],
        )
    }

    pub fn calendar(self, service_id: &str) -> Self {
        self.row(
            "calendar",
            &[
                ("service_id", service_id),
                ("monday", "1"),
                ("tuesday", "1"),
                ("wednesday", "1"),
                ("thursday", "1"),
                ("friday", "1"),
                ("saturday", "0"),
                ("sunday", "0"),
                ("start_date", "20240101"),
                ("end_date", "20241231"),
            ],
        )
    }

    pub fn calendar_date(self, service_id: &str, date: &str) -> Self {
        self.row(
            "calendar_dates",
            &[
                ("service_id", service_id),
                ("date", date),
                ("exception_type", "1"),
            ],
        )
    }

    pub fn route(self, route_id: &str, agency_id: &str) -> Self {
        self.row(
            "routes",
            &[
                ("route_id", route_id),
                ("agency_id", agency_id),
                ("route_type", "3"),
            ],
        )
    }

    pub fn trip(self, trip_id: &str, route_id: &str, service_id: &str) -> Self {
        self.row(
            "trips",
            &[
                ("route_id", route_id),
                ("service_id", service_id),
                ("trip_id", trip_id),
            ],
        )
    }

    pub fn stop(self, stop_id: &str, lon: f64, lat: f64) -> Self {
        let (lon, lat) = (lon.to_string(), lat.to_string());
        self.row(
            "stops",
            &[("stop_id", stop_id), ("stop_lat", lat.as_str()), ("stop_lon", lon.as_str())],
        )
    }

    /// A stop whose `parent_station` is `parent`.
    pub fn child_stop(self, stop_id: &str, parent: &str, lon: f64, lat: f64) -> Self {
        let (lon, lat) = (lon.to_string(), lat.to_string());
        self.row(
            "stops",
            &[
                ("stop_id", stop_id),
                ("stop_lat", lat.as_str()),
                ("stop_lon", lon.as_str()),
                ("parent_station", parent),
            ],
        )
    }

    pub fn stop_time(self, trip_id: &str, stop_sequence: &str, stop_id: &str) -> Self {
        self.row(
            "stop_times",
            &[
                ("trip_id", trip_id),
                ("stop_id", stop_id),
                ("stop_sequence", stop_sequence),
            ],
        )
    }

    pub fn level(self, level_id: &str) -> Self {
        self.row("levels", &[("level_id", level_id), ("level_index", "0")])
    }

    /// Inserts every row into `store`, which must already declare the entities.
    pub async fn load_into<S: Store + ?Sized>(&self, store: &mut S) -> Result<()> {
        for (entity, values) in &self.rows {
            let values: Vec<(&str, &str)> = values
                .iter()
                .map(|(c, v)| (c.as_str(), v.as_str()))
                .collect();
            store.insert(entity, &values).await?;
        }
        Ok(())
    }

    /// Builds a [`MemoryStore`] declaring every entity of `schema`. Panics on failure.
    pub async fn build(&self, schema: &SchemaGraph) -> MemoryStore {
        let mut store = MemoryStore::with_schema(schema)
            .await
            .expect("schema should declare");
        self.load_into(&mut store)
            .await
            .expect("fixture rows should insert");
        store
    }
}
