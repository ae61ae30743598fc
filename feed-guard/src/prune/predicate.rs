//! Keep predicates for the anchor entity of a prune.

use tracing::warn;

use crate::error::{FeedError, Result};
use crate::store::Row;

/// Decides which anchor rows survive a prune.
///
/// Implemented for every `Fn(&Row) -> bool + Send + Sync`, so a closure
/// works wherever a predicate is expected:
///
/// ```rust
/// use feed_guard::prune::KeepPredicate;
/// use feed_guard::store::{Row, RowId};
///
/// let keep = |row: &Row| row.get("zone_id") == Some("Z1");
/// let row = Row { id: RowId(1), values: vec![("zone_id".into(), Some("Z1".into()))] };
/// assert!(keep.keep(&row));
/// ```
pub trait KeepPredicate: Send + Sync {
    fn keep(&self, row: &Row) -> bool;
}

impl<F> KeepPredicate for F
where
    F: Fn(&Row) -> bool + Send + Sync,
{
    fn keep(&self, row: &Row) -> bool {
        self(row)
    }
}

/// A geographic area that can answer point containment.
///
/// Polygon and multipolygon regions live outside this crate; implement this
/// trait to plug one in.
pub trait Region: Send + Sync {
    fn contains(&self, lon: f64, lat: f64) -> bool;
}

impl<R: Region + ?Sized> Region for &R {
    fn contains(&self, lon: f64, lat: f64) -> bool {
        (**self).contains(lon, lat)
    }
}

impl<R: Region + ?Sized> Region for Box<R> {
    fn contains(&self, lon: f64, lat: f64) -> bool {
        (**self).contains(lon, lat)
    }
}

/// An axis-aligned rectangle in degrees, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let finite = [min_lon, min_lat, max_lon, max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !finite || min_lon > max_lon || min_lat > max_lat {
            return Err(FeedError::Configuration(format!(
                "invalid bounding box [{min_lon}, {min_lat}, {max_lon}, {max_lat}]"
            )));
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }
}

impl Region for BoundingBox {
    fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

/// Keeps stops whose `stop_lon`/`stop_lat` fall inside a region.
///
/// Stops without coordinates are not kept. Malformed coordinates are
/// logged and the stop is not kept either.
#[derive(Debug, Clone)]
pub struct StopLocation<R> {
    region: R,
}

impl<R: Region> StopLocation<R> {
    pub fn new(region: R) -> Self {
        Self { region }
    }

    pub fn region(&self) -> &R {
        &self.region
    }
}

fn coordinate(row: &Row, column: &str) -> Option<f64> {
    let raw = row.get(column)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(
                stop_id = row.get("stop_id").unwrap_or_default(),
                "Failed to parse {column} '{raw}'"
            );
            None
        }
    }
}

impl<R: Region> KeepPredicate for StopLocation<R> {
    fn keep(&self, row: &Row) -> bool {
        let (Some(lon), Some(lat)) = (coordinate(row, "stop_lon"), coordinate(row, "stop_lat"))
        else {
            return false;
        };
        self.region.contains(lon, lat)
    }
}
