//! # feed-guard - Referential integrity for GTFS feeds
//!
//! feed-guard keeps a richly cross-referenced relational data set consistent
//! under two operations:
//!
//! - **Validation**: check every foreign key of a schema against a loaded
//!   data set, and optionally repair it by deleting offending rows until no
//!   reference dangles.
//! - **Pruning**: keep a subset of one entity (for example the stops inside
//!   a geographic region) and remove everything elsewhere that the removal
//!   orphans, in dependency order, until nothing further is implied.
//!
//! The GTFS schema ships with the crate; any other schema can be declared
//! with [`schema::SchemaBuilder`].
//!
//! ## Quick Start
//!
//! ```rust
//! use feed_guard::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> feed_guard::error::Result<()> {
//! let schema = SchemaGraph::gtfs()?;
//! let mut store = MemoryStore::with_schema(&schema).await?;
//! store.insert("agency", &[("agency_id", "A1"), ("agency_name", "Transit")]).await?;
//! store.insert("routes", &[("route_id", "R1"), ("agency_id", "A1")]).await?;
//! store.insert("routes", &[("route_id", "R2"), ("agency_id", "A2")]).await?;
//!
//! // Strict validation refuses the feed and lists what is wrong.
//! let validator = IntegrityValidator::new(&schema);
//! match validator.validate(&mut store, ValidationMode::Strict).await {
//!     Err(FeedError::InvalidInput { violations }) => {
//!         assert_eq!(violations[0].to_string(), "A2 in routes is not a valid agency_id [route_id: R2]");
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//!
//! // Repair deletes the offending rows instead.
//! let report = validator.validate(&mut store, ValidationMode::Repair).await?;
//! assert_eq!(report.rows_deleted, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Validation modes
//!
//! | Mode | Violations | Store |
//! |------|------------|-------|
//! | `Strict` | returned inside `FeedError::InvalidInput` | untouched |
//! | `Repair` | reported as a warning | offending rows deleted to a fixed point |
//! | `Permissive` | reported as a warning | untouched |
//!
//! ## Clipping
//!
//! ```rust
//! use feed_guard::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> feed_guard::error::Result<()> {
//! # let schema = SchemaGraph::gtfs()?;
//! # let mut store = MemoryStore::with_schema(&schema).await?;
//! let region = BoundingBox::new(13.0, 52.3, 13.8, 52.7)?;
//! let report = Pruner::new(&schema).clip(&mut store, &region).await?;
//! println!("{} of {} stops kept", report.anchor_kept, report.anchor_rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`schema`**: the foreign-key graph and the GTFS declaration
//! - **`store`**: the `Store` trait with in-memory and SQLite adapters
//! - **`core`**: the integrity validator and its reports
//! - **`prune`**: cascade planning and the pruner
//! - **`batch`**: parallel validation of independent stores
//! - **`formatters`**: human and JSON report output
//!
//! Cost of a validation is roughly passes × edges × scan cost. A call runs
//! sequentially; independent stores can be processed in parallel with
//! [`batch::validate_all`].

pub mod batch;
pub mod config;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod prune;
pub mod schema;
pub mod security;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
