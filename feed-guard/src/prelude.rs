//! Prelude for commonly used types and traits in feed-guard.

pub use crate::config::{BatchConfig, PruneConfig, ValidatorConfig};
pub use crate::core::{IntegrityValidator, ValidationMode, ValidationOutcome, ValidationReport, Violation};
pub use crate::error::{FeedError, Result, StoreError};
pub use crate::formatters::{FormatterConfig, HumanFormatter, JsonFormatter, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::prune::{BoundingBox, KeepPredicate, PruneReport, Pruner, Region, StopLocation};
pub use crate::schema::{ForeignKey, SchemaGraph};
pub use crate::store::{MemoryStore, Row, RowId, SqliteStore, Store};
