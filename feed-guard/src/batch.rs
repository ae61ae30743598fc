//! Validation of many independent stores in parallel.
//!
//! Each store is moved into its own task and handed back with its report, so
//! workers share nothing mutable; the schema is shared read-only.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

use crate::config::BatchConfig;
use crate::core::{IntegrityValidator, ValidationReport};
use crate::error::{FeedError, Result};
use crate::schema::SchemaGraph;
use crate::store::Store;

/// Validates every store with `config.mode`, at most `config.max_workers` at
/// a time.
///
/// Results come back in input order. A failing store does not stop the
/// others; its store is lost with the error, like any store whose
/// validation failed midway.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use feed_guard::batch::validate_all;
/// use feed_guard::config::BatchConfig;
/// use feed_guard::core::ValidationMode;
/// use feed_guard::schema::SchemaGraph;
/// use feed_guard::store::{MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() -> feed_guard::error::Result<()> {
/// let schema = Arc::new(SchemaGraph::gtfs()?);
/// let mut feed = MemoryStore::with_schema(&schema).await?;
/// feed.insert("routes", &[("route_id", "R1"), ("agency_id", "NOPE")]).await?;
///
/// let config = BatchConfig::default().with_mode(ValidationMode::Repair);
/// let results = validate_all(schema, vec![feed, MemoryStore::new()], config).await?;
///
/// let (repaired, report) = results.into_iter().next().unwrap()?;
/// assert_eq!(report.rows_deleted, 1);
/// assert_eq!(repaired.row_count("routes"), 0);
/// # Ok(())
/// # }
/// ```
#[instrument(skip(schema, stores, config), fields(stores = stores.len()))]
pub async fn validate_all<S>(
    schema: Arc<SchemaGraph>,
    stores: Vec<S>,
    config: BatchConfig,
) -> Result<Vec<Result<(S, ValidationReport)>>>
where
    S: Store + 'static,
{
    config.validate()?;
    info!(workers = config.max_workers, "Validating feeds");

    let permits = Arc::new(Semaphore::new(config.max_workers));
    let mut handles = Vec::with_capacity(stores.len());
    for (index, mut store) in stores.into_iter().enumerate() {
        let schema = Arc::clone(&schema);
        let permits = Arc::clone(&permits);
        let validator_config = config.validator.clone();
        let mode = config.mode;

        handles.push(tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| FeedError::Internal(format!("Worker semaphore closed: {e}")))?;
            debug!(index, "Validating feed");
            let report = IntegrityValidator::new(&schema)
                .with_config(validator_config)
                .validate(&mut store, mode)
                .await?;
            Ok::<_, FeedError>((store, report))
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(e) => Err(FeedError::Internal(format!("Task join error: {e}"))),
        });
    }
    Ok(results)
}
