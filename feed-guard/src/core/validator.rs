//! Foreign key validation and repair.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{error, info, instrument, warn};

use crate::config::ValidatorConfig;
use crate::error::{FeedError, Result};
use crate::logging::truncate_field;
use crate::schema::{ForeignKey, SchemaGraph};
use crate::store::{Filter, RowId, Store};

use super::{ValidationMode, ValidationOutcome, ValidationReport, Violation};

/// Rows scheduled for deletion by one sweep, per entity.
type Schedule = BTreeMap<String, BTreeSet<RowId>>;

/// Checks a store against every foreign key of a schema.
///
/// A sweep visits the edges in schema order (source entity, then source
/// column) and selects, for each edge, the source rows whose value is
/// non-null and present in none of the target columns. Only the first
/// sweep's findings are reported. In [`ValidationMode::Repair`] the rows
/// found by a sweep are deleted once the sweep is complete and the store is
/// swept again, until a sweep finds nothing.
///
/// Cost is roughly passes × edges × scan cost; a repair whose deletions
/// cascade through N levels of references takes N + 1 sweeps.
///
/// Edges whose source entity or column is absent from the store are
/// skipped. Absent target entities contribute no values, so every non-null
/// value of such an edge dangles.
///
/// # Examples
///
/// ```rust
/// use feed_guard::core::{IntegrityValidator, ValidationMode};
/// use feed_guard::schema::SchemaGraph;
/// use feed_guard::store::{MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() -> feed_guard::error::Result<()> {
/// let schema = SchemaGraph::gtfs()?;
/// let mut store = MemoryStore::with_schema(&schema).await?;
/// store.insert("stops", &[("stop_id", "S1"), ("level_id", "L9")]).await?;
///
/// let validator = IntegrityValidator::new(&schema);
/// let report = validator.validate(&mut store, ValidationMode::Repair).await?;
///
/// assert_eq!(report.violations.len(), 1);
/// assert_eq!(report.violations[0].to_string(), "L9 in stops is not a valid level_id [stop_id: S1]");
/// assert_eq!(store.row_count("stops"), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IntegrityValidator<'a> {
    schema: &'a SchemaGraph,
    config: ValidatorConfig,
}

impl<'a> IntegrityValidator<'a> {
    pub fn new(schema: &'a SchemaGraph) -> Self {
        Self {
            schema,
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &'a SchemaGraph {
        self.schema
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates `store` and, in repair mode, deletes offending rows until
    /// the store is consistent.
    ///
    /// Strict mode fails with [`FeedError::InvalidInput`] when anything is
    /// found. Strict and permissive runs never modify the store.
    #[instrument(skip(self, store))]
    pub async fn validate<S>(&self, store: &mut S, mode: ValidationMode) -> Result<ValidationReport>
    where
        S: Store + ?Sized,
    {
        self.config.validate()?;
        let edges = self.checked_edges(&*store).await?;
        info!(edges = edges.len(), "Validating");

        let mut report = ValidationReport::new(mode);
        loop {
            if report.passes >= self.config.max_passes {
                return Err(FeedError::fixed_point("repair", self.config.max_passes));
            }

            let record = report.passes == 0;
            let (violations, schedule) = self.sweep(&*store, &edges, record, mode).await?;
            report.passes += 1;
            if record {
                report.violations = violations;
            }

            if schedule.is_empty() {
                break;
            }

            let mut deleted = 0;
            for (entity, ids) in &schedule {
                for id in ids {
                    store.delete_by_identity(entity, *id).await?;
                    deleted += 1;
                }
            }
            report.rows_deleted += deleted;
            info!("Re-validating after deleting {deleted} row(s)");
        }

        self.finish(report)
    }

    /// Runs a single read-only sweep and returns every violation it finds.
    pub async fn check<S>(&self, store: &S) -> Result<Vec<Violation>>
    where
        S: Store + ?Sized,
    {
        let edges = self.checked_edges(store).await?;
        let (violations, _) = self
            .sweep(store, &edges, true, ValidationMode::Permissive)
            .await?;
        Ok(violations)
    }

    /// Edges that apply to the store, with the filter selecting their dangling rows.
    async fn checked_edges<S>(&self, store: &S) -> Result<Vec<(&'a ForeignKey, Filter)>>
    where
        S: Store + ?Sized,
    {
        let layout = store.layout().await?;
        Ok(self
            .schema
            .edges()
            .iter()
            .filter(|edge| layout.has_source(edge))
            .map(|edge| (edge, layout.dangling_filter(edge)))
            .collect())
    }

    async fn sweep<S>(
        &self,
        store: &S,
        edges: &[(&'a ForeignKey, Filter)],
        record: bool,
        mode: ValidationMode,
    ) -> Result<(Vec<Violation>, Schedule)>
    where
        S: Store + ?Sized,
    {
        let mut violations = Vec::new();
        let mut schedule = Schedule::new();

        for (edge, filter) in edges {
            let source = edge.source();
            let rows = store.scan(&source.entity, filter).await?;
            for row in rows {
                if record {
                    if let Some(violation) = Violation::from_row(&source.entity, &source.column, &row)
                    {
                        self.log_violation(&violation, mode);
                        violations.push(violation);
                    }
                }
                if mode.mutates() {
                    schedule
                        .entry(source.entity.clone())
                        .or_default()
                        .insert(row.id);
                }
            }
        }

        Ok((violations, schedule))
    }

    fn finish(&self, mut report: ValidationReport) -> Result<ValidationReport> {
        if report.violations.is_empty() {
            report.outcome = ValidationOutcome::Consistent;
            return Ok(report);
        }

        match report.mode {
            ValidationMode::Strict => {
                error!(
                    violations = report.violations.len(),
                    "Validation failed: foreign key violations found"
                );
                Err(FeedError::InvalidInput {
                    violations: report.violations,
                })
            }
            ValidationMode::Repair => {
                report.outcome = ValidationOutcome::Repaired {
                    passes: report.passes - 1,
                    rows_deleted: report.rows_deleted,
                };
                warn!(
                    violations = report.violations.len(),
                    rows_deleted = report.rows_deleted,
                    "Repaired foreign key violations"
                );
                Ok(report)
            }
            ValidationMode::Permissive => {
                report.outcome = ValidationOutcome::Retained;
                warn!(
                    violations = report.violations.len(),
                    "Foreign key violations retained"
                );
                Ok(report)
            }
        }
    }

    fn log_violation(&self, violation: &Violation, mode: ValidationMode) {
        if !self.config.log.log_violations {
            return;
        }
        let message = truncate_field(&violation.to_string(), self.config.log.max_field_length);
        if mode.is_fatal() {
            error!("{message}");
        } else {
            warn!("{message}");
        }
    }
}
