//! Cascading pruning of a feed around a kept subset of one entity.
//!
//! A prune keeps the anchor rows accepted by a [`KeepPredicate`] and removes
//! every row elsewhere that the removal orphans, following the
//! [`CascadePlan`] derived from the schema:
//!
//! ```text
//! round 1   detach anchor refs ─► anchor ─► detach / release per entity
//! round 2   detach / release per entity            (late deletions)
//! ...
//! round N   nothing deleted: fixed point
//! closing   IntegrityValidator in Repair mode
//! ```
//!
//! A prune mutates the store in place. Store failures abort it with no
//! rollback; operate on a copy (`MemoryStore::clone`,
//! `SqliteStore::snapshot_to`) when atomicity matters.

pub mod closure;
pub mod plan;
pub mod predicate;

pub use closure::{ancestor_closure, Baseline};
pub use plan::{CascadePlan, Referrer, Step};
pub use predicate::{BoundingBox, KeepPredicate, Region, StopLocation};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::PruneConfig;
use crate::core::{IntegrityValidator, ValidationMode, ValidationReport};
use crate::error::{FeedError, Result};
use crate::log_store_op;
use crate::schema::{ForeignKey, SchemaGraph};
use crate::store::{Filter, RowId, Store, StoreLayout};

/// Anchor entity of [`Pruner::clip`].
pub const STOPS: &str = "stops";

/// Rows deleted by one step of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDeletion {
    pub round: usize,
    pub step: String,
    pub entity: String,
    pub rows: usize,
}

/// The result of a prune.
#[derive(Debug, Clone, Serialize)]
pub struct PruneReport {
    pub anchor: String,
    /// Anchor rows before the prune
    pub anchor_rows: usize,
    /// Anchor rows kept, ancestors of kept rows included
    pub anchor_kept: usize,
    /// Rounds over the plan, the final quiet round included
    pub rounds: usize,
    /// Forward deletions in the order they happened
    pub deletions: Vec<StepDeletion>,
    /// The closing repair
    pub repair: ValidationReport,
}

impl PruneReport {
    fn new(anchor: &str) -> Self {
        Self {
            anchor: anchor.to_string(),
            anchor_rows: 0,
            anchor_kept: 0,
            rounds: 0,
            deletions: Vec::new(),
            repair: ValidationReport::new(ValidationMode::Repair),
        }
    }

    /// Rows deleted by the forward cascade.
    pub fn total_deleted(&self) -> usize {
        self.deletions.iter().map(|d| d.rows).sum()
    }

    /// Rows of `entity` deleted by the forward cascade.
    pub fn deleted_from(&self, entity: &str) -> usize {
        self.deletions
            .iter()
            .filter(|d| d.entity == entity)
            .map(|d| d.rows)
            .sum()
    }
}

/// Removes rows orphaned by filtering an anchor entity.
///
/// # Examples
///
/// ```rust
/// use feed_guard::prune::{BoundingBox, Pruner};
/// use feed_guard::schema::SchemaGraph;
/// use feed_guard::store::{MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() -> feed_guard::error::Result<()> {
/// let schema = SchemaGraph::gtfs()?;
/// let mut store = MemoryStore::with_schema(&schema).await?;
/// store.insert("stops", &[("stop_id", "IN"), ("stop_lon", "10.5"), ("stop_lat", "50.5")]).await?;
/// store.insert("stops", &[("stop_id", "OUT"), ("stop_lon", "20.0"), ("stop_lat", "60.0")]).await?;
/// store.insert("transfers", &[("from_stop_id", "IN"), ("to_stop_id", "OUT"), ("transfer_type", "2")]).await?;
///
/// let region = BoundingBox::new(10.0, 50.0, 11.0, 51.0)?;
/// let report = Pruner::new(&schema).clip(&mut store, &region).await?;
///
/// assert_eq!(report.anchor_kept, 1);
/// assert_eq!(store.row_count("stops"), 1);
/// assert_eq!(store.row_count("transfers"), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pruner<'a> {
    schema: &'a SchemaGraph,
    config: PruneConfig,
}

impl<'a> Pruner<'a> {
    pub fn new(schema: &'a SchemaGraph) -> Self {
        Self {
            schema,
            config: PruneConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PruneConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    /// The plan a prune anchored on `anchor` follows.
    pub fn plan(&self, anchor: &str) -> Result<CascadePlan> {
        CascadePlan::build(self.schema, anchor)
    }

    /// Keeps the stops inside `region` and everything they still need.
    pub async fn clip<S, R>(&self, store: &mut S, region: &R) -> Result<PruneReport>
    where
        S: Store + ?Sized,
        R: Region + ?Sized,
    {
        self.prune(store, STOPS, &StopLocation::new(region)).await
    }

    /// Keeps the `anchor` rows accepted by `keep` and deletes every row
    /// orphaned as a consequence, then repairs whatever still dangles.
    #[instrument(skip(self, store, keep))]
    pub async fn prune<S, P>(&self, store: &mut S, anchor: &str, keep: &P) -> Result<PruneReport>
    where
        S: Store + ?Sized,
        P: KeepPredicate + ?Sized,
    {
        self.config.validate()?;
        let plan = self.plan(anchor)?;
        let layout = store.layout().await?;
        let baseline = Baseline::capture(&*store, self.schema, &plan).await?;

        let mut report = PruneReport::new(anchor);
        loop {
            if report.rounds >= self.config.max_rounds {
                return Err(FeedError::fixed_point("prune", self.config.max_rounds));
            }
            report.rounds += 1;
            let round = report.rounds;

            let mut deleted = 0;
            for step in plan.steps() {
                let rows = match step {
                    Step::Anchor { entity } if round == 1 => {
                        self.apply_anchor(store, &layout, entity, keep, &mut report)
                            .await?
                    }
                    Step::Anchor { .. } => 0,
                    Step::Detach { edge } => self.detach(store, &layout, edge).await?,
                    Step::Release { entity, referrers } => {
                        self.release(store, &layout, &baseline, entity, referrers)
                            .await?
                    }
                };
                if rows > 0 {
                    log_store_op!(self.config.log, round, step = %step, rows, "Pruned rows");
                    report.deletions.push(StepDeletion {
                        round,
                        step: step.to_string(),
                        entity: step.entity().to_string(),
                        rows,
                    });
                    deleted += rows;
                }
            }

            if deleted == 0 {
                break;
            }
        }

        let validator =
            IntegrityValidator::new(self.schema).with_config(self.config.validator.clone());
        report.repair = validator.validate(store, ValidationMode::Repair).await?;
        if report.repair.rows_deleted > 0 {
            warn!(
                rows_deleted = report.repair.rows_deleted,
                "Closing repair deleted rows the cascade left dangling"
            );
        }

        info!(
            rounds = report.rounds,
            rows_deleted = report.total_deleted(),
            "Pruned {anchor}"
        );
        Ok(report)
    }

    async fn apply_anchor<S, P>(
        &self,
        store: &mut S,
        layout: &StoreLayout,
        entity: &str,
        keep: &P,
        report: &mut PruneReport,
    ) -> Result<usize>
    where
        S: Store + ?Sized,
        P: KeepPredicate + ?Sized,
    {
        if !layout.has_entity(entity) {
            return Ok(0);
        }
        let rows = store.scan(entity, &Filter::All).await?;
        let seeds = rows.iter().filter(|row| keep.keep(row)).map(|row| row.id);
        let self_edges: Vec<&ForeignKey> = self.schema.self_edges(entity).collect();
        let kept = ancestor_closure(&rows, seeds, &self_edges);

        report.anchor_rows = rows.len();
        report.anchor_kept = kept.len();
        info!("{} of {} {entity} are kept", kept.len(), rows.len());

        let doomed: Vec<RowId> = rows
            .iter()
            .map(|row| row.id)
            .filter(|id| !kept.contains(id))
            .collect();
        delete_rows(store, entity, &doomed).await
    }

    async fn detach<S>(&self, store: &mut S, layout: &StoreLayout, edge: &ForeignKey) -> Result<usize>
    where
        S: Store + ?Sized,
    {
        if !layout.has_source(edge) {
            return Ok(0);
        }
        let entity = &edge.source().entity;
        let filter = layout.dangling_filter(edge);

        let mut deleted = 0;
        loop {
            let doomed: Vec<RowId> = store
                .scan(entity, &filter)
                .await?
                .iter()
                .map(|row| row.id)
                .collect();
            if doomed.is_empty() {
                break;
            }
            deleted += delete_rows(store, entity, &doomed).await?;
            // Deleting a parent can leave its children dangling.
            if !edge.is_self_ref() {
                break;
            }
        }
        Ok(deleted)
    }

    async fn release<S>(
        &self,
        store: &mut S,
        layout: &StoreLayout,
        baseline: &Baseline,
        entity: &str,
        referrers: &[Referrer],
    ) -> Result<usize>
    where
        S: Store + ?Sized,
    {
        if !layout.has_entity(entity) {
            return Ok(0);
        }
        let rows = store.scan(entity, &Filter::All).await?;
        let referenced = closure::referenced_ids(&*store, layout, &rows, referrers).await?;
        let exempt = rows
            .iter()
            .map(|row| row.id)
            .filter(|id| !baseline.contains(entity, *id));
        let self_edges: Vec<&ForeignKey> = self.schema.self_edges(entity).collect();
        let kept = ancestor_closure(&rows, referenced.into_iter().chain(exempt), &self_edges);

        let doomed: Vec<RowId> = rows
            .iter()
            .map(|row| row.id)
            .filter(|id| !kept.contains(id))
            .collect();
        delete_rows(store, entity, &doomed).await
    }
}

async fn delete_rows<S>(store: &mut S, entity: &str, ids: &[RowId]) -> Result<usize>
where
    S: Store + ?Sized,
{
    for id in ids {
        store.delete_by_identity(entity, *id).await?;
    }
    Ok(ids.len())
}
