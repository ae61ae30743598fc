//! Row sets closed over references, used to decide which rows stay alive.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::plan::{CascadePlan, Referrer, Step};
use crate::error::StoreResult;
use crate::schema::{ForeignKey, SchemaGraph};
use crate::store::{Filter, Row, RowId, Store, StoreLayout};

/// Extends `seeds` with every row they reach through `self_edges`.
///
/// A kept child station keeps its parent station, and the parent's parent.
pub fn ancestor_closure<I>(rows: &[Row], seeds: I, self_edges: &[&ForeignKey]) -> BTreeSet<RowId>
where
    I: IntoIterator<Item = RowId>,
{
    let by_id: BTreeMap<RowId, &Row> = rows.iter().map(|row| (row.id, row)).collect();

    // One index per edge: referenced value -> rows holding it.
    let indexes: Vec<(&str, HashMap<&str, Vec<RowId>>)> = self_edges
        .iter()
        .flat_map(|edge| {
            let source = edge.source().column.as_str();
            edge.targets().iter().map(move |target| {
                let mut index: HashMap<&str, Vec<RowId>> = HashMap::new();
                for row in rows {
                    if let Some(value) = row.get(&target.column) {
                        index.entry(value).or_default().push(row.id);
                    }
                }
                (source, index)
            })
        })
        .collect();

    let mut kept = BTreeSet::new();
    let mut pending: Vec<RowId> = seeds.into_iter().collect();
    while let Some(id) = pending.pop() {
        if !kept.insert(id) {
            continue;
        }
        let Some(row) = by_id.get(&id) else {
            continue;
        };
        for (source, index) in &indexes {
            if let Some(ancestors) = row.get(source).and_then(|value| index.get(value)) {
                pending.extend(ancestors.iter().filter(|a| !kept.contains(a)));
            }
        }
    }
    kept
}

/// Rows of `rows` whose referenced column holds a value some referrer uses.
///
/// Referrers whose column is absent from the store keep nothing alive.
pub async fn referenced_ids<S>(
    store: &S,
    layout: &StoreLayout,
    rows: &[Row],
    referrers: &[Referrer],
) -> StoreResult<BTreeSet<RowId>>
where
    S: Store + ?Sized,
{
    let mut referenced = BTreeSet::new();
    for referrer in referrers {
        if !layout.has_column(&referrer.source) {
            continue;
        }
        let values = store
            .values(&referrer.source.entity, &referrer.source.column)
            .await?;
        referenced.extend(
            rows.iter()
                .filter(|row| {
                    row.get(&referrer.target_column)
                        .is_some_and(|value| values.contains(value))
                })
                .map(|row| row.id),
        );
    }
    Ok(referenced)
}

/// Rows that were referenced when a prune started, per released entity.
///
/// Rows outside the baseline were never kept alive by a reference, so a
/// release step leaves them alone: a prune only removes rows it orphaned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    referenced: BTreeMap<String, BTreeSet<RowId>>,
}

impl Baseline {
    /// Captures the baseline for every release step of `plan`.
    pub async fn capture<S>(store: &S, schema: &SchemaGraph, plan: &CascadePlan) -> StoreResult<Self>
    where
        S: Store + ?Sized,
    {
        let layout = store.layout().await?;
        let mut referenced = BTreeMap::new();
        for step in plan.steps() {
            let Step::Release { entity, referrers } = step else {
                continue;
            };
            if !layout.has_entity(entity) {
                continue;
            }
            let rows = store.scan(entity, &Filter::All).await?;
            let seeds = referenced_ids(store, &layout, &rows, referrers).await?;
            let self_edges: Vec<&ForeignKey> = schema.self_edges(entity).collect();
            referenced.insert(entity.clone(), ancestor_closure(&rows, seeds, &self_edges));
        }
        Ok(Self { referenced })
    }

    /// Whether `id` of `entity` was referenced at capture time.
    pub fn contains(&self, entity: &str, id: RowId) -> bool {
        self.referenced
            .get(entity)
            .is_some_and(|ids| ids.contains(&id))
    }

    pub fn referenced_count(&self, entity: &str) -> usize {
        self.referenced.get(entity).map_or(0, BTreeSet::len)
    }
}
