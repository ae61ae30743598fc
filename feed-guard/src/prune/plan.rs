//! Deletion order for a cascading prune, derived from the foreign-key graph.
//!
//! Entities are visited breadth-first from the anchor over the undirected
//! foreign-key graph. Within one level, an entity that references another
//! entity of the same level is visited first, so that the referenced entity
//! sees the referrer's deletions. Each visited entity contributes steps:
//!
//! - **Detach**: delete rows whose reference into already-visited entities no
//!   longer resolves. Edges with a target not visited yet are deferred until
//!   their last target has been visited.
//! - **Release**: delete rows that were referenced by already-visited entities
//!   when the prune started and are not referenced anymore.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use tracing::debug;

use crate::error::Result;
use crate::schema::{ColumnRef, ForeignKey, SchemaGraph};

/// A column whose values keep rows of the released entity alive.
///
/// Alternatives of an any-of edge count only when they name a primary-key
/// column of the released entity. `fare_leg_rules.network_id` may match
/// `routes.network_id`, but it names a network, not a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Referrer {
    /// The referencing column
    pub source: ColumnRef,
    /// The referenced column of the released entity
    pub target_column: String,
}

/// One unit of work in a [`CascadePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Delete anchor rows rejected by the keep predicate.
    Anchor { entity: String },
    /// Delete source rows whose reference no longer resolves.
    Detach { edge: ForeignKey },
    /// Delete rows no longer referenced through `referrers`.
    Release {
        entity: String,
        referrers: Vec<Referrer>,
    },
}

impl Step {
    /// The entity whose rows this step deletes.
    pub fn entity(&self) -> &str {
        match self {
            Step::Anchor { entity } | Step::Release { entity, .. } => entity,
            Step::Detach { edge } => &edge.source().entity,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Anchor { entity } => write!(f, "anchor {entity}"),
            Step::Detach { edge } => write!(f, "detach {edge}"),
            Step::Release { entity, referrers } => {
                let sources = referrers
                    .iter()
                    .map(|r| r.source.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "release {entity} [{sources}]")
            }
        }
    }
}

/// The ordered steps of a prune anchored on one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePlan {
    anchor: String,
    order: Vec<String>,
    steps: Vec<Step>,
    cycles: Vec<Vec<String>>,
}

impl CascadePlan {
    /// Derives the plan for pruning `anchor`.
    ///
    /// Fails with [`EntityNotFound`](crate::error::FeedError::EntityNotFound)
    /// if the anchor is not part of the schema. Entities not connected to the
    /// anchor are left out of the plan.
    pub fn build(schema: &SchemaGraph, anchor: &str) -> Result<Self> {
        schema.entity(anchor)?;

        let mut order = Vec::new();
        let mut cycles = Vec::new();
        for level in levels(schema, anchor) {
            order_level(schema, level, &mut order, &mut cycles);
        }
        for cycle in &cycles {
            debug!(entities = ?cycle, "Broke foreign key cycle by entity name");
        }

        // Anchor rows with a dangling reference go before the keep predicate
        // runs, so the ancestors it retains are never orphaned afterwards.
        let mut steps: Vec<Step> = schema
            .edges_from(anchor)
            .map(|edge| Step::Detach { edge: edge.clone() })
            .collect();
        steps.push(Step::Anchor {
            entity: anchor.to_string(),
        });

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut deferred: Vec<&ForeignKey> = Vec::new();
        for entity in &order {
            visited.insert(entity);

            for edge in schema.edges_from(entity) {
                if entity == anchor && edge.is_self_ref() {
                    continue;
                }
                if targets_visited(edge, &visited) && entity != anchor {
                    steps.push(Step::Detach { edge: edge.clone() });
                } else if !edge.is_self_ref() {
                    deferred.push(edge);
                }
            }

            let referrers = referrers(schema, entity, &visited);
            if !referrers.is_empty() {
                steps.push(Step::Release {
                    entity: entity.clone(),
                    referrers,
                });
            }

            deferred.retain(|edge| {
                if targets_visited(edge, &visited) {
                    steps.push(Step::Detach {
                        edge: (*edge).clone(),
                    });
                    false
                } else {
                    true
                }
            });
        }

        Ok(Self {
            anchor: anchor.to_string(),
            order,
            steps,
            cycles,
        })
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    /// Entities in visiting order, anchor first.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Entity groups whose mutual references had to be ordered by name.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Entities with a release step.
    pub fn released_entities(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            Step::Release { entity, .. } => Some(entity.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for CascadePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "{:>3}. {step}", i + 1)?;
        }
        Ok(())
    }
}

fn targets_visited(edge: &ForeignKey, visited: &BTreeSet<&str>) -> bool {
    edge.targets()
        .iter()
        .all(|t| visited.contains(t.entity.as_str()))
}

/// Incoming references into `entity` from other, already visited entities.
fn referrers(schema: &SchemaGraph, entity: &str, visited: &BTreeSet<&str>) -> Vec<Referrer> {
    let key = schema.get(entity).map_or(&[][..], |e| e.primary_key.as_slice());
    let mut out = Vec::new();
    for edge in schema.edges_into(entity) {
        let source = edge.source();
        if source.entity == entity || !visited.contains(source.entity.as_str()) {
            continue;
        }
        let any_of = matches!(edge, ForeignKey::AnyOf { .. });
        for target in edge
            .targets()
            .iter()
            .filter(|t| t.entity == entity && (!any_of || key.contains(&t.column)))
        {
            out.push(Referrer {
                source: source.clone(),
                target_column: target.column.clone(),
            });
        }
    }
    out
}

/// Breadth-first levels from the anchor, each sorted by name.
fn levels<'a>(schema: &'a SchemaGraph, anchor: &'a str) -> Vec<Vec<&'a str>> {
    let mut level_of: BTreeMap<&str, usize> = BTreeMap::new();
    let mut levels: Vec<Vec<&str>> = Vec::new();
    let mut queue = VecDeque::new();

    level_of.insert(anchor, 0);
    queue.push_back(anchor);
    while let Some(entity) = queue.pop_front() {
        let level = level_of[entity];
        if levels.len() <= level {
            levels.push(Vec::new());
        }
        levels[level].push(entity);
        for neighbor in schema.neighbors(entity) {
            if !level_of.contains_key(neighbor) {
                level_of.insert(neighbor, level + 1);
                queue.push_back(neighbor);
            }
        }
    }

    for level in &mut levels {
        level.sort_unstable();
    }
    levels
}

/// Appends one level to `order`, referrers before the entities they reference.
fn order_level(
    schema: &SchemaGraph,
    level: Vec<&str>,
    order: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    let members: BTreeSet<&str> = level.into_iter().collect();
    let mut referenced_by: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in schema.edges() {
        let source = edge.source().entity.as_str();
        if !members.contains(source) {
            continue;
        }
        for target in edge.targets() {
            let target = target.entity.as_str();
            if target != source && members.contains(target) {
                referenced_by.entry(target).or_default().insert(source);
            }
        }
    }

    let mut remaining = members;
    while !remaining.is_empty() {
        let ready = remaining.iter().copied().find(|entity| {
            referenced_by
                .get(entity)
                .map_or(true, |sources| sources.is_disjoint(&remaining))
        });
        let next = match ready {
            Some(entity) => entity,
            None => {
                cycles.push(remaining.iter().map(|e| e.to_string()).collect());
                match remaining.first() {
                    Some(entity) => *entity,
                    None => break,
                }
            }
        };
        remaining.remove(next);
        order.push(next.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityBuilder, Presence};
    use crate::test_fixtures::gtfs_schema;

    fn position(plan: &CascadePlan, entity: &str) -> usize {
        plan.order().iter().position(|e| e == entity).unwrap()
    }

    #[test]
    fn test_unknown_anchor() {
        let schema = gtfs_schema();
        assert!(CascadePlan::build(&schema, "stations").is_err());
    }

    #[test]
    fn test_gtfs_stop_order() {
        let schema = gtfs_schema();
        let plan = CascadePlan::build(&schema, "stops").unwrap();

        assert_eq!(plan.order()[0], "stops");
        assert!(position(&plan, "stop_times") < position(&plan, "trips"));
        assert!(position(&plan, "trips") < position(&plan, "routes"));
        assert!(position(&plan, "routes") < position(&plan, "agency"));
        assert!(position(&plan, "trips") < position(&plan, "calendar"));
        assert!(plan.cycles().is_empty());

        // Entities unrelated to stops stay out of the plan.
        assert!(!plan.order().iter().any(|e| e == "feed_info"));
        assert!(!plan.order().iter().any(|e| e == "translations"));
    }

    #[test]
    fn test_anchor_steps_come_first() {
        let schema = gtfs_schema();
        let plan = CascadePlan::build(&schema, "stops").unwrap();
        let steps: Vec<String> = plan.steps().iter().take(3).map(ToString::to_string).collect();
        assert_eq!(
            steps,
            vec![
                "detach stops.level_id -> levels.level_id",
                "detach stops.parent_station -> stops.stop_id",
                "anchor stops",
            ]
        );
    }

    #[test]
    fn test_any_of_detach_waits_for_all_alternatives() {
        let schema = gtfs_schema();
        let plan = CascadePlan::build(&schema, "stops").unwrap();
        let index_of = |pred: &dyn Fn(&Step) -> bool| plan.steps().iter().position(pred).unwrap();

        let detach = index_of(&|s| {
            matches!(s, Step::Detach { edge } if edge.source() == &ColumnRef::new("trips", "service_id"))
        });
        let calendar = index_of(&|s| matches!(s, Step::Release { entity, .. } if entity == "calendar"));
        let calendar_dates =
            index_of(&|s| matches!(s, Step::Release { entity, .. } if entity == "calendar_dates"));
        assert!(detach > calendar);
        assert!(detach > calendar_dates);
    }

    #[test]
    fn test_release_referrers() {
        let schema = gtfs_schema();
        let plan = CascadePlan::build(&schema, "stops").unwrap();
        let trips = plan
            .steps()
            .iter()
            .find_map(|s| match s {
                Step::Release { entity, referrers } if entity == "trips" => Some(referrers),
                _ => None,
            })
            .unwrap();
        let sources: Vec<String> = trips.iter().map(|r| r.source.to_string()).collect();
        assert_eq!(
            sources,
            vec![
                "stop_times.trip_id",
                "transfers.from_trip_id",
                "transfers.to_trip_id"
            ]
        );
        assert!(trips.iter().all(|r| r.target_column == "trip_id"));
        assert!(plan.released_entities().all(|e| e != "stops"));
    }

    #[test]
    fn test_detach_targets_are_planned() {
        let schema = gtfs_schema();
        let plan = CascadePlan::build(&schema, "stops").unwrap();
        for step in plan.steps() {
            if let Step::Detach { edge } = step {
                for target in edge.targets() {
                    assert!(plan.order().contains(&target.entity), "{step}");
                }
            }
        }
    }

    #[test]
    fn test_cycle_is_broken_by_name() {
        let schema = SchemaGraph::builder()
            .entity(EntityBuilder::new("root", ["id"]).column("id", "ID", Presence::Required))
            .entity(
                EntityBuilder::new("alpha", ["id"])
                    .column("id", "ID", Presence::Required)
                    .references("root_id", "Foreign ID", Presence::Required, ("root", "id"))
                    .references("beta_id", "Foreign ID", Presence::Optional, ("beta", "id")),
            )
            .entity(
                EntityBuilder::new("beta", ["id"])
                    .column("id", "ID", Presence::Required)
                    .references("root_id", "Foreign ID", Presence::Required, ("root", "id"))
                    .references("alpha_id", "Foreign ID", Presence::Optional, ("alpha", "id")),
            )
            .build()
            .unwrap();

        let plan = CascadePlan::build(&schema, "root").unwrap();
        assert_eq!(plan.order(), ["root", "alpha", "beta"]);
        assert_eq!(plan.cycles(), [vec!["alpha".to_string(), "beta".to_string()]]);
    }

    #[test]
    fn test_any_of_releases_only_through_key_columns() {
        let schema = SchemaGraph::builder()
            .entity(
                EntityBuilder::new("networks", ["network_id"])
                    .column("network_id", "ID", Presence::Required),
            )
            .entity(
                EntityBuilder::new("routes", ["route_id"])
                    .column("route_id", "ID", Presence::Required)
                    .column("network_id", "ID", Presence::Optional),
            )
            .entity(
                EntityBuilder::new("fare_leg_rules", ["leg_group_id"])
                    .column("leg_group_id", "ID", Presence::Required)
                    .references_any_of(
                        "network_id",
                        "Foreign ID",
                        Presence::Optional,
                        [("routes", "network_id"), ("networks", "network_id")],
                    ),
            )
            .build()
            .unwrap();

        let plan = CascadePlan::build(&schema, "fare_leg_rules").unwrap();
        assert_eq!(plan.order(), ["fare_leg_rules", "networks", "routes"]);
        let released: Vec<&str> = plan.released_entities().collect();
        assert_eq!(released, ["networks"]);
    }

    #[test]
    fn test_plan_display() {
        let schema = gtfs_schema();
        let plan = CascadePlan::build(&schema, "stops").unwrap();
        let text = plan.to_string();
        assert!(text.starts_with("  1. detach stops.level_id"));
        assert!(text.contains("release trips [stop_times.trip_id"));
    }
}
