//! Declarative relational schema and the foreign-key graph it induces.
//!
//! A [`SchemaGraph`] is built once from entity declarations and never
//! mutated afterwards. Construction resolves every foreign-key target
//! against the declared entities and fails fast with
//! [`FeedError::SchemaConfiguration`] when something does not resolve: a
//! broken schema is a configuration error, not a data error.
//!
//! ```rust
//! use feed_guard::schema::{EntityBuilder, Presence, SchemaGraph};
//!
//! let schema = SchemaGraph::builder()
//!     .entity(
//!         EntityBuilder::new("routes", ["route_id"])
//!             .column("route_id", "Unique ID", Presence::Required),
//!     )
//!     .entity(
//!         EntityBuilder::new("trips", ["trip_id"])
//!             .column("trip_id", "Unique ID", Presence::Required)
//!             .references("route_id", "Foreign ID", Presence::Required, ("routes", "route_id")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.edges_from("trips").count(), 1);
//! assert!(schema.entity("shapes").is_err());
//! ```

pub mod gtfs;

use crate::error::{FeedError, Result};
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How strongly a column is expected to be present.
///
/// Informational only: presence is never enforced by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    ConditionallyRequired,
    ConditionallyForbidden,
    Recommended,
    Optional,
}

/// A column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Free-text type description, e.g. "Unique ID" or "Latitude"
    pub description: String,
    pub presence: Presence,
}

/// A qualified `(entity, column)` reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub entity: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.column)
    }
}

impl<E: Into<String>, C: Into<String>> From<(E, C)> for ColumnRef {
    fn from((entity, column): (E, C)) -> Self {
        Self::new(entity, column)
    }
}

/// A foreign-key edge from a source column to one or more target columns.
///
/// The variants are explicit so that every consumer handles each kind of
/// edge exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForeignKey {
    /// Values must appear in a single column of another entity.
    Direct { source: ColumnRef, target: ColumnRef },
    /// Values must appear in at least one of two or more alternative columns.
    AnyOf {
        source: ColumnRef,
        targets: Vec<ColumnRef>,
    },
    /// Values must appear in another column of the same entity (parent/child).
    SelfRef { source: ColumnRef, target: ColumnRef },
}

impl ForeignKey {
    /// The referencing column.
    pub fn source(&self) -> &ColumnRef {
        match self {
            Self::Direct { source, .. } | Self::AnyOf { source, .. } | Self::SelfRef { source, .. } => {
                source
            }
        }
    }

    /// The alternative target columns; a value is valid if it matches any of them.
    pub fn targets(&self) -> &[ColumnRef] {
        match self {
            Self::Direct { target, .. } | Self::SelfRef { target, .. } => std::slice::from_ref(target),
            Self::AnyOf { targets, .. } => targets,
        }
    }

    pub fn is_self_ref(&self) -> bool {
        matches!(self, Self::SelfRef { .. })
    }

    /// Whether `entity` is one of this edge's target entities.
    pub fn targets_entity(&self, entity: &str) -> bool {
        self.targets().iter().any(|t| t.entity == entity)
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets = self
            .targets()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        write!(f, "{} -> {targets}", self.source())
    }
}

/// An entity (table) with its primary key and columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub primary_key: Vec<String>,
    pub columns: Vec<Column>,
}

impl Entity {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// The immutable schema graph: entities plus resolved foreign-key edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaGraph {
    entities: BTreeMap<String, Entity>,
    /// Sorted by source entity, then source column.
    edges: Vec<ForeignKey>,
}

impl SchemaGraph {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Builds the GTFS schema.
    pub fn gtfs() -> Result<Self> {
        gtfs::schema()
    }

    /// All entities, ordered by name.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Looks up an entity by name.
    pub fn entity(&self, name: &str) -> Result<&Entity> {
        self.get(name)
            .ok_or_else(|| FeedError::EntityNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Every edge, ordered by source entity then source column.
    pub fn edges(&self) -> &[ForeignKey] {
        &self.edges
    }

    /// Edges originating from `entity`, ordered by source column.
    pub fn edges_from<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.edges.iter().filter(move |e| e.source().entity == entity)
    }

    /// Edges with at least one alternative target in `entity`, self edges included.
    pub fn edges_into<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.edges.iter().filter(move |e| e.targets_entity(entity))
    }

    /// Self-referential edges of `entity`.
    pub fn self_edges<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.edges_from(entity).filter(|e| e.is_self_ref())
    }

    /// Entities linked to `entity` by an edge in either direction, self excluded.
    pub fn neighbors(&self, entity: &str) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        for edge in &self.edges {
            let source = edge.source().entity.as_str();
            for target in edge.targets() {
                let target = target.entity.as_str();
                if source == target {
                    continue;
                }
                if source == entity {
                    out.insert(target);
                } else if target == entity {
                    out.insert(source);
                }
            }
        }
        out
    }
}

/// Declaration of a single entity, consumed by [`SchemaBuilder`].
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: String,
    primary_key: Vec<String>,
    columns: Vec<Column>,
    references: Vec<PendingReference>,
}

#[derive(Debug, Clone)]
struct PendingReference {
    column: String,
    targets: Vec<ColumnRef>,
    any_of: bool,
}

impl EntityBuilder {
    pub fn new<I, S>(name: impl Into<String>, primary_key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            columns: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Declares a plain column.
    pub fn column(mut self, name: &str, description: &str, presence: Presence) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            description: description.to_string(),
            presence,
        });
        self
    }

    /// Declares a column referencing a single target column.
    pub fn references(
        mut self,
        name: &str,
        description: &str,
        presence: Presence,
        target: impl Into<ColumnRef>,
    ) -> Self {
        self = self.column(name, description, presence);
        self.references.push(PendingReference {
            column: name.to_string(),
            targets: vec![target.into()],
            any_of: false,
        });
        self
    }

    /// Declares a column satisfied by matching any one of several targets.
    pub fn references_any_of<I>(
        mut self,
        name: &str,
        description: &str,
        presence: Presence,
        targets: I,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef>,
    {
        self = self.column(name, description, presence);
        self.references.push(PendingReference {
            column: name.to_string(),
            targets: targets.into_iter().map(Into::into).collect(),
            any_of: true,
        });
        self
    }
}

/// Collects entity declarations and resolves them into a [`SchemaGraph`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityBuilder>,
}

impl SchemaBuilder {
    pub fn entity(mut self, entity: EntityBuilder) -> Self {
        self.entities.push(entity);
        self
    }

    /// Resolves every declaration, failing on the first inconsistency.
    pub fn build(self) -> Result<SchemaGraph> {
        let mut entities = BTreeMap::new();
        let mut pending = Vec::new();

        for decl in self.entities {
            check_identifier(&decl.name)?;
            let mut seen = BTreeSet::new();
            for column in &decl.columns {
                check_identifier(&column.name)?;
                if !seen.insert(column.name.as_str()) {
                    return Err(FeedError::schema(format!(
                        "column '{}' declared twice on entity '{}'",
                        column.name, decl.name
                    )));
                }
            }
            for key in &decl.primary_key {
                if !seen.contains(key.as_str()) {
                    return Err(FeedError::schema(format!(
                        "primary key column '{key}' is not declared on entity '{}'",
                        decl.name
                    )));
                }
            }

            for PendingReference {
                column,
                targets,
                any_of,
            } in decl.references
            {
                pending.push((ColumnRef::new(decl.name.clone(), column), targets, any_of));
            }

            let entity = Entity {
                name: decl.name.clone(),
                primary_key: decl.primary_key,
                columns: decl.columns,
            };
            if entities.insert(decl.name.clone(), entity).is_some() {
                return Err(FeedError::schema(format!(
                    "entity '{}' declared twice",
                    decl.name
                )));
            }
        }

        let mut edges = pending
            .into_iter()
            .map(|(source, targets, any_of)| resolve_edge(&entities, source, targets, any_of))
            .collect::<Result<Vec<_>>>()?;
        edges.sort_by(|a, b| a.source().cmp(b.source()));

        Ok(SchemaGraph { entities, edges })
    }
}

fn check_identifier(name: &str) -> Result<()> {
    SqlSecurity::validate_identifier(name).map_err(|e| FeedError::schema(e.to_string()))
}

fn resolve_edge(
    entities: &BTreeMap<String, Entity>,
    source: ColumnRef,
    targets: Vec<ColumnRef>,
    any_of: bool,
) -> Result<ForeignKey> {
    let mut alternatives: Vec<ColumnRef> = Vec::with_capacity(targets.len());
    for target in targets {
        let entity = entities.get(&target.entity).ok_or_else(|| {
            FeedError::schema(format!(
                "edge {source} targets unknown entity '{}'",
                target.entity
            ))
        })?;
        if !entity.has_column(&target.column) {
            return Err(FeedError::schema(format!(
                "edge {source} targets unknown column {target}"
            )));
        }
        if !alternatives.contains(&target) {
            alternatives.push(target);
        }
    }

    if any_of && alternatives.len() < 2 {
        return Err(FeedError::schema(format!(
            "any-of edge {source} needs at least two distinct alternatives"
        )));
    }

    match alternatives.len() {
        0 => Err(FeedError::schema(format!("edge {source} has no target"))),
        1 => {
            let target = alternatives.remove(0);
            if target.entity == source.entity {
                if target.column == source.column {
                    return Err(FeedError::schema(format!(
                        "edge {source} references itself"
                    )));
                }
                Ok(ForeignKey::SelfRef { source, target })
            } else {
                Ok(ForeignKey::Direct { source, target })
            }
        }
        _ => {
            if alternatives.iter().any(|t| t.entity == source.entity) {
                return Err(FeedError::schema(format!(
                    "any-of edge {source} cannot name its own entity as an alternative"
                )));
            }
            Ok(ForeignKey::AnyOf {
                source,
                targets: alternatives,
            })
        }
    }
}
