//! Store adapters: the persistence seam of the validator and pruner.
//!
//! A [`Store`] exposes rows of text values keyed by a stable [`RowId`]. It
//! supports full and filtered scans, delete-by-identity and on-demand
//! declaration of entities and columns. Two adapters are provided:
//!
//! - [`MemoryStore`]: an in-process store that journals every deletion
//! - [`SqliteStore`]: a SQLite database file accessed through `rusqlite`
//!
//! A store instance must not be shared by two concurrent validate or prune
//! calls. Independent stores can be processed in parallel (see
//! [`crate::batch`]).

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use crate::schema::{ColumnRef, ForeignKey, SchemaGraph};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable identity of a row within its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row as returned by [`Store::scan`], values in declared column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub values: Vec<(String, Option<String>)>,
}

impl Row {
    /// The non-null value of `column`, if any.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Every non-null `(column, value)` pair, in column order.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
    }
}

/// Row selection for [`Store::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Rows whose column holds a value.
    NotNull(String),
    /// Rows whose column holds a value found in none of the target columns.
    ///
    /// Nulls in the target columns never match anything.
    Dangling {
        column: String,
        targets: Vec<ColumnRef>,
    },
}

impl Filter {
    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull(column.into())
    }

    pub fn dangling(column: impl Into<String>, targets: impl Into<Vec<ColumnRef>>) -> Self {
        Self::Dangling {
            column: column.into(),
            targets: targets.into(),
        }
    }
}

/// The store adapter contract.
#[async_trait]
pub trait Store: Send + Sync {
    /// Declared entities, ordered by name.
    async fn entities(&self) -> StoreResult<Vec<String>>;

    /// Declared columns of `entity`, in declaration order.
    async fn columns(&self, entity: &str) -> StoreResult<Vec<String>>;

    /// Rows of `entity` selected by `filter`, ordered by identity.
    async fn scan(&self, entity: &str, filter: &Filter) -> StoreResult<Vec<Row>>;

    /// Distinct non-null values of `entity.column`.
    async fn values(&self, entity: &str, column: &str) -> StoreResult<BTreeSet<String>> {
        let rows = self.scan(entity, &Filter::not_null(column)).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(str::to_string)
            .collect())
    }

    /// Inserts a row. Unlisted columns and empty strings are stored as null.
    async fn insert(&mut self, entity: &str, values: &[(&str, &str)]) -> StoreResult<RowId>;

    /// Deletes one row; fails with `MissingRow` if the identity is gone.
    async fn delete_by_identity(&mut self, entity: &str, id: RowId) -> StoreResult<()>;

    /// Declares a new entity with the given columns.
    async fn declare_entity(&mut self, entity: &str, columns: &[&str]) -> StoreResult<()>;

    /// Adds a column to an existing entity. Existing rows hold null in it.
    async fn declare_column(&mut self, entity: &str, column: &str) -> StoreResult<()>;

    /// Declares every entity of `schema`, adding missing columns to entities
    /// that already exist.
    async fn declare_schema(&mut self, schema: &SchemaGraph) -> StoreResult<()> {
        let existing: BTreeSet<String> = self.entities().await?.into_iter().collect();
        for entity in schema.entities() {
            if existing.contains(&entity.name) {
                let present: BTreeSet<String> =
                    self.columns(&entity.name).await?.into_iter().collect();
                for column in entity.column_names() {
                    if !present.contains(column) {
                        self.declare_column(&entity.name, column).await?;
                    }
                }
            } else {
                let columns: Vec<&str> = entity.column_names().collect();
                self.declare_entity(&entity.name, &columns).await?;
            }
        }
        Ok(())
    }

    /// Snapshot of the declared entities and their columns.
    async fn layout(&self) -> StoreResult<StoreLayout> {
        let mut entities = BTreeMap::new();
        for entity in self.entities().await? {
            let columns = self.columns(&entity).await?.into_iter().collect();
            entities.insert(entity, columns);
        }
        Ok(StoreLayout { entities })
    }
}

/// Which entities and columns a store actually holds.
///
/// Data sets rarely carry every optional entity. An edge whose source is
/// absent has nothing to check, and an absent target contributes no values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreLayout {
    entities: BTreeMap<String, BTreeSet<String>>,
}

impl StoreLayout {
    pub fn has_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn has_column(&self, column: &ColumnRef) -> bool {
        self.entities
            .get(&column.entity)
            .is_some_and(|columns| columns.contains(&column.column))
    }

    /// Whether the edge's source column is present.
    pub fn has_source(&self, edge: &ForeignKey) -> bool {
        self.has_column(edge.source())
    }

    /// The edge's alternatives that are present in the store.
    pub fn present_targets(&self, edge: &ForeignKey) -> Vec<ColumnRef> {
        edge.targets()
            .iter()
            .filter(|target| self.has_column(target))
            .cloned()
            .collect()
    }

    /// Row filter selecting the rows of the edge's source that dangle.
    pub fn dangling_filter(&self, edge: &ForeignKey) -> Filter {
        let column = edge.source().column.clone();
        let targets = self.present_targets(edge);
        if targets.is_empty() {
            Filter::NotNull(column)
        } else {
            Filter::Dangling { column, targets }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityBuilder, Presence};

    fn row() -> Row {
        Row {
            id: RowId(7),
            values: vec![
                ("stop_id".to_string(), Some("S1".to_string())),
                ("stop_name".to_string(), None),
                ("parent_station".to_string(), Some("P1".to_string())),
            ],
        }
    }

    #[test]
    fn test_row_accessors() {
        let row = row();
        assert_eq!(row.get("stop_id"), Some("S1"));
        assert_eq!(row.get("stop_name"), None);
        assert_eq!(row.get("missing"), None);
        let pairs: Vec<_> = row.non_empty().collect();
        assert_eq!(pairs, vec![("stop_id", "S1"), ("parent_station", "P1")]);
        assert_eq!(row.id.to_string(), "7");
    }

    #[tokio::test]
    async fn test_layout_filters() {
        let schema = SchemaGraph::builder()
            .entity(
                EntityBuilder::new("calendar", ["service_id"]).column(
                    "service_id",
                    "ID",
                    Presence::Required,
                ),
            )
            .entity(
                EntityBuilder::new("calendar_dates", ["service_id"]).column(
                    "service_id",
                    "ID",
                    Presence::Required,
                ),
            )
            .entity(
                EntityBuilder::new("trips", ["trip_id"])
                    .column("trip_id", "ID", Presence::Required)
                    .references_any_of(
                        "service_id",
                        "Foreign ID",
                        Presence::Required,
                        [("calendar", "service_id"), ("calendar_dates", "service_id")],
                    ),
            )
            .build()
            .unwrap();

        let mut store = MemoryStore::new();
        store
            .declare_entity("trips", &["trip_id", "service_id"])
            .await
            .unwrap();
        store.declare_entity("calendar", &["service_id"]).await.unwrap();

        let layout = store.layout().await.unwrap();
        let edge = &schema.edges()[0];
        assert!(layout.has_source(edge));
        assert!(layout.has_entity("calendar"));
        assert!(!layout.has_entity("calendar_dates"));
        assert_eq!(
            layout.dangling_filter(edge),
            Filter::dangling("service_id", vec![ColumnRef::new("calendar", "service_id")])
        );

        let empty = StoreLayout::default();
        assert_eq!(
            empty.dangling_filter(edge),
            Filter::not_null("service_id")
        );
    }

    #[tokio::test]
    async fn test_declare_schema_adds_missing_columns() {
        let schema = crate::schema::gtfs::schema().unwrap();
        let mut store = MemoryStore::new();
        store.declare_entity("levels", &["level_id"]).await.unwrap();
        store.declare_schema(&schema).await.unwrap();

        assert_eq!(store.entities().await.unwrap().len(), 29);
        assert_eq!(
            store.columns("levels").await.unwrap(),
            vec!["level_id", "level_index", "level_name"]
        );
    }
}
