//! In-memory store adapter.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

use crate::error::{StoreError, StoreResult};
use crate::schema::{ColumnRef, SchemaGraph};

use super::{Filter, Row, RowId, Store};

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<String>,
    rows: BTreeMap<RowId, Vec<Option<String>>>,
    next_id: i64,
}

impl Table {
    fn position(&self, entity: &str, column: &str) -> StoreResult<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| StoreError::UnknownColumn {
                entity: entity.to_string(),
                column: column.to_string(),
            })
    }

    fn row(&self, id: RowId, values: &[Option<String>]) -> Row {
        Row {
            id,
            values: self.columns.iter().cloned().zip(values.iter().cloned()).collect(),
        }
    }
}

/// A store held entirely in memory.
///
/// Row identities are assigned per entity starting at 1 and never reused.
/// Every successful deletion is appended to a journal, which makes the order
/// of a cascade observable.
///
/// `MemoryStore` is `Clone`: callers that need to keep the original data
/// around can prune or repair a copy.
///
/// # Example
///
/// ```rust
/// use feed_guard::store::{Filter, MemoryStore, Store};
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut store = MemoryStore::new();
/// store.declare_entity("levels", &["level_id", "level_name"]).await.unwrap();
/// let id = store.insert("levels", &[("level_id", "L1"), ("level_name", "")]).await.unwrap();
///
/// let rows = store.scan("levels", &Filter::not_null("level_name")).await.unwrap();
/// assert!(rows.is_empty());
///
/// store.delete_by_identity("levels", id).await.unwrap();
/// assert_eq!(store.deletions(), &[("levels".to_string(), id)]);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
    journal: Vec<(String, RowId)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with every entity of `schema` declared.
    pub async fn with_schema(schema: &SchemaGraph) -> StoreResult<Self> {
        let mut store = Self::new();
        store.declare_schema(schema).await?;
        Ok(store)
    }

    /// Number of rows in `entity`, zero if it is not declared.
    pub fn row_count(&self, entity: &str) -> usize {
        self.tables.get(entity).map_or(0, |t| t.rows.len())
    }

    /// Total number of rows across all entities.
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|t| t.rows.len()).sum()
    }

    /// Whether `entity` still holds the row `id`.
    pub fn contains(&self, entity: &str, id: RowId) -> bool {
        self.tables
            .get(entity)
            .is_some_and(|t| t.rows.contains_key(&id))
    }

    /// Every deletion so far, in the order it was applied.
    pub fn deletions(&self) -> &[(String, RowId)] {
        &self.journal
    }

    /// Clears the deletion journal.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    fn table(&self, entity: &str) -> StoreResult<&Table> {
        self.tables
            .get(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }

    fn table_mut(&mut self, entity: &str) -> StoreResult<&mut Table> {
        self.tables
            .get_mut(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }

    fn column_values(&self, target: &ColumnRef) -> StoreResult<BTreeSet<&str>> {
        let table = self.table(&target.entity)?;
        let idx = table.position(&target.entity, &target.column)?;
        Ok(table
            .rows
            .values()
            .filter_map(|values| values[idx].as_deref())
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn entities(&self) -> StoreResult<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn columns(&self, entity: &str) -> StoreResult<Vec<String>> {
        Ok(self.table(entity)?.columns.clone())
    }

    async fn scan(&self, entity: &str, filter: &Filter) -> StoreResult<Vec<Row>> {
        let table = self.table(entity)?;
        let rows = match filter {
            Filter::All => table
                .rows
                .iter()
                .map(|(id, values)| table.row(*id, values))
                .collect(),
            Filter::NotNull(column) => {
                let idx = table.position(entity, column)?;
                table
                    .rows
                    .iter()
                    .filter(|(_, values)| values[idx].is_some())
                    .map(|(id, values)| table.row(*id, values))
                    .collect()
            }
            Filter::Dangling { column, targets } => {
                let idx = table.position(entity, column)?;
                let mut known = BTreeSet::new();
                for target in targets {
                    known.extend(self.column_values(target)?);
                }
                table
                    .rows
                    .iter()
                    .filter(|(_, values)| {
                        values[idx]
                            .as_deref()
                            .is_some_and(|value| !known.contains(value))
                    })
                    .map(|(id, values)| table.row(*id, values))
                    .collect()
            }
        };
        Ok(rows)
    }

    async fn values(&self, entity: &str, column: &str) -> StoreResult<BTreeSet<String>> {
        let target = ColumnRef::new(entity, column);
        Ok(self
            .column_values(&target)?
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    async fn insert(&mut self, entity: &str, values: &[(&str, &str)]) -> StoreResult<RowId> {
        let table = self.table_mut(entity)?;
        let mut row = vec![None; table.columns.len()];
        for (column, value) in values {
            let idx = table.position(entity, column)?;
            row[idx] = (!value.is_empty()).then(|| value.to_string());
        }
        table.next_id += 1;
        let id = RowId(table.next_id);
        table.rows.insert(id, row);
        Ok(id)
    }

    #[instrument(skip(self), level = "trace")]
    async fn delete_by_identity(&mut self, entity: &str, id: RowId) -> StoreResult<()> {
        let table = self.table_mut(entity)?;
        if table.rows.remove(&id).is_none() {
            return Err(StoreError::MissingRow {
                entity: entity.to_string(),
                id,
            });
        }
        self.journal.push((entity.to_string(), id));
        Ok(())
    }

    async fn declare_entity(&mut self, entity: &str, columns: &[&str]) -> StoreResult<()> {
        if self.tables.contains_key(entity) {
            return Err(StoreError::EntityExists(entity.to_string()));
        }
        if columns.is_empty() {
            return Err(StoreError::EmptyEntity(entity.to_string()));
        }
        let table = Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Table::default()
        };
        self.tables.insert(entity.to_string(), table);
        Ok(())
    }

    async fn declare_column(&mut self, entity: &str, column: &str) -> StoreResult<()> {
        let table = self.table_mut(entity)?;
        if !table.columns.iter().any(|c| c == column) {
            table.columns.push(column.to_string());
            for values in table.rows.values_mut() {
                values.push(None);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stops_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .declare_entity("stops", &["stop_id", "parent_station"])
            .await
            .unwrap();
        store
            .insert("stops", &[("stop_id", "P"), ("parent_station", "")])
            .await
            .unwrap();
        store
            .insert("stops", &[("stop_id", "S1"), ("parent_station", "P")])
            .await
            .unwrap();
        store
            .insert("stops", &[("stop_id", "S2"), ("parent_station", "GONE")])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_stores_empty_as_null() {
        let store = stops_store().await;
        let rows = store.scan("stops", &Filter::All).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("parent_station"), None);
        assert_eq!(rows[1].get("parent_station"), Some("P"));
        assert_eq!(rows[0].id, RowId(1));
    }

    #[tokio::test]
    async fn test_dangling_filter() {
        let store = stops_store().await;
        let filter = Filter::dangling("parent_station", vec![ColumnRef::new("stops", "stop_id")]);
        let rows = store.scan("stops", &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("stop_id"), Some("S2"));
    }

    #[tokio::test]
    async fn test_values_are_distinct_and_non_null() {
        let store = stops_store().await;
        let values = store.values("stops", "parent_station").await.unwrap();
        assert_eq!(
            values.into_iter().collect::<Vec<_>>(),
            vec!["GONE".to_string(), "P".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_by_identity() {
        let mut store = stops_store().await;
        store.delete_by_identity("stops", RowId(2)).await.unwrap();
        assert!(!store.contains("stops", RowId(2)));
        assert_eq!(store.row_count("stops"), 2);
        assert_eq!(store.deletions(), &[("stops".to_string(), RowId(2))]);

        let err = store.delete_by_identity("stops", RowId(2)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { id: RowId(2), .. }));
        assert_eq!(store.deletions().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let mut store = stops_store().await;
        store.delete_by_identity("stops", RowId(3)).await.unwrap();
        let id = store.insert("stops", &[("stop_id", "S3")]).await.unwrap();
        assert_eq!(id, RowId(4));
    }

    #[tokio::test]
    async fn test_declarations() {
        let mut store = stops_store().await;
        assert!(matches!(
            store.declare_entity("stops", &["stop_id"]).await,
            Err(StoreError::EntityExists(_))
        ));
        assert!(matches!(
            store.declare_entity("levels", &[]).await,
            Err(StoreError::EmptyEntity(_))
        ));
        assert!(matches!(
            store.insert("stops", &[("stop_lat", "1.0")]).await,
            Err(StoreError::UnknownColumn { .. })
        ));

        store.declare_column("stops", "stop_lat").await.unwrap();
        store.declare_column("stops", "stop_lat").await.unwrap();
        assert_eq!(
            store.columns("stops").await.unwrap(),
            vec!["stop_id", "parent_station", "stop_lat"]
        );
        let rows = store.scan("stops", &Filter::All).await.unwrap();
        assert_eq!(rows[0].values.len(), 3);
        assert_eq!(rows[0].get("stop_lat"), None);

        assert!(matches!(
            store.scan("levels", &Filter::All).await,
            Err(StoreError::UnknownEntity(_))
        ));
    }

    #[tokio::test]
    async fn test_clone_is_independent() {
        let mut store = stops_store().await;
        let copy = store.clone();
        store.delete_by_identity("stops", RowId(1)).await.unwrap();
        assert_eq!(copy.row_count("stops"), 3);
        assert_eq!(store.row_count("stops"), 2);
    }
}
