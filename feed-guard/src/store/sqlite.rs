//! SQLite store adapter.
//!
//! Every entity is a table of `TEXT` columns; row identity is the SQLite
//! `rowid`. Entity and column names pass through [`SqlSecurity`] before they
//! are interpolated into a statement, values are always bound parameters.

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::schema::SchemaGraph;
use crate::security::SqlSecurity;

use super::{Filter, Row, RowId, Store};

/// A store backed by a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens an existing database for reading and writing.
    ///
    /// Fails with [`StoreError::Open`] if the file is missing or cannot be
    /// opened read-write.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened SQLite store");
        Ok(Self::from_connection(conn))
    }

    /// Creates an empty in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Creates a fresh database at `path` with every entity of `schema`
    /// declared, replacing any file already there.
    pub async fn create(path: impl AsRef<Path>, schema: &SchemaGraph) -> StoreResult<Self> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "Replaced existing database"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        let conn = Connection::open(path)?;
        // Bulk loads dominate; durability comes from re-running the import.
        conn.pragma_update(None, "synchronous", "OFF")?;
        let mut store = Self::from_connection(conn);
        store.declare_schema(schema).await?;
        Ok(store)
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Writes a consistent copy of the database to `path`.
    ///
    /// Pruning and repair have no rollback; callers that need the original
    /// data snapshot first and operate on one of the two copies.
    pub fn snapshot_to(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let target = path.to_str().ok_or_else(|| {
            StoreError::Security(format!("snapshot path is not UTF-8: {}", path.display()))
        })?;
        self.lock()?.execute("VACUUM INTO ?1", [target])?;
        Ok(())
    }

    /// Number of rows in `entity`.
    pub fn row_count(&self, entity: &str) -> StoreResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", SqlSecurity::escape_identifier(entity)?);
        let conn = self.lock()?;
        Self::require_entity(&conn, entity)?;
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn require_entity(conn: &Connection, entity: &str) -> StoreResult<()> {
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [entity],
                |row| row.get(0),
            )
            .optional()?;
        found
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }

    fn table_columns(conn: &Connection, entity: &str) -> StoreResult<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([entity], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(StoreError::UnknownEntity(entity.to_string()));
        }
        Ok(columns)
    }

    fn require_column(columns: &[String], entity: &str, column: &str) -> StoreResult<()> {
        if columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                entity: entity.to_string(),
                column: column.to_string(),
            })
        }
    }

    fn where_clause(conn: &Connection, entity: &str, filter: &Filter) -> StoreResult<String> {
        let columns = Self::table_columns(conn, entity)?;
        let clause = match filter {
            Filter::All => String::new(),
            Filter::NotNull(column) => {
                Self::require_column(&columns, entity, column)?;
                format!(" WHERE {} IS NOT NULL", SqlSecurity::escape_identifier(column)?)
            }
            Filter::Dangling { column, targets } => {
                Self::require_column(&columns, entity, column)?;
                let column = SqlSecurity::escape_identifier(column)?;
                let mut selects = Vec::with_capacity(targets.len());
                for target in targets {
                    let target_columns = Self::table_columns(conn, &target.entity)?;
                    Self::require_column(&target_columns, &target.entity, &target.column)?;
                    let target_column = SqlSecurity::escape_identifier(&target.column)?;
                    selects.push(format!(
                        "SELECT {target_column} FROM {} WHERE {target_column} IS NOT NULL",
                        SqlSecurity::escape_identifier(&target.entity)?
                    ));
                }
                if selects.is_empty() {
                    format!(" WHERE {column} IS NOT NULL")
                } else {
                    format!(
                        " WHERE {column} IS NOT NULL AND {column} NOT IN ({})",
                        selects.join(" UNION ")
                    )
                }
            }
        };
        Ok(clause)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn entities(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    async fn columns(&self, entity: &str) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        Self::table_columns(&conn, entity)
    }

    #[instrument(skip(self), level = "trace")]
    async fn scan(&self, entity: &str, filter: &Filter) -> StoreResult<Vec<Row>> {
        let conn = self.lock()?;
        let columns = Self::table_columns(&conn, entity)?;
        let sql = format!(
            "SELECT rowid, {} FROM {}{} ORDER BY rowid",
            SqlSecurity::escape_list(columns.iter().map(String::as_str))?,
            SqlSecurity::escape_identifier(entity)?,
            Self::where_clause(&conn, entity, filter)?
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let id = RowId(row.get(0)?);
                let mut values = Vec::with_capacity(columns.len());
                for (i, column) in columns.iter().enumerate() {
                    values.push((column.clone(), row.get::<_, Option<String>>(i + 1)?));
                }
                Ok(Row { id, values })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn values(&self, entity: &str, column: &str) -> StoreResult<BTreeSet<String>> {
        let conn = self.lock()?;
        let columns = Self::table_columns(&conn, entity)?;
        Self::require_column(&columns, entity, column)?;
        let column = SqlSecurity::escape_identifier(column)?;
        let sql = format!(
            "SELECT DISTINCT {column} FROM {} WHERE {column} IS NOT NULL",
            SqlSecurity::escape_identifier(entity)?
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(values)
    }

    async fn insert(&mut self, entity: &str, values: &[(&str, &str)]) -> StoreResult<RowId> {
        let conn = self.lock()?;
        let columns = Self::table_columns(&conn, entity)?;
        for (column, _) in values {
            Self::require_column(&columns, entity, column)?;
        }
        let table = SqlSecurity::escape_identifier(entity)?;
        if values.is_empty() {
            conn.execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])?;
        } else {
            let placeholders = (1..=values.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                SqlSecurity::escape_list(values.iter().map(|(c, _)| *c))?
            );
            let params = values
                .iter()
                .map(|(_, v)| (!v.is_empty()).then_some(*v));
            conn.execute(&sql, params_from_iter(params))?;
        }
        Ok(RowId(conn.last_insert_rowid()))
    }

    #[instrument(skip(self), level = "trace")]
    async fn delete_by_identity(&mut self, entity: &str, id: RowId) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE rowid = ?1",
            SqlSecurity::escape_identifier(entity)?
        );
        let conn = self.lock()?;
        Self::require_entity(&conn, entity)?;
        let changed = conn.execute(&sql, [id.0])?;
        if changed == 0 {
            return Err(StoreError::MissingRow {
                entity: entity.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn declare_entity(&mut self, entity: &str, columns: &[&str]) -> StoreResult<()> {
        if columns.is_empty() {
            return Err(StoreError::EmptyEntity(entity.to_string()));
        }
        let conn = self.lock()?;
        if Self::require_entity(&conn, entity).is_ok() {
            return Err(StoreError::EntityExists(entity.to_string()));
        }
        let fragments = columns
            .iter()
            .map(|c| SqlSecurity::escape_identifier(c).map(|c| format!("{c} TEXT")))
            .collect::<StoreResult<Vec<_>>>()?;
        let sql = format!(
            "CREATE TABLE {} ({})",
            SqlSecurity::escape_identifier(entity)?,
            fragments.join(", ")
        );
        conn.execute(&sql, [])?;
        Ok(())
    }

    async fn declare_column(&mut self, entity: &str, column: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let columns = Self::table_columns(&conn, entity)?;
        if columns.iter().any(|c| c == column) {
            return Ok(());
        }
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} TEXT",
            SqlSecurity::escape_identifier(entity)?,
            SqlSecurity::escape_identifier(column)?
        );
        conn.execute(&sql, [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnRef;

    async fn calendar_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.declare_entity("calendar", &["service_id"]).await.unwrap();
        store
            .declare_entity("calendar_dates", &["service_id", "date"])
            .await
            .unwrap();
        store
            .declare_entity("trips", &["trip_id", "service_id"])
            .await
            .unwrap();
        store.insert("calendar", &[("service_id", "WEEK")]).await.unwrap();
        store
            .insert("calendar_dates", &[("service_id", "XMAS"), ("date", "20241225")])
            .await
            .unwrap();
        // A null target value must not hide dangling rows.
        store.insert("calendar_dates", &[("date", "20240101")]).await.unwrap();
        for (trip, service) in [("T1", "WEEK"), ("T2", "XMAS"), ("T3", "NOPE"), ("T4", "")] {
            store
                .insert("trips", &[("trip_id", trip), ("service_id", service)])
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_dangling_scan_over_alternatives() {
        let store = calendar_store().await;
        let filter = Filter::dangling(
            "service_id",
            vec![
                ColumnRef::new("calendar", "service_id"),
                ColumnRef::new("calendar_dates", "service_id"),
            ],
        );
        let rows = store.scan("trips", &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("trip_id"), Some("T3"));
        assert_eq!(rows[0].id, RowId(3));
    }

    #[tokio::test]
    async fn test_empty_values_are_null() {
        let store = calendar_store().await;
        let rows = store
            .scan("trips", &Filter::not_null("service_id"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        let values = store.values("calendar_dates", "service_id").await.unwrap();
        assert_eq!(values.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_row_fails() {
        let mut store = calendar_store().await;
        store.delete_by_identity("trips", RowId(1)).await.unwrap();
        let err = store.delete_by_identity("trips", RowId(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { .. }));
        assert_eq!(store.row_count("trips").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_names() {
        let mut store = calendar_store().await;
        assert!(matches!(
            store.scan("routes", &Filter::All).await,
            Err(StoreError::UnknownEntity(_))
        ));
        assert!(matches!(
            store.scan("trips", &Filter::not_null("route_id")).await,
            Err(StoreError::UnknownColumn { .. })
        ));
        assert!(matches!(
            store.insert("trips", &[("trip_id; --", "x")]).await,
            Err(StoreError::UnknownColumn { .. })
        ));
        assert!(matches!(
            store.declare_entity("bad name", &["id"]).await,
            Err(StoreError::Security(_))
        ));
        assert!(matches!(
            store.declare_entity("trips", &["trip_id"]).await,
            Err(StoreError::EntityExists(_))
        ));
    }

    #[tokio::test]
    async fn test_declare_column_on_demand() {
        let mut store = calendar_store().await;
        store.declare_column("trips", "shape_id").await.unwrap();
        store.declare_column("trips", "shape_id").await.unwrap();
        assert_eq!(
            store.columns("trips").await.unwrap(),
            vec!["trip_id", "service_id", "shape_id"]
        );
        let rows = store.scan("trips", &Filter::All).await.unwrap();
        assert!(rows.iter().all(|r| r.get("shape_id").is_none()));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteStore::open(dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
    }
}
