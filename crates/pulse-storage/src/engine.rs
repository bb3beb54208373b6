//! `SqliteStore` — document-style `TabularStore` over SQLite.
//!
//! CRM payloads are heterogeneous per vendor, so rows are stored as JSON
//! documents and filters are evaluated on the deserialized payload with
//! the same evaluator the in-memory store uses. Scope predicates
//! (tenant, source, table) are pushed down to SQL; everything else is
//! bounded client-side work.

use rusqlite::params;

use pulse_core::filter::{apply_query_shape, matches_all};
use pulse_core::row::Row;
use pulse_core::{FieldFilter, SelectQuery, StoreError, TabularStore, TenantScope};

use crate::connection::{sqlite_err, DatabaseManager};

pub struct SqliteStore {
    db: DatabaseManager,
}

impl SqliteStore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    /// Open a store backed by a database file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        Ok(Self::new(DatabaseManager::open(path)?))
    }

    /// Open an in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(DatabaseManager::open_in_memory()?))
    }

    /// All rows for (scope, table), with their SQLite rowids.
    fn load_rows(
        &self,
        scope: &TenantScope,
        table: &str,
    ) -> Result<Vec<(i64, Row)>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, payload FROM records
                     WHERE tenant_id = ?1 AND crm_source = ?2 AND tbl = ?3",
                )
                .map_err(sqlite_err)?;
            let rows = stmt
                .query_map(
                    params![scope.tenant_id, scope.crm_source, table],
                    |row| {
                        let id: i64 = row.get(0)?;
                        let payload: String = row.get(1)?;
                        Ok((id, payload))
                    },
                )
                .map_err(sqlite_err)?;

            let mut result = Vec::new();
            for row in rows {
                let (id, payload) = row.map_err(sqlite_err)?;
                let parsed: Row = serde_json::from_str(&payload).map_err(|e| {
                    StoreError::Serialization {
                        message: format!("corrupt payload in {table}: {e}"),
                    }
                })?;
                result.push((id, parsed));
            }
            Ok(result)
        })
    }

    fn record_id_of(row: &Row, key_field: &str) -> Option<String> {
        match row.get(key_field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl TabularStore for SqliteStore {
    fn count(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<u64, StoreError> {
        if filters.is_empty() {
            // No payload predicates: push the count down to SQL.
            return self.db.with_conn(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM records
                     WHERE tenant_id = ?1 AND crm_source = ?2 AND tbl = ?3",
                    params![scope.tenant_id, scope.crm_source, table],
                    |row| row.get::<_, i64>(0),
                )
                .map(|count| count as u64)
                .map_err(sqlite_err)
            });
        }
        let rows = self.load_rows(scope, table)?;
        Ok(rows
            .iter()
            .filter(|(_, row)| matches_all(row, filters))
            .count() as u64)
    }

    fn select(
        &self,
        scope: &TenantScope,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Row>, StoreError> {
        let rows = self.load_rows(scope, table)?;
        let matching: Vec<Row> = rows
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| matches_all(row, &query.filters))
            .collect();
        Ok(apply_query_shape(matching, query))
    }

    fn insert(&self, scope: &TenantScope, table: &str, rows: &[Row]) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(
                    "INSERT INTO records (tenant_id, crm_source, tbl, record_id, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(sqlite_err)?;
            for row in rows {
                let record_id = Self::record_id_of(row, "id");
                let payload = serde_json::to_string(row).map_err(|e| {
                    StoreError::Serialization {
                        message: e.to_string(),
                    }
                })?;
                stmt.execute(params![
                    scope.tenant_id,
                    scope.crm_source,
                    table,
                    record_id,
                    payload,
                ])
                .map_err(sqlite_err)?;
            }
            Ok(rows.len())
        })
    }

    fn upsert(
        &self,
        scope: &TenantScope,
        table: &str,
        key_field: &str,
        rows: &[Row],
    ) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let mut delete = conn
                .prepare_cached(
                    "DELETE FROM records
                     WHERE tenant_id = ?1 AND crm_source = ?2 AND tbl = ?3 AND record_id = ?4",
                )
                .map_err(sqlite_err)?;
            let mut insert = conn
                .prepare_cached(
                    "INSERT INTO records (tenant_id, crm_source, tbl, record_id, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(sqlite_err)?;
            for row in rows {
                let record_id = Self::record_id_of(row, key_field);
                if let Some(record_id) = &record_id {
                    delete
                        .execute(params![
                            scope.tenant_id,
                            scope.crm_source,
                            table,
                            record_id,
                        ])
                        .map_err(sqlite_err)?;
                }
                let payload = serde_json::to_string(row).map_err(|e| {
                    StoreError::Serialization {
                        message: e.to_string(),
                    }
                })?;
                insert
                    .execute(params![
                        scope.tenant_id,
                        scope.crm_source,
                        table,
                        record_id,
                        payload,
                    ])
                    .map_err(sqlite_err)?;
            }
            Ok(rows.len())
        })
    }

    fn delete(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<usize, StoreError> {
        let rows = self.load_rows(scope, table)?;
        let doomed: Vec<i64> = rows
            .iter()
            .filter(|(_, row)| matches_all(row, filters))
            .map(|(id, _)| *id)
            .collect();
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached("DELETE FROM records WHERE id = ?1")
                .map_err(sqlite_err)?;
            for id in &doomed {
                stmt.execute(params![id]).map_err(sqlite_err)?;
            }
            Ok(doomed.len())
        })
    }
}
