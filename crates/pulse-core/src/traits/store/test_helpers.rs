//! `MemoryStore` — in-memory test double for `TabularStore`.
//!
//! Used by engine tests to avoid a real database. Tracks per-table call
//! counts so tests can observe cache behavior, and can be told to fail a
//! table to simulate transient backend errors.

use std::sync::Mutex;

use crate::errors::StoreError;
use crate::filter::{self, FieldFilter, SelectQuery};
use crate::row::Row;
use crate::types::collections::{FxHashMap, FxHashSet};
use crate::types::TenantScope;

use super::TabularStore;

type TableKey = (String, String, String);

/// In-memory `TabularStore` implementation.
pub struct MemoryStore {
    tables: Mutex<FxHashMap<TableKey, Vec<Row>>>,
    count_calls: Mutex<FxHashMap<String, u32>>,
    failing_tables: Mutex<FxHashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(FxHashMap::default()),
            count_calls: Mutex::new(FxHashMap::default()),
            failing_tables: Mutex::new(FxHashSet::default()),
        }
    }

    fn key(scope: &TenantScope, table: &str) -> TableKey {
        (
            scope.tenant_id.clone(),
            scope.crm_source.clone(),
            table.to_string(),
        )
    }

    /// Seed a table with rows.
    pub fn seed(&self, scope: &TenantScope, table: &str, rows: Vec<Row>) {
        self.tables
            .lock()
            .unwrap()
            .entry(Self::key(scope, table))
            .or_default()
            .extend(rows);
    }

    /// Make every operation on `table` fail with a backend error.
    pub fn fail_table(&self, table: &str) {
        self.failing_tables.lock().unwrap().insert(table.to_string());
    }

    /// Number of `count` calls issued against `table` so far.
    pub fn count_calls_for(&self, table: &str) -> u32 {
        self.count_calls
            .lock()
            .unwrap()
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    /// All rows currently stored in `table` for the scope.
    pub fn rows(&self, scope: &TenantScope, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(&Self::key(scope, table))
            .cloned()
            .unwrap_or_default()
    }

    fn check_failing(&self, table: &str) -> Result<(), StoreError> {
        if self.failing_tables.lock().unwrap().contains(table) {
            return Err(StoreError::Backend {
                message: format!("simulated failure on {table}"),
            });
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularStore for MemoryStore {
    fn count(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<u64, StoreError> {
        self.check_failing(table)?;
        *self
            .count_calls
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_insert(0) += 1;
        let tables = self.tables.lock().unwrap();
        let rows = tables.get(&Self::key(scope, table));
        Ok(rows
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter::matches_all(row, filters))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    fn select(
        &self,
        scope: &TenantScope,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Row>, StoreError> {
        self.check_failing(table)?;
        let tables = self.tables.lock().unwrap();
        let matching: Vec<Row> = tables
            .get(&Self::key(scope, table))
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter::matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(filter::apply_query_shape(matching, query))
    }

    fn insert(&self, scope: &TenantScope, table: &str, rows: &[Row]) -> Result<usize, StoreError> {
        self.check_failing(table)?;
        self.tables
            .lock()
            .unwrap()
            .entry(Self::key(scope, table))
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len())
    }

    fn upsert(
        &self,
        scope: &TenantScope,
        table: &str,
        key_field: &str,
        rows: &[Row],
    ) -> Result<usize, StoreError> {
        self.check_failing(table)?;
        let mut tables = self.tables.lock().unwrap();
        let existing = tables.entry(Self::key(scope, table)).or_default();
        for row in rows {
            let key_value = row.get(key_field).cloned();
            match existing
                .iter_mut()
                .find(|r| key_value.is_some() && r.get(key_field) == key_value.as_ref())
            {
                Some(slot) => *slot = row.clone(),
                None => existing.push(row.clone()),
            }
        }
        Ok(rows.len())
    }

    fn delete(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<usize, StoreError> {
        self.check_failing(table)?;
        let mut tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get_mut(&Self::key(scope, table)) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !filter::matches_all(row, filters));
        Ok(before - rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str, value: i64) -> Row {
        let mut r = Row::new();
        r.insert("id".into(), json!(id));
        r.insert("value".into(), json!(value));
        r
    }

    #[test]
    fn upsert_replaces_on_key_collision() {
        let store = MemoryStore::new();
        let scope = TenantScope::new("t1", "crm");
        store
            .upsert(&scope, "crm_deals", "id", &[row("d1", 100)])
            .unwrap();
        store
            .upsert(&scope, "crm_deals", "id", &[row("d1", 250)])
            .unwrap();
        let rows = store.rows(&scope, "crm_deals");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("value"), Some(&json!(250)));
    }

    #[test]
    fn scopes_are_isolated() {
        let store = MemoryStore::new();
        let a = TenantScope::new("a", "crm");
        let b = TenantScope::new("b", "crm");
        store.insert(&a, "crm_deals", &[row("d1", 1)]).unwrap();
        assert_eq!(store.count(&b, "crm_deals", &[]).unwrap(), 0);
        assert_eq!(store.count(&a, "crm_deals", &[]).unwrap(), 1);
    }

    #[test]
    fn failing_table_surfaces_backend_error() {
        let store = MemoryStore::new();
        let scope = TenantScope::new("t1", "crm");
        store.fail_table("crm_deals");
        assert!(store.count(&scope, "crm_deals", &[]).is_err());
    }
}
