//! `TabularStore` trait — the tenant-scoped tabular data-access contract.
//!
//! This is the only surface through which the engine reads synced CRM data
//! or writes its own outputs. The SQLite implementation lives in
//! `pulse-storage`; `test_helpers` provides an in-memory double. The trait
//! is object-safe, `Send + Sync`, and has a blanket `Arc<T>` impl.
//!
//! No free-form queries exist: every access is (scope, table, filters),
//! and callers are expected to keep every fetch bounded.

pub mod test_helpers;

use std::sync::Arc;

use crate::errors::StoreError;
use crate::filter::{FieldFilter, SelectQuery};
use crate::row::Row;
use crate::types::TenantScope;

/// Tenant/source-scoped read/write access to named tables.
pub trait TabularStore: Send + Sync {
    /// Count rows matching the filters.
    fn count(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<u64, StoreError>;

    /// Select rows matching the query (filters, order, limit, projection).
    fn select(
        &self,
        scope: &TenantScope,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Row>, StoreError>;

    /// Insert rows. Returns the number inserted.
    fn insert(&self, scope: &TenantScope, table: &str, rows: &[Row]) -> Result<usize, StoreError>;

    /// Insert-or-replace rows keyed on `key_field`. Returns rows written.
    fn upsert(
        &self,
        scope: &TenantScope,
        table: &str,
        key_field: &str,
        rows: &[Row],
    ) -> Result<usize, StoreError>;

    /// Delete rows matching the filters. Returns rows removed.
    fn delete(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<usize, StoreError>;
}

impl<T: TabularStore + ?Sized> TabularStore for Arc<T> {
    fn count(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<u64, StoreError> {
        (**self).count(scope, table, filters)
    }

    fn select(
        &self,
        scope: &TenantScope,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Row>, StoreError> {
        (**self).select(scope, table, query)
    }

    fn insert(&self, scope: &TenantScope, table: &str, rows: &[Row]) -> Result<usize, StoreError> {
        (**self).insert(scope, table, rows)
    }

    fn upsert(
        &self,
        scope: &TenantScope,
        table: &str,
        key_field: &str,
        rows: &[Row],
    ) -> Result<usize, StoreError> {
        (**self).upsert(scope, table, key_field, rows)
    }

    fn delete(
        &self,
        scope: &TenantScope,
        table: &str,
        filters: &[FieldFilter],
    ) -> Result<usize, StoreError> {
        (**self).delete(scope, table, filters)
    }
}
