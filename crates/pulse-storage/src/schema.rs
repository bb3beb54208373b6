//! Schema bootstrap and versioned migrations.

use rusqlite::Connection;

use pulse_core::StoreError;

use crate::connection::sqlite_err;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Apply pending migrations.
pub fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER NOT NULL
         );",
    )
    .map_err(sqlite_err)?;

    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .map_err(sqlite_err)?;

    if version.unwrap_or(0) < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])
            .map_err(sqlite_err)?;
        tracing::info!("applied schema migration v1");
    }
    Ok(())
}

/// v1: the document-style records table.
fn migrate_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             tenant_id TEXT NOT NULL,
             crm_source TEXT NOT NULL,
             tbl TEXT NOT NULL,
             record_id TEXT,
             payload TEXT NOT NULL,
             created_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
         );
         CREATE INDEX IF NOT EXISTS idx_records_scope
             ON records(tenant_id, crm_source, tbl);
         CREATE INDEX IF NOT EXISTS idx_records_key
             ON records(tenant_id, crm_source, tbl, record_id);",
    )
    .map_err(sqlite_err)
}
