//! # pulse-storage
//!
//! SQLite persistence layer for the Pulse engine. Implements the
//! `TabularStore` trait as a document store: JSON payload rows keyed by
//! (tenant, source, table, record id), WAL mode, filter evaluation shared
//! with pulse-core.

pub mod connection;
pub mod engine;
pub mod schema;

pub use connection::DatabaseManager;
pub use engine::SqliteStore;
