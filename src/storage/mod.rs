//! Snapshot persistence.
//!
//! This module provides:
//! - The `SnapshotStore` trait consumed by the scan cycle
//! - A `SQLite` store with versioned migrations
//! - An in-memory store
//! - Scan history records

mod connection;
mod models;
mod schema;
mod snapshots;
mod store;

pub use connection::Database;
pub use models::ScanRun;
pub use schema::{current_version, migrate, verify_schema, SCHEMA_VERSION};
pub use snapshots::{
    count_snapshot_entries, insert_scan_run, last_saved_at, list_scan_runs, load_snapshot,
    replace_snapshot,
};
pub use store::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};

/// Initialize storage with migrations.
///
/// # Errors
///
/// Returns an error if database initialization fails.
pub fn init_storage(db: &Database) -> crate::Result<()> {
    db.with_conn(|conn| {
        migrate(conn)?;
        verify_schema(conn)?;

        tracing::info!(path = %db.path(), "Storage initialized, schema version {SCHEMA_VERSION}");
        Ok(())
    })
}
