//! Database schema definitions and migrations.

use rusqlite::Connection;

use crate::error::StorageError;
use crate::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Tables every migrated database must have.
const TABLES: [&str; 3] = ["snapshot_entries", "store_meta", "scan_runs"];

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if migrations fail.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| StorageError::Migration(format!("failed to create migrations table: {e}")))?;

    let current_version = current_version(conn)?;
    tracing::debug!(
        current = current_version,
        target = SCHEMA_VERSION,
        "Checking database migrations"
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the applied schema version (0 for a fresh database).
///
/// # Errors
///
/// Returns an error if the migrations table cannot be read.
pub fn current_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StorageError::Migration(format!("failed to get version: {e}")).into())
}

fn record_migration(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)",
        rusqlite::params![version, chrono::Utc::now().timestamp()],
    )
    .map_err(|e| StorageError::Migration(format!("failed to record migration: {e}")))?;

    Ok(())
}

/// Migration v1: snapshot, metadata and scan history tables.
fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Applying migration v1: snapshot schema");

    conn.execute_batch(
        r"
        -- Latest snapshot, replaced wholesale on every save
        CREATE TABLE IF NOT EXISTS snapshot_entries (
            path TEXT PRIMARY KEY,
            size INTEGER NOT NULL
        );

        -- Store bookkeeping (last_saved_at)
        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One row per completed scan cycle
        CREATE TABLE IF NOT EXISTS scan_runs (
            id TEXT PRIMARY KEY,
            root TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            files INTEGER NOT NULL,
            changes INTEGER NOT NULL,
            warnings INTEGER NOT NULL,
            notification TEXT NOT NULL,
            notify_error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_scan_runs_started_at ON scan_runs(started_at);
        ",
    )
    .map_err(|e| StorageError::Migration(format!("v1 migration failed: {e}")))?;

    record_migration(conn, 1)?;
    tracing::info!("Migration v1 complete");

    Ok(())
}

/// Verify all expected tables exist.
///
/// # Errors
///
/// Returns an error if any expected table is missing from the schema.
pub fn verify_schema(conn: &Connection) -> Result<()> {
    for table in TABLES {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?",
                [table],
                |_| Ok(true),
            )
            .unwrap_or(false);

        if !exists {
            return Err(StorageError::Migration(format!("table '{table}' not found")).into());
        }
    }

    tracing::debug!("Schema verification passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_migrate_empty_database() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            migrate(conn)?;
            verify_schema(conn)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_migrate_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            migrate(conn)?;
            migrate(conn)?;
            verify_schema(conn)?;
            assert_eq!(current_version(conn)?, SCHEMA_VERSION);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_verify_unmigrated_fails() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(verify_schema);
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_path_is_unique() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            migrate(conn)?;

            conn.execute(
                "INSERT INTO snapshot_entries (path, size) VALUES (?, ?)",
                rusqlite::params!["a.txt", 10i64],
            )
            .unwrap();

            let duplicate = conn.execute(
                "INSERT INTO snapshot_entries (path, size) VALUES (?, ?)",
                rusqlite::params!["a.txt", 20i64],
            );
            assert!(duplicate.is_err());

            Ok(())
        })
        .unwrap();
    }
}
