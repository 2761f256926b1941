//! Snapshot and scan history persistence.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use super::models::ScanRun;
use crate::error::StorageError;
use crate::scanner::Snapshot;
use crate::Result;

const LAST_SAVED_AT: &str = "last_saved_at";

fn db_err(e: rusqlite::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

/// Load the persisted snapshot (empty if nothing was ever saved).
///
/// # Errors
///
/// Returns an error if the query fails or a stored size is negative.
pub fn load_snapshot(conn: &Connection) -> Result<Snapshot> {
    let mut stmt = conn
        .prepare("SELECT path, size FROM snapshot_entries")
        .map_err(db_err)?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(db_err)?;

    let mut snapshot = Snapshot::new();
    for row in rows {
        let (path, size) = row.map_err(db_err)?;
        let size = u64::try_from(size)
            .map_err(|_| StorageError::corrupt(&path, format!("negative size {size}")))?;
        snapshot.insert(path, size);
    }

    Ok(snapshot)
}

/// Replace the persisted snapshot with `snapshot`.
///
/// Callers must run this inside a transaction so a failed save leaves the
/// previous snapshot in place.
///
/// # Errors
///
/// Returns an error if a statement fails or a size does not fit in `SQLite`.
pub fn replace_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<()> {
    conn.execute("DELETE FROM snapshot_entries", [])
        .map_err(db_err)?;

    let mut stmt = conn
        .prepare("INSERT INTO snapshot_entries (path, size) VALUES (?, ?)")
        .map_err(db_err)?;

    for (path, size) in snapshot.iter() {
        let size = i64::try_from(size)
            .map_err(|_| StorageError::corrupt(path, format!("size {size} exceeds i64")))?;
        stmt.execute(rusqlite::params![path, size]).map_err(db_err)?;
    }

    conn.execute(
        "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?, ?)",
        rusqlite::params![LAST_SAVED_AT, Utc::now().to_rfc3339()],
    )
    .map_err(db_err)?;

    Ok(())
}

/// When a snapshot was last saved, `None` if never.
///
/// # Errors
///
/// Returns an error if the query fails or the stored timestamp is invalid.
pub fn last_saved_at(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?",
            [LAST_SAVED_AT],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;

    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| crate::Error::from(StorageError::corrupt(LAST_SAVED_AT, e.to_string())))
        })
        .transpose()
}

/// Count files in the persisted snapshot.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_snapshot_entries(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM snapshot_entries", [], |row| row.get(0))
        .map_err(|e| db_err(e).into())
}

/// Record a completed scan cycle.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn insert_scan_run(conn: &Connection, run: &ScanRun) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_runs (id, root, started_at, duration_ms, files, changes, warnings, \
         notification, notify_error) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            run.id,
            run.root,
            run.started_at.timestamp_millis(),
            to_i64(run.duration_ms),
            to_i64(run.files),
            to_i64(run.changes),
            to_i64(run.warnings),
            run.notification,
            run.notify_error,
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

/// Most recent scan cycles, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_scan_runs(conn: &Connection, limit: usize) -> Result<Vec<ScanRun>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, root, started_at, duration_ms, files, changes, warnings, notification, \
             notify_error FROM scan_runs ORDER BY started_at DESC, rowid DESC LIMIT ?",
        )
        .map_err(db_err)?;

    let runs = stmt
        .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            let started_ms: i64 = row.get(2)?;
            Ok(ScanRun {
                id: row.get(0)?,
                root: row.get(1)?,
                started_at: DateTime::from_timestamp_millis(started_ms).unwrap_or_default(),
                duration_ms: from_i64(row.get(3)?),
                files: from_i64(row.get(4)?),
                changes: from_i64(row.get(5)?),
                warnings: from_i64(row.get(6)?),
                notification: row.get(7)?,
                notify_error: row.get(8)?,
            })
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(runs)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_i64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
