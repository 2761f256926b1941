//! The snapshot persistence boundary used by the scan cycle.

use parking_lot::Mutex;

use super::connection::Database;
use super::models::ScanRun;
use super::snapshots::{
    count_snapshot_entries, insert_scan_run, last_saved_at, list_scan_runs, load_snapshot,
    replace_snapshot,
};
use crate::scanner::Snapshot;
use crate::Result;

/// Loads and saves the most recent snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, empty if none was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored snapshot cannot be read.
    fn load(&self) -> Result<Snapshot>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written. The previously
    /// stored snapshot must survive a failed save.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Whether any snapshot, even an empty one, was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn has_scanned(&self) -> Result<bool>;

    /// Append a completed cycle to the scan history.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be written.
    fn record_run(&self, _run: &ScanRun) -> Result<()> {
        Ok(())
    }

    /// Most recent cycles, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read.
    fn recent_runs(&self, _limit: usize) -> Result<Vec<ScanRun>> {
        Ok(Vec::new())
    }
}

/// `SQLite`-backed store.
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    db: Database,
}

impl SqliteSnapshotStore {
    /// Wrap an initialized database (see [`super::init_storage`]).
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Number of files in the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn tracked_files(&self) -> Result<i64> {
        self.db.with_conn(count_snapshot_entries)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self) -> Result<Snapshot> {
        let snapshot = self.db.with_conn(load_snapshot)?;
        tracing::debug!(files = snapshot.len(), "Loaded previous snapshot");
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.db
            .with_transaction(|conn| replace_snapshot(conn, snapshot))?;
        tracing::debug!(files = snapshot.len(), "Saved snapshot");
        Ok(())
    }

    fn has_scanned(&self) -> Result<bool> {
        Ok(self.db.with_conn(last_saved_at)?.is_some())
    }

    fn record_run(&self, run: &ScanRun) -> Result<()> {
        self.db.with_conn(|conn| insert_scan_run(conn, run))
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<ScanRun>> {
        self.db.with_conn(|conn| list_scan_runs(conn, limit))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Option<Snapshot>,
    runs: Vec<ScanRun>,
}

/// In-process store, for embedding the scan cycle without `SQLite`.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    state: Mutex<MemoryState>,
}

impl MemorySnapshotStore {
    /// Create an empty store (first run).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snapshot: Some(snapshot),
                runs: Vec::new(),
            }),
        }
    }

    /// The stored snapshot, if any was saved.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.state.lock().snapshot.clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.state.lock().snapshot.clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.state.lock().snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn has_scanned(&self) -> Result<bool> {
        Ok(self.state.lock().snapshot.is_some())
    }

    fn record_run(&self, run: &ScanRun) -> Result<()> {
        self.state.lock().runs.push(run.clone());
        Ok(())
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<ScanRun>> {
        Ok(self
            .state
            .lock()
            .runs
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_storage;
    use chrono::Utc;

    fn sqlite_store() -> SqliteSnapshotStore {
        let db = Database::open_in_memory().unwrap();
        init_storage(&db).unwrap();
        SqliteSnapshotStore::new(db)
    }

    fn run(id: &str) -> ScanRun {
        ScanRun {
            id: id.to_string(),
            root: "/srv".to_string(),
            started_at: Utc::now(),
            duration_ms: 1,
            files: 0,
            changes: 0,
            warnings: 0,
            notification: "not_needed".to_string(),
            notify_error: None,
        }
    }

    fn exercise(store: &dyn SnapshotStore) {
        assert!(store.load().unwrap().is_empty());
        assert!(!store.has_scanned().unwrap());

        store.save(&Snapshot::new()).unwrap();
        assert!(store.has_scanned().unwrap());
        assert!(store.load().unwrap().is_empty());

        let snapshot: Snapshot = [("a.txt", 10), ("b/c.txt", 5)].into_iter().collect();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), snapshot);
    }

    #[test]
    fn test_sqlite_store_contract() {
        exercise(&sqlite_store());
    }

    #[test]
    fn test_memory_store_contract() {
        exercise(&MemorySnapshotStore::new());
    }

    #[test]
    fn test_sqlite_tracked_files() {
        let store = sqlite_store();
        store
            .save(&[("a", 1), ("b", 2)].into_iter().collect())
            .unwrap();
        assert_eq!(store.tracked_files().unwrap(), 2);
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sizewatch.db");
        let snapshot: Snapshot = [("index.php", 405)].into_iter().collect();

        {
            let db = Database::open(&path).unwrap();
            init_storage(&db).unwrap();
            SqliteSnapshotStore::new(db).save(&snapshot).unwrap();
        }

        let db = Database::open(&path).unwrap();
        init_storage(&db).unwrap();
        let store = SqliteSnapshotStore::new(db);
        assert_eq!(store.load().unwrap(), snapshot);
        assert!(store.has_scanned().unwrap());
    }

    #[test]
    fn test_memory_store_history_newest_first() {
        let store = MemorySnapshotStore::new();
        store.record_run(&run("1")).unwrap();
        store.record_run(&run("2")).unwrap();
        store.record_run(&run("3")).unwrap();

        let ids: Vec<String> = store
            .recent_runs(2)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn test_memory_store_with_snapshot() {
        let snapshot: Snapshot = [("a.txt", 10)].into_iter().collect();
        let store = MemorySnapshotStore::with_snapshot(snapshot.clone());
        assert!(store.has_scanned().unwrap());
        assert_eq!(store.load().unwrap(), snapshot);
        assert_eq!(store.snapshot(), Some(snapshot));
    }
}
