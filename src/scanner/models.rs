//! Snapshot and change-set types shared by the scanner, differ and stores.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Root-relative file path to size in bytes.
///
/// Keys use `/` as the separator on every platform and only ever name
/// regular files. Iteration is ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, u64>,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file, returning the previous size if the path was present.
    pub fn insert(&mut self, path: impl Into<String>, size: u64) -> Option<u64> {
        self.entries.insert(path.into(), size)
    }

    /// Size recorded for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<u64> {
        self.entries.get(path).copied()
    }

    /// Whether `path` is recorded.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of files recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no files are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(path, size)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(path, size)| (path.as_str(), *size))
    }

    /// Sum of all recorded sizes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().fold(0u64, |acc, s| acc.saturating_add(*s))
    }
}

impl<P: Into<String>> FromIterator<(P, u64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (P, u64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(p, s)| (p.into(), s)).collect(),
        }
    }
}

/// A file that is new or whose size changed since the previous scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Root-relative path.
    pub path: String,

    /// Size in the previous snapshot, `None` for a newly observed file.
    pub old_size: Option<u64>,

    /// Size in the current snapshot.
    pub new_size: u64,
}

impl ChangeRecord {
    /// Create a change record.
    #[must_use]
    pub fn new(path: impl Into<String>, old_size: Option<u64>, new_size: u64) -> Self {
        Self {
            path: path.into(),
            old_size,
            new_size,
        }
    }

    /// Whether the file was not present in the previous snapshot.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.old_size.is_none()
    }
}

/// Renders the notification line for this change.
impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: Old Size: ", self.path)?;
        match self.old_size {
            Some(old) => write!(f, "{old}")?,
            None => f.write_str("N/A")?,
        }
        write!(f, " bytes, New Size: {} bytes", self.new_size)
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A directory or link could not be read; its subtree was skipped.
    ReadError,
    /// File metadata could not be read; the file was skipped.
    MetadataError,
    /// A symbolic link points back at one of its ancestors.
    FilesystemLoop,
    /// The name is not valid UTF-8 and cannot be keyed; the entry was skipped.
    InvalidName,
}

/// Non-fatal problem encountered during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Root-relative path where the problem occurred (empty for the root).
    pub path: String,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<String>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }
}

/// Result of walking a root directory.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Files found.
    pub snapshot: Snapshot,
    /// Subtrees and entries that were skipped.
    pub warnings: Vec<ScanWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_snapshot_insert_and_get() {
        let mut snapshot = Snapshot::new();
        assert!(snapshot.is_empty());

        assert_eq!(snapshot.insert("a.txt", 10), None);
        assert_eq!(snapshot.insert("a.txt", 12), Some(10));

        assert_eq!(snapshot.get("a.txt"), Some(12));
        assert_eq!(snapshot.get("b.txt"), None);
        assert!(snapshot.contains("a.txt"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_snapshot_iter_is_path_ordered() {
        let snapshot: Snapshot = [("z.txt", 1), ("a/b.txt", 2), ("a.txt", 3)]
            .into_iter()
            .collect();

        let paths: Vec<&str> = snapshot.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["a.txt", "a/b.txt", "z.txt"]);
        assert_eq!(snapshot.total_bytes(), 6);
    }

    #[test]
    fn test_snapshot_serializes_as_plain_map() {
        let snapshot: Snapshot = [("a.txt", 10)].into_iter().collect();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"a.txt":10}"#);

        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_change_record_line_for_resized_file() {
        let record = ChangeRecord::new("wp-content/a.txt", Some(10), 20);
        assert!(!record.is_new());
        assert_snapshot!(
            record.to_string(),
            @"wp-content/a.txt: Old Size: 10 bytes, New Size: 20 bytes"
        );
    }

    #[test]
    fn test_change_record_line_for_new_file() {
        let record = ChangeRecord::new("index.php", None, 405);
        assert!(record.is_new());
        assert_snapshot!(
            record.to_string(),
            @"index.php: Old Size: N/A bytes, New Size: 405 bytes"
        );
    }
}
