//! Snapshot comparison.

use super::models::{ChangeRecord, Snapshot};

/// Whether a previous snapshot can be compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// Nothing to compare against yet; no changes are reported.
    FirstRun,
    /// The previous snapshot is authoritative, even when empty.
    Established,
}

impl Baseline {
    /// Infer the baseline from the previous snapshot alone.
    ///
    /// An empty snapshot counts as a first run, so a root that really was
    /// empty last time reports nothing this time either.
    #[must_use]
    pub fn infer(previous: &Snapshot) -> Self {
        if previous.is_empty() {
            Self::FirstRun
        } else {
            Self::Established
        }
    }
}

/// Files that are new or resized in `current` relative to `previous`.
///
/// Returns nothing when `previous` is empty. Files only present in
/// `previous` are never reported. Records are ordered by path.
#[must_use]
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<ChangeRecord> {
    diff_with_baseline(previous, current, Baseline::infer(previous))
}

/// Like [`diff`], with the first-run decision made by the caller.
#[must_use]
pub fn diff_with_baseline(
    previous: &Snapshot,
    current: &Snapshot,
    baseline: Baseline,
) -> Vec<ChangeRecord> {
    if baseline == Baseline::FirstRun {
        return Vec::new();
    }

    current
        .iter()
        .filter_map(|(path, size)| match previous.get(path) {
            None => Some(ChangeRecord::new(path, None, size)),
            Some(old) if old != size => Some(ChangeRecord::new(path, Some(old), size)),
            Some(_) => None,
        })
        .collect()
}
