//! Directory walker that produces a size snapshot.
//!
//! Traversal is depth-first in file-name order. `walkdir` keeps the stack
//! of open directories on the heap, so tree depth is bounded by the open
//! file limit rather than by the thread stack.

use std::cell::{Cell, RefCell};
use std::io::ErrorKind;
use std::path::{Component, Path};

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use super::filter::ExclusionSet;
use super::models::{ScanOutcome, ScanWarning, WarningKind};
use crate::error::ScanError;
use crate::Result;

/// Counters reported when a walk finishes.
#[derive(Debug, Default, Clone, Copy)]
struct WalkStats {
    dirs: u64,
    ignored: u64,
}

/// Walk `root` and record the size of every regular file under it.
///
/// Excluded entries are skipped and excluded directories are not entered.
/// Symbolic links are followed. Unreadable directories, dangling links,
/// link cycles and names that are not valid UTF-8 become warnings on the
/// outcome and the walk continues with the next sibling.
///
/// The token is checked before each directory is entered; a cancelled
/// walk returns `ScanError::Cancelled` and no partial snapshot.
///
/// # Errors
///
/// Returns an error if the root is missing, is not a directory, cannot be
/// inspected, or the walk was cancelled.
pub fn scan(
    root: &Path,
    exclusions: &ExclusionSet,
    cancel: &CancellationToken,
) -> Result<ScanOutcome> {
    check_root(root)?;

    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled.into());
    }

    tracing::info!(
        root = %root.display(),
        exclusions = exclusions.len(),
        "Starting snapshot scan"
    );

    let mut outcome = ScanOutcome::default();
    let mut stats = WalkStats::default();
    let pruned = Cell::new(0u64);
    let unnamed = RefCell::new(Vec::new());

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let Some(relative) = relative_key(root, entry.path()) else {
                let lossy = lossy_key(root, entry.path());
                tracing::warn!(path = %lossy, "Skipping entry with non UTF-8 name");
                unnamed.borrow_mut().push(ScanWarning::new(
                    lossy,
                    "name is not valid UTF-8",
                    WarningKind::InvalidName,
                ));
                return false;
            };
            if exclusions.is_excluded(&relative) {
                tracing::debug!(path = %relative, "Excluded, pruning");
                pruned.set(pruned.get() + 1);
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let warning = warning_from_walk_error(root, &err);
                tracing::warn!(
                    path = %warning.path,
                    kind = ?warning.kind,
                    error = %warning.message,
                    "Skipping unreadable entry"
                );
                outcome.warnings.push(warning);
                continue;
            }
        };

        let file_type = entry.file_type();

        if file_type.is_dir() {
            if cancel.is_cancelled() {
                tracing::info!(root = %root.display(), "Snapshot scan cancelled");
                return Err(ScanError::Cancelled.into());
            }
            stats.dirs += 1;
            continue;
        }

        if !file_type.is_file() {
            stats.ignored += 1;
            continue;
        }

        let Some(relative) = relative_key(root, entry.path()) else {
            continue;
        };

        match entry.metadata() {
            Ok(metadata) => {
                outcome.snapshot.insert(relative, metadata.len());
            }
            Err(err) => {
                tracing::warn!(path = %relative, error = %err, "Failed to read file metadata");
                outcome.warnings.push(ScanWarning::new(
                    relative,
                    err.to_string(),
                    WarningKind::MetadataError,
                ));
            }
        }
    }

    outcome.warnings.extend(unnamed.into_inner());

    tracing::info!(
        root = %root.display(),
        files = outcome.snapshot.len(),
        dirs = stats.dirs,
        pruned = pruned.get(),
        ignored = stats.ignored,
        warnings = outcome.warnings.len(),
        "Snapshot scan complete"
    );

    Ok(outcome)
}

/// Fail early on a root that cannot be walked at all.
fn check_root(root: &Path) -> Result<()> {
    let path = root.display().to_string();
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScanError::RootNotFound { path: path.clone() },
        _ => ScanError::RootUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory { path }.into());
    }

    Ok(())
}

/// Root-relative form of `path` with `/` separators.
///
/// Returns `None` for paths outside `root`, which the walker never yields,
/// and for paths with a component that is not valid UTF-8. Such names have
/// no faithful string key: a lossy conversion could map two distinct files
/// onto one snapshot entry.
#[must_use]
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Display-only key for warnings about names `relative_key` rejects.
fn lossy_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn warning_from_walk_error(root: &Path, err: &walkdir::Error) -> ScanWarning {
    let path = err
        .path()
        .map(|p| relative_key(root, p).unwrap_or_else(|| p.display().to_string()))
        .unwrap_or_default();

    let kind = if err.loop_ancestor().is_some() {
        WarningKind::FilesystemLoop
    } else {
        WarningKind::ReadError
    };

    ScanWarning::new(path, err.to_string(), kind)
}
