//! Directory scanning and snapshot comparison.
//!
//! This module provides:
//! - Exact-match path exclusions
//! - A directory walker producing path-to-size snapshots
//! - Comparison of two snapshots into a change set

mod diff;
mod filter;
mod models;
mod walker;

pub use diff::{diff, diff_with_baseline, Baseline};
pub use filter::{is_excluded, ExclusionSet};
pub use models::{ChangeRecord, ScanOutcome, ScanWarning, Snapshot, WarningKind};
pub use walker::{relative_key, scan};
