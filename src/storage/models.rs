//! Records persisted alongside the snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one completed scan cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRun {
    /// Unique run identifier (UUID v4 string).
    pub id: String,

    /// Root directory that was scanned.
    pub root: String,

    /// When the cycle started.
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration of the cycle in milliseconds.
    pub duration_ms: u64,

    /// Files in the saved snapshot.
    pub files: u64,

    /// Change records produced.
    pub changes: u64,

    /// Scan warnings (skipped subtrees).
    pub warnings: u64,

    /// Notification outcome: `not_needed`, `sent` or `failed`.
    pub notification: String,

    /// Delivery error when `notification` is `failed`.
    pub notify_error: Option<String>,
}

impl ScanRun {
    /// Whether the notification for this run failed.
    #[must_use]
    pub fn notification_failed(&self) -> bool {
        self.notification == "failed"
    }
}
