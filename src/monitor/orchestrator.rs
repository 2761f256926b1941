//! One scan-diff-persist cycle.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::notify::Notifier;
use crate::scanner::{self, Baseline, ChangeRecord, ExclusionSet, ScanWarning};
use crate::server::metrics;
use crate::server::observability::spans;
use crate::storage::{ScanRun, SnapshotStore};
use crate::{Error, Result};

/// How the very first cycle is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FirstRunPolicy {
    /// An empty previous snapshot means first run; nothing is reported.
    #[default]
    EmptySnapshot,
    /// Only a store that never saved a snapshot means first run.
    ScanHistory,
}

impl FirstRunPolicy {
    /// Stable kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptySnapshot => "empty-snapshot",
            Self::ScanHistory => "scan-history",
        }
    }
}

impl fmt::Display for FirstRunPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirstRunPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty-snapshot" | "empty_snapshot" => Ok(Self::EmptySnapshot),
            "scan-history" | "scan_history" => Ok(Self::ScanHistory),
            other => Err(Error::config(format!(
                "unknown first-run policy '{other}', must be one of: empty-snapshot, scan-history"
            ))),
        }
    }
}

/// Per-call scan configuration.
#[derive(Debug, Clone, Default)]
pub struct ScanSettings {
    /// Directory to scan.
    pub root: PathBuf,
    /// Root-relative paths to skip.
    pub exclusions: ExclusionSet,
    /// First-run detection.
    pub first_run: FirstRunPolicy,
}

impl ScanSettings {
    /// Settings with no exclusions and the default first-run policy.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Replace the exclusion set.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Replace the first-run policy.
    #[must_use]
    pub const fn with_first_run(mut self, first_run: FirstRunPolicy) -> Self {
        self.first_run = first_run;
        self
    }
}

/// What happened to the notification of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum NotificationStatus {
    /// No changes, nothing sent.
    NotNeeded,
    /// Delivered.
    Sent,
    /// Delivery failed; the snapshot was still saved.
    Failed(String),
}

impl NotificationStatus {
    /// Stable snake-case name, as persisted in the scan history.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotNeeded => "not_needed",
            Self::Sent => "sent",
            Self::Failed(_) => "failed",
        }
    }
}

/// Result of one completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Run identifier.
    pub id: Uuid,
    /// Scanned root.
    pub root: String,
    /// Cycle start.
    pub started_at: DateTime<Utc>,
    /// Cycle duration in milliseconds.
    pub duration_ms: u64,
    /// Files in the new snapshot.
    pub files: usize,
    /// Detected changes, sorted by path.
    pub changes: Vec<ChangeRecord>,
    /// Skipped entries.
    pub warnings: Vec<ScanWarning>,
    /// Notification outcome.
    pub notification: NotificationStatus,
}

impl ScanReport {
    /// Whether any change was detected.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// History record for this report.
    #[must_use]
    pub fn to_run(&self) -> ScanRun {
        ScanRun {
            id: self.id.to_string(),
            root: self.root.clone(),
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            files: self.files as u64,
            changes: self.changes.len() as u64,
            warnings: self.warnings.len() as u64,
            notification: self.notification.as_str().to_string(),
            notify_error: match &self.notification {
                NotificationStatus::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
        }
    }
}

/// Run one cycle: load, scan, diff, notify, save.
///
/// A notification failure is recorded in the report and does not stop the
/// cycle. Load, scan and save failures abort it; when the scan fails the
/// stored snapshot is left untouched.
///
/// # Errors
///
/// Returns an error if the previous snapshot cannot be loaded, the root
/// cannot be scanned, the scan is cancelled, or the new snapshot cannot be
/// saved.
pub fn run_scan(
    settings: &ScanSettings,
    store: &dyn SnapshotStore,
    notifier: &dyn Notifier,
    cancel: &CancellationToken,
) -> Result<ScanReport> {
    let id = Uuid::new_v4();
    let root = settings.root.display().to_string();
    let span = spans::scan_span(&id.to_string(), &root);
    let _enter = span.enter();

    let started_at = Utc::now();
    let timer = Instant::now();

    let result = cycle(settings, store, notifier, cancel);
    let elapsed = timer.elapsed();
    metrics::SCAN_DURATION.observe(elapsed.as_secs_f64());

    let (files, changes, warnings, notification) = match result {
        Ok(parts) => parts,
        Err(e) => {
            let outcome = if e.is_cancelled() { "cancelled" } else { "failed" };
            metrics::SCANS_TOTAL.with_label_values(&[outcome]).inc();
            tracing::error!(error = %e, "Scan cycle aborted");
            return Err(e);
        }
    };

    let report = ScanReport {
        id,
        root,
        started_at,
        duration_ms: duration_ms(elapsed),
        files,
        changes,
        warnings,
        notification,
    };

    record_metrics(&report);
    if let Err(e) = store.record_run(&report.to_run()) {
        tracing::warn!(error = %e, "Failed to record scan history");
    }

    tracing::info!(
        files = report.files,
        changes = report.changes.len(),
        warnings = report.warnings.len(),
        notification = report.notification.as_str(),
        duration_ms = report.duration_ms,
        "Scan cycle completed"
    );

    Ok(report)
}

type CycleParts = (usize, Vec<ChangeRecord>, Vec<ScanWarning>, NotificationStatus);

fn cycle(
    settings: &ScanSettings,
    store: &dyn SnapshotStore,
    notifier: &dyn Notifier,
    cancel: &CancellationToken,
) -> Result<CycleParts> {
    let previous = store.load()?;

    let baseline = match settings.first_run {
        FirstRunPolicy::EmptySnapshot => Baseline::infer(&previous),
        FirstRunPolicy::ScanHistory if store.has_scanned()? => Baseline::Established,
        FirstRunPolicy::ScanHistory => Baseline::FirstRun,
    };

    let outcome = scanner::scan(&settings.root, &settings.exclusions, cancel)?;
    let changes = scanner::diff_with_baseline(&previous, &outcome.snapshot, baseline);

    if baseline == Baseline::FirstRun {
        tracing::info!(files = outcome.snapshot.len(), "First scan, recording baseline");
    }

    let notification = if changes.is_empty() {
        NotificationStatus::NotNeeded
    } else {
        match notifier.notify(&changes) {
            Ok(()) => NotificationStatus::Sent,
            Err(e) => {
                tracing::error!(
                    transport = notifier.name(),
                    error = %e,
                    changes = changes.len(),
                    "Notification failed, saving snapshot anyway"
                );
                NotificationStatus::Failed(e.to_string())
            }
        }
    };

    store.save(&outcome.snapshot)?;

    Ok((outcome.snapshot.len(), changes, outcome.warnings, notification))
}

fn record_metrics(report: &ScanReport) {
    metrics::SCANS_TOTAL.with_label_values(&["completed"]).inc();
    metrics::FILES_TRACKED.set(i64::try_from(report.files).unwrap_or(i64::MAX));
    metrics::CHANGES_TOTAL.inc_by(report.changes.len() as u64);
    metrics::SCAN_WARNINGS_TOTAL.inc_by(report.warnings.len() as u64);
    if matches!(report.notification, NotificationStatus::Failed(_)) {
        metrics::NOTIFY_FAILURES_TOTAL.inc();
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
