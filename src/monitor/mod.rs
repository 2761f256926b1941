//! Scan cycle orchestration.
//!
//! This module provides:
//! - `run_scan`, one load-scan-diff-notify-save cycle
//! - A skip-if-running guard
//! - `Monitor`, the long-lived handle shared by the scheduler, the HTTP
//!   layer and the CLI
//! - A periodic scheduler

mod guard;
mod orchestrator;
mod scheduler;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub use guard::{ScanGuard, ScanPermit};
pub use orchestrator::{run_scan, FirstRunPolicy, NotificationStatus, ScanReport, ScanSettings};
pub use scheduler::{run_scheduled, ScanInterval};

use crate::notify::Notifier;
use crate::server::metrics;
use crate::storage::SnapshotStore;
use crate::{Error, Result};

/// Outcome of a scan request.
#[derive(Debug, Clone)]
pub enum ScanAttempt {
    /// The cycle ran to completion.
    Completed(Box<ScanReport>),
    /// Another cycle was already running; nothing was done.
    Skipped,
}

/// Owns everything a scan cycle needs and serializes cycles.
pub struct Monitor {
    settings: ScanSettings,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    guard: ScanGuard,
    shutdown: CancellationToken,
    current: Mutex<Option<CancellationToken>>,
    last_report: Mutex<Option<ScanReport>>,
}

impl Monitor {
    /// Create a monitor.
    pub fn new(
        settings: ScanSettings,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            store,
            notifier,
            guard: ScanGuard::new(),
            shutdown: CancellationToken::new(),
            current: Mutex::new(None),
            last_report: Mutex::new(None),
        }
    }

    /// Tie every cycle to `shutdown`.
    ///
    /// Once `shutdown` is cancelled, the running cycle stops at its next
    /// directory and every later cycle fails as cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Scan configuration.
    #[must_use]
    pub const fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Snapshot store.
    #[must_use]
    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    /// The guard serializing this monitor's cycles.
    #[must_use]
    pub const fn guard(&self) -> &ScanGuard {
        &self.guard
    }

    /// Whether a cycle is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Report of the last completed cycle.
    #[must_use]
    pub fn last_report(&self) -> Option<ScanReport> {
        self.last_report.lock().clone()
    }

    /// Ask the in-flight cycle to stop at its next directory.
    ///
    /// Only the running cycle is affected. Later cycles start normally, and
    /// calling this while idle does nothing.
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().as_ref() {
            token.cancel();
        }
    }

    /// Run one cycle on the current thread, unless one is already running.
    ///
    /// # Errors
    ///
    /// Returns an error if the cycle fails (see [`run_scan`]).
    pub fn scan_now(&self) -> Result<ScanAttempt> {
        match self.guard.try_acquire() {
            Some(permit) => {
                let cancel = self.begin_cycle();
                self.run_with(permit, &cancel)
            }
            None => Ok(self.skipped()),
        }
    }

    /// Run one cycle on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the cycle fails or the blocking task panics.
    pub async fn scan_now_async(self: &Arc<Self>) -> Result<ScanAttempt> {
        let Some(permit) = self.guard.try_acquire() else {
            return Ok(self.skipped());
        };

        // Registered before spawning so `cancel` reaches a queued cycle too.
        let cancel = self.begin_cycle();
        let monitor = Arc::clone(self);
        tokio::task::spawn_blocking(move || monitor.run_with(permit, &cancel))
            .await
            .map_err(|e| Error::internal(format!("scan task failed: {e}")))?
    }

    fn begin_cycle(&self) -> CancellationToken {
        let token = self.shutdown.child_token();
        *self.current.lock() = Some(token.clone());
        token
    }

    fn run_with(&self, _permit: ScanPermit, cancel: &CancellationToken) -> Result<ScanAttempt> {
        let result = run_scan(
            &self.settings,
            self.store.as_ref(),
            self.notifier.as_ref(),
            cancel,
        );
        self.current.lock().take();

        let report = result?;
        *self.last_report.lock() = Some(report.clone());
        Ok(ScanAttempt::Completed(Box::new(report)))
    }

    fn skipped(&self) -> ScanAttempt {
        metrics::SCANS_TOTAL.with_label_values(&["skipped"]).inc();
        tracing::info!(root = %self.settings.root.display(), "Scan already running, skipping trigger");
        ScanAttempt::Skipped
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("settings", &self.settings)
            .field("notifier", &self.notifier.name())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
