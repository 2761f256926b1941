//! Periodic scan trigger.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{Monitor, ScanAttempt};
use crate::{Error, Result};

/// How often the scheduler triggers a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanInterval {
    /// Every hour.
    Hourly,
    /// Every 24 hours.
    #[default]
    Daily,
}

impl ScanInterval {
    /// Period between ticks.
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        match self {
            Self::Hourly => Duration::from_secs(60 * 60),
            Self::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for ScanInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanInterval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            other => Err(Error::config(format!(
                "unknown scan interval '{other}', must be one of: hourly, daily"
            ))),
        }
    }
}

/// Trigger a cycle immediately and then every `period` until `shutdown`.
///
/// Ticks missed while a long cycle runs are dropped, not replayed. Failed
/// cycles are logged and the loop keeps going. Cancelling `shutdown` while a
/// cycle runs cancels that cycle, waits for it to stop, then returns.
pub async fn run_scheduled(monitor: Arc<Monitor>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        root = %monitor.settings().root.display(),
        period_secs = period.as_secs(),
        "Scheduler started"
    );

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let scan = monitor.scan_now_async();
        tokio::pin!(scan);
        let result = tokio::select! {
            biased;
            result = &mut scan => result,
            () = shutdown.cancelled() => {
                monitor.cancel();
                scan.await
            }
        };

        match result {
            Ok(ScanAttempt::Completed(report)) => {
                tracing::debug!(run_id = %report.id, "Scheduled scan finished");
            }
            Ok(ScanAttempt::Skipped) => {}
            Err(e) if e.is_cancelled() => {
                tracing::info!("Scheduled scan cancelled");
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduled scan failed");
            }
        }

        if shutdown.is_cancelled() {
            break;
        }
    }

    tracing::info!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ScanSettings;
    use crate::notify::LogNotifier;
    use crate::scanner::Snapshot;
    use crate::storage::{MemorySnapshotStore, SnapshotStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Store whose `load` blocks, keeping a cycle in flight.
    struct SlowStore {
        delay: Duration,
        saves: AtomicUsize,
    }

    impl SnapshotStore for SlowStore {
        fn load(&self) -> Result<Snapshot> {
            std::thread::sleep(self.delay);
            Ok(Snapshot::new())
        }

        fn save(&self, _snapshot: &Snapshot) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn has_scanned(&self) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_interval_durations() {
        assert_eq!(ScanInterval::Hourly.as_duration(), Duration::from_secs(3600));
        assert_eq!(ScanInterval::Daily.as_duration(), Duration::from_secs(86_400));
        assert_eq!(ScanInterval::default(), ScanInterval::Daily);
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("Hourly".parse::<ScanInterval>().unwrap(), ScanInterval::Hourly);
        assert_eq!("daily".parse::<ScanInterval>().unwrap(), ScanInterval::Daily);
        assert!("weekly".parse::<ScanInterval>().is_err());
    }

    #[tokio::test]
    async fn test_first_tick_is_immediate_and_shutdown_stops() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("a.txt"), "abc").unwrap();

        let store = Arc::new(MemorySnapshotStore::new());
        let monitor = Arc::new(Monitor::new(
            ScanSettings::new(root.path()),
            Arc::clone(&store) as Arc<dyn SnapshotStore>,
            Arc::new(LogNotifier),
        ));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_scheduled(
            Arc::clone(&monitor),
            Duration::from_secs(3600),
            shutdown.clone(),
        ));

        for _ in 0..200 {
            if monitor.last_report().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(monitor.last_report().is_some());
        assert_eq!(store.snapshot().unwrap().get("a.txt"), Some(3));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_cancels_in_flight_scan() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("a.txt"), "abc").unwrap();

        let store = Arc::new(SlowStore {
            delay: Duration::from_millis(600),
            saves: AtomicUsize::new(0),
        });
        let monitor = Arc::new(Monitor::new(
            ScanSettings::new(root.path()),
            Arc::clone(&store) as Arc<dyn SnapshotStore>,
            Arc::new(LogNotifier),
        ));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_scheduled(
            Arc::clone(&monitor),
            Duration::from_secs(3600),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(monitor.is_running());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(monitor.last_report().is_none());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
        assert!(!monitor.is_running());
    }
}
