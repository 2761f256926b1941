//! Single-flight guard for scan cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Ensures at most one scan cycle runs at a time.
///
/// Cloning the guard shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ScanGuard {
    running: Arc<AtomicBool>,
}

impl ScanGuard {
    /// Create an idle guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a cycle is already running.
    #[must_use]
    pub fn try_acquire(&self) -> Option<ScanPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanPermit {
                running: Arc::clone(&self.running),
            })
    }

    /// Whether a cycle currently holds the guard.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Held for the duration of one cycle; releases the guard on drop.
#[derive(Debug)]
pub struct ScanPermit {
    running: Arc<AtomicBool>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let guard = ScanGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());
    }

    #[test]
    fn test_drop_releases() {
        let guard = ScanGuard::new();
        drop(guard.try_acquire().unwrap());
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let guard = ScanGuard::new();
        let other = guard.clone();
        let _permit = guard.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_released_when_holder_panics() {
        let guard = ScanGuard::new();
        let inner = guard.clone();
        let result = std::thread::spawn(move || {
            let _permit = inner.try_acquire().unwrap();
            panic!("cycle failed");
        })
        .join();

        assert!(result.is_err());
        assert!(!guard.is_running());
    }
}
