//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Completed, failed and skipped scan cycles.
pub static SCANS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "sizewatch_scans_total",
        "Total number of scan cycles by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Files in the most recently saved snapshot.
pub static FILES_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "sizewatch_files_tracked",
        "Number of files in the current snapshot"
    )
    .unwrap()
});

/// Size changes reported.
pub static CHANGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("sizewatch_changes_total", "Total number of size changes reported")
        .unwrap()
});

/// Subtrees or entries skipped during scans.
pub static SCAN_WARNINGS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "sizewatch_scan_warnings_total",
        "Total number of entries skipped while scanning"
    )
    .unwrap()
});

/// Failed notification deliveries.
pub static NOTIFY_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "sizewatch_notify_failures_total",
        "Total number of failed notification deliveries"
    )
    .unwrap()
});

/// Scan cycle duration.
pub static SCAN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "sizewatch_scan_duration_seconds",
        "Scan cycle duration in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]
    )
    .unwrap()
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*SCANS_TOTAL;
    let _ = &*FILES_TRACKED;
    let _ = &*CHANGES_TOTAL;
    let _ = &*SCAN_WARNINGS_TOTAL;
    let _ = &*NOTIFY_FAILURES_TOTAL;
    let _ = &*SCAN_DURATION;

    tracing::debug!("Prometheus metrics initialized");
}

/// Encode the default registry in the Prometheus text format.
#[must_use]
pub fn render() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_init() {
        init_metrics();

        FILES_TRACKED.set(100);
        assert_eq!(FILES_TRACKED.get(), 100);

        let before = SCANS_TOTAL.with_label_values(&["skipped"]).get();
        SCANS_TOTAL.with_label_values(&["skipped"]).inc();
        assert_eq!(SCANS_TOTAL.with_label_values(&["skipped"]).get(), before + 1);
    }

    #[test]
    fn test_render_contains_metric_names() {
        init_metrics();
        SCANS_TOTAL.with_label_values(&["completed"]).inc_by(0);
        SCAN_DURATION.observe(0.2);

        let text = render();
        assert!(text.contains("sizewatch_files_tracked"));
        assert!(text.contains("sizewatch_scan_duration_seconds"));
    }
}
