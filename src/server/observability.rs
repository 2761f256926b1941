//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Structured logging with JSON output option
//! - Configurable log levels, overridable through `RUST_LOG`
//! - Spans for scan cycles and HTTP requests

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Panics
///
/// Panics if tracing subscriber has already been initialized in this process.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!("Tracing initialized: level={}, json={}", level, json);
}

/// Span constructors shared by the scan cycle and the HTTP layer.
pub mod spans {
    use tracing::{info_span, Span};

    /// Span covering one scan cycle.
    #[must_use]
    pub fn scan_span(run_id: &str, root: &str) -> Span {
        info_span!(
            "scan_cycle",
            run_id = %run_id,
            root = %root,
        )
    }

    /// Span covering one HTTP request.
    #[must_use]
    pub fn request_span(method: &str, uri: &str) -> Span {
        info_span!(
            "request",
            method = %method,
            uri = %uri,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_span() {
        let span = spans::scan_span("run-1", "/srv/www");
        let _guard = span.enter();
    }

    #[test]
    fn test_request_span() {
        let span = spans::request_span("POST", "/api/v1/scan");
        let _guard = span.enter();
    }
}
