//! REST API endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::metrics;
use crate::monitor::{Monitor, ScanAttempt};
use crate::storage::{ScanRun, SqliteSnapshotStore};

const RECENT_RUNS: usize = 10;

/// Shared state for the REST handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Scan monitor.
    pub monitor: Arc<Monitor>,
    /// Store backing the monitor, for health and statistics.
    pub store: Arc<SqliteSnapshotStore>,
}

impl AppState {
    /// Create handler state.
    #[must_use]
    pub const fn new(monitor: Arc<Monitor>, store: Arc<SqliteSnapshotStore>) -> Self {
        Self { monitor, store }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create REST API router.
pub fn create_rest_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
        .route("/api/v1/status", get(status))
        .route("/api/v1/scan", post(trigger_scan))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match state.store.database().health_check() {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            "error"
        }
    };

    let response = HealthResponse {
        status: if db_status == "ok" {
            "healthy"
        } else {
            "unhealthy"
        }
        .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status.to_string(),
    };

    let status_code = if db_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(status = ?status_code, database = %db_status, "Health check");

    (status_code, Json(response))
}

/// Prometheus metrics endpoint.
async fn metrics_text() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::render(),
    )
}

/// Status endpoint with statistics.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let tracked_files = state.store.tracked_files().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to count tracked files");
        0
    });

    let recent: Vec<ScanRun> = state
        .monitor
        .store()
        .recent_runs(RECENT_RUNS)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load scan history");
            Vec::new()
        });

    let settings = state.monitor.settings();

    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "root": settings.root.display().to_string(),
        "exclusions": settings.exclusions.iter().collect::<Vec<_>>(),
        "first_run": settings.first_run,
        "scanning": state.monitor.is_running(),
        "tracked_files": tracked_files,
        "last_report": state.monitor.last_report(),
        "recent_runs": recent,
    }))
}

/// Manual "scan now" trigger.
async fn trigger_scan(State(state): State<AppState>) -> axum::response::Response {
    match state.monitor.scan_now_async().await {
        Ok(ScanAttempt::Completed(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(ScanAttempt::Skipped) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "a scan is already running".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Manual scan failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ScanSettings;
    use crate::notify::LogNotifier;
    use crate::storage::{init_storage, Database};
    use axum::body::Body;
    use axum::http::Request;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn create_test_state(root: &Path) -> AppState {
        let db = Database::open_in_memory().unwrap();
        init_storage(&db).unwrap();
        let store = Arc::new(SqliteSnapshotStore::new(db));
        let monitor = Arc::new(Monitor::new(
            ScanSettings::new(root),
            Arc::clone(&store) as Arc<dyn crate::storage::SnapshotStore>,
            Arc::new(LogNotifier),
        ));
        AppState::new(monitor, store)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn scan_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/scan")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let tmp = TempDir::new().unwrap();
        let app = create_rest_router(create_test_state(tmp.path()));

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_metrics() {
        let tmp = TempDir::new().unwrap();
        metrics::init_metrics();
        let app = create_rest_router(create_test_state(tmp.path()));

        let response = app.oneshot(get_request("/metrics")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_before_first_scan() {
        let tmp = TempDir::new().unwrap();
        let app = create_rest_router(create_test_state(tmp.path()));

        let response = app.oneshot(get_request("/api/v1/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["scanning"], false);
        assert_eq!(json["tracked_files"], 0);
        assert!(json["last_report"].is_null());
    }

    #[tokio::test]
    async fn test_scan_then_status() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("index.php"), "<?php").unwrap();
        let state = create_test_state(tmp.path());

        let response = create_rest_router(state.clone())
            .oneshot(scan_request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["files"], 1);
        assert_eq!(report["changes"], serde_json::json!([]));

        let response = create_rest_router(state)
            .oneshot(get_request("/api/v1/status"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["tracked_files"], 1);
        assert_eq!(json["recent_runs"].as_array().unwrap().len(), 1);
        assert_eq!(json["last_report"]["id"], report["id"]);
    }

    #[tokio::test]
    async fn test_scan_conflict_while_running() {
        let tmp = TempDir::new().unwrap();
        let state = create_test_state(tmp.path());
        let _held = state.monitor.guard().try_acquire().unwrap();

        let response = create_rest_router(state)
            .oneshot(scan_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_scan_failure_is_500() {
        let tmp = TempDir::new().unwrap();
        let state = create_test_state(&tmp.path().join("missing"));

        let response = create_rest_router(state)
            .oneshot(scan_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("does not exist"));
    }
}
