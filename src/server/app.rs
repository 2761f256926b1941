//! Main application server.
//!
//! Runs the HTTP surface and the scan scheduler together, with signal
//! handling and graceful shutdown coordination.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::observability::spans;
use super::rest::{create_rest_router, AppState};
use crate::monitor::{run_scheduled, Monitor};
use crate::storage::SqliteSnapshotStore;
use crate::Result;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Period between scheduled scans
    pub scan_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            scan_period: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Application server.
pub struct App {
    config: ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
}

impl App {
    /// Create a new application around a monitor and its store.
    #[must_use]
    pub fn new(config: ServerConfig, monitor: Arc<Monitor>, store: Arc<SqliteSnapshotStore>) -> Self {
        Self {
            config,
            state: AppState::new(monitor, store),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token cancelled when the application shuts down.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Build the router with all endpoints.
    fn router(&self) -> Router {
        create_rest_router(self.state.clone()).layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    spans::request_span(request.method().as_str(), &request.uri().to_string())
                })
                .on_response(
                    |response: &axum::response::Response,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            status = %response.status(),
                            latency_ms = latency.as_millis(),
                            "Request completed"
                        );
                    },
                ),
        )
    }

    /// Run the server and the scheduler until a shutdown signal.
    ///
    /// The server listens for SIGTERM (Unix) and Ctrl+C signals, then
    /// cancels any in-flight scan and gracefully shuts down all connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot start or encounters
    /// a fatal error during execution.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| crate::Error::config(format!("invalid address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            crate::error::ServerError::BindFailed {
                address: addr.to_string(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!(%addr, "Server listening");

        let scheduler = tokio::spawn(run_scheduled(
            Arc::clone(&self.state.monitor),
            self.config.scan_period,
            self.shutdown.clone(),
        ));

        let shutdown = self.shutdown.clone();
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                tokio::select! {
                    () = shutdown_signal() => {}
                    () = shutdown.cancelled() => {}
                }
                shutdown.cancel();
            })
            .await
            .map_err(|e| crate::error::ServerError::Request(e.to_string()));

        self.shutdown.cancel();
        if let Err(e) = scheduler.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }

        served?;
        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ScanSettings;
    use crate::notify::LogNotifier;
    use crate::storage::{init_storage, Database, SnapshotStore};
    use tempfile::TempDir;

    fn app(root: &std::path::Path, port: u16) -> App {
        let db = Database::open_in_memory().unwrap();
        init_storage(&db).unwrap();
        let store = Arc::new(SqliteSnapshotStore::new(db));
        let monitor = Arc::new(Monitor::new(
            ScanSettings::new(root),
            Arc::clone(&store) as Arc<dyn SnapshotStore>,
            Arc::new(LogNotifier),
        ));
        let config = ServerConfig {
            port,
            ..Default::default()
        };
        App::new(config, monitor, store)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.scan_period, Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_run_scans_and_stops_on_shutdown() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "abc").unwrap();

        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = std_listener.local_addr().unwrap().port();
        drop(std_listener);

        let app = app(tmp.path(), port);
        let monitor = Arc::clone(&app.state.monitor);
        let shutdown = app.shutdown_token();
        let handle = tokio::spawn(app.run());

        for _ in 0..200 {
            if monitor.last_report().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(monitor.last_report().unwrap().files, 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
