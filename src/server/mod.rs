//! HTTP surface and observability.
//!
//! This module provides:
//! - REST API using axum (health, metrics, status, manual scan)
//! - The application runner combining server and scheduler
//! - Tracing setup and Prometheus metrics

mod app;
pub mod metrics;
pub mod observability;
mod rest;

pub use app::{App, ServerConfig};
pub use metrics::init_metrics;
pub use observability::init_tracing;
pub use rest::{create_rest_router, AppState, HealthResponse};
