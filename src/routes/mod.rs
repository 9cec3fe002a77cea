//! HTTP route definitions and handlers.
//!
//! This module organizes all HTTP endpoints into logical groups:
//! metrics exposition, probe information, and health checks.

mod health_routes;
mod metrics;
mod probe_routes;

use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(metrics::routes())
        .merge(probe_routes::routes())
        .merge(health_routes::routes())
        .with_state(state)
}
