//! Metrics exposition endpoint.

use axum::http::header::CONTENT_TYPE;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use tracing::error;

use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Creates the metrics route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Handler for the /metrics endpoint.
///
/// Evaluates every registered metric on each request and returns them in
/// Prometheus text format. Probe failures only show up as `<probe>_errors`.
async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, HTTPError> {
    let metrics_text = state.metrics.render().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics")
    })?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, state.metrics.content_type())],
        metrics_text,
    ))
}
