//! Probe information endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::debug;

use crate::state::AppState;

/// Registers probe information routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/probes", get(list_probes))
}

/// GET /probes: name, type, fields and uptime of every registered probe.
async fn list_probes(State(state): State<AppState>) -> Json<Value> {
    let probes: Vec<Value> = state
        .metrics
        .probes()
        .iter()
        .map(|probe| {
            json!({
                "name": probe.get_name(),
                "type": probe.get_type(),
                "fields": probe.get_fields(),
                "uptime_seconds": probe.get_uptime().as_secs_f64(),
            })
        })
        .collect();

    debug!("Returning probe list. Number of probes: {}", probes.len());
    Json(json!({
        "poll_interval_ms": state.config.poll_interval_ms,
        "probes": probes,
    }))
}
