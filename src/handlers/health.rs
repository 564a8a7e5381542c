//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! collection cycle statistics.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let stats = &state.health_stats;

    // Derive HTTP status from the last collection cycle
    let (status, message) = if stats.total_cycles() == 0 {
        (StatusCode::OK, "OK - no collection cycle yet")
    } else if stats.last_cycle_up() {
        (StatusCode::OK, "OK")
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Last collection cycle returned no processes",
        )
    };

    let table = stats.render_table();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("{message}\n\n{table}"),
    )
}
