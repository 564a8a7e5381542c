//! Metrics endpoint handler for Prometheus scraping.
//!
//! Every request runs one collection cycle and returns the freshly
//! populated registry in Prometheus text format.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
};
use openio_exporter::metrics::encode;
use openio_exporter::CollectionResult;
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    // One cycle at a time, from collection until the registry is encoded
    let _scrape = state.scrape_lock.lock().await;

    // Spawning gridinit_cmd and reading /proc block, keep them off the runtime
    let collector = state.collector.clone();
    let result = match tokio::task::spawn_blocking(move || collector.collect()).await {
        Ok(result) => result,
        Err(e) => {
            error!("Collection task failed: {}", e);
            CollectionResult::default()
        }
    };

    state.metrics.observe(&result);

    let elapsed = start.elapsed().as_secs_f64();
    state.metrics.observe_scrape_duration(elapsed);
    state.health_stats.record_cycle(
        result.overall_up,
        result.samples.len(),
        result.diagnostics.len(),
        elapsed,
    );

    let body = encode(&state.registry).map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    debug!(
        "Served {} samples in {:.2}ms",
        result.samples.len(),
        elapsed * 1000.0
    );

    Ok(([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
