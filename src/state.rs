//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use openio_exporter::{Collector, Config, ExporterMetrics, HealthStats};
use prometheus::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Registry,
    pub metrics: ExporterMetrics,
    pub collector: Arc<Collector>,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    /// Held from collection through encoding so concurrent scrapes never
    /// interleave in the shared metric vectors.
    pub scrape_lock: Mutex<()>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use openio_exporter::{ProcfsStatProvider, StaticReport};

    /// State whose collector serves `report`; stats come from an empty proc root.
    pub fn state_with_report(report: &str) -> SharedState {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new(&registry, "openio", false).unwrap();
        let collector = Collector::new(
            Box::new(StaticReport::new(report)),
            Box::new(ProcfsStatProvider::new("/nonexistent-proc")),
        );

        Arc::new(AppState {
            registry,
            metrics,
            collector: Arc::new(collector),
            config: Arc::new(Config::default()),
            health_stats: Arc::new(HealthStats::new()),
            scrape_lock: Mutex::new(()),
        })
    }
}
