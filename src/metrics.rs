//! Prometheus metrics definitions for openio-exporter.
//!
//! This module defines the metric vectors a collection cycle is rendered
//! into. They are built once at startup against an explicit registry and
//! repopulated from scratch on every scrape.

use prometheus::{CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashSet;
use tracing::warn;

use crate::collector::CollectionResult;

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "openio";

const PROCESS_LABELS: &[&str] = &["pid", "group"];

/// Collection of Prometheus metrics for supervised processes.
#[derive(Clone)]
pub struct ExporterMetrics {
    pub up: Gauge,
    pub process_up: GaugeVec,
    pub virtual_memory: GaugeVec,
    pub resident_memory: GaugeVec,
    pub cpu_seconds: CounterVec,
    pub start_time: GaugeVec,

    // Exporter self-telemetry, absent when disabled
    pub telemetry: Option<TelemetryMetrics>,
}

/// Metrics about the exporter itself.
#[derive(Clone)]
pub struct TelemetryMetrics {
    pub scrape_duration: Gauge,
    pub processes_total: Gauge,
    pub diagnostics: Gauge,
    pub build_info: GaugeVec,
}

impl ExporterMetrics {
    /// Creates and registers all metrics with the registry.
    pub fn new(
        registry: &Registry,
        namespace: &str,
        enable_telemetry: bool,
    ) -> Result<Self, prometheus::Error> {
        let up = Gauge::with_opts(
            Opts::new("up", "Was the last run of gridinit_cmd successful.").namespace(namespace),
        )?;
        let process_up = GaugeVec::new(
            Opts::new("process_up", "Status of the process (1 = UP, 0 = DOWN).")
                .namespace(namespace),
            PROCESS_LABELS,
        )?;
        let virtual_memory = GaugeVec::new(
            Opts::new(
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes.",
            )
            .namespace(namespace),
            PROCESS_LABELS,
        )?;
        let resident_memory = GaugeVec::new(
            Opts::new(
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
            )
            .namespace(namespace),
            PROCESS_LABELS,
        )?;
        let cpu_seconds = CounterVec::new(
            Opts::new(
                "process_cpu_seconds_total",
                "Total user and system CPU time spent in seconds.",
            )
            .namespace(namespace),
            PROCESS_LABELS,
        )?;
        let start_time = GaugeVec::new(
            Opts::new(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
            )
            .namespace(namespace),
            PROCESS_LABELS,
        )?;

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(process_up.clone()))?;
        registry.register(Box::new(virtual_memory.clone()))?;
        registry.register(Box::new(resident_memory.clone()))?;
        registry.register(Box::new(cpu_seconds.clone()))?;
        registry.register(Box::new(start_time.clone()))?;

        let telemetry = if enable_telemetry {
            Some(TelemetryMetrics::new(registry, namespace)?)
        } else {
            None
        };

        Ok(Self {
            up,
            process_up,
            virtual_memory,
            resident_memory,
            cpu_seconds,
            start_time,
            telemetry,
        })
    }

    /// Resets all per-process metrics (used before updating with fresh data).
    pub fn reset(&self) {
        self.process_up.reset();
        self.virtual_memory.reset();
        self.resident_memory.reset();
        self.cpu_seconds.reset();
        self.start_time.reset();
    }

    /// Replaces the exported values with the content of one collection cycle.
    ///
    /// Stat metrics are only set for samples that carry them.
    pub fn observe(&self, result: &CollectionResult) {
        for (pid, group) in duplicate_label_sets(result) {
            warn!(pid, group, "Duplicate process label set, last row wins");
        }

        self.reset();
        self.up.set(if result.overall_up { 1.0 } else { 0.0 });

        for sample in &result.samples {
            let labels = &[sample.pid_label.as_str(), sample.group.as_str()];

            self.process_up
                .with_label_values(labels)
                .set(if sample.up { 1.0 } else { 0.0 });

            if let Some(v) = sample.virtual_memory_bytes {
                self.virtual_memory.with_label_values(labels).set(v as f64);
            }
            if let Some(v) = sample.resident_memory_bytes {
                self.resident_memory.with_label_values(labels).set(v as f64);
            }
            if let Some(v) = sample.cpu_seconds {
                // Counter children only go up; start from zero so a repeated
                // label set keeps set semantics
                let counter = self.cpu_seconds.with_label_values(labels);
                counter.reset();
                counter.inc_by(v.max(0.0));
            }
            if let Some(v) = sample.start_time_seconds {
                self.start_time.with_label_values(labels).set(v);
            }
        }

        if let Some(t) = &self.telemetry {
            t.processes_total.set(result.samples.len() as f64);
            t.diagnostics.set(result.diagnostics.len() as f64);
        }
    }

    /// Records how long the last scrape took.
    pub fn observe_scrape_duration(&self, seconds: f64) {
        if let Some(t) = &self.telemetry {
            t.scrape_duration.set(seconds);
        }
    }
}

impl TelemetryMetrics {
    fn new(registry: &Registry, namespace: &str) -> Result<Self, prometheus::Error> {
        let scrape_duration = Gauge::with_opts(
            Opts::new(
                "exporter_scrape_duration_seconds",
                "Time spent running the last collection cycle",
            )
            .namespace(namespace),
        )?;
        let processes_total = Gauge::with_opts(
            Opts::new(
                "exporter_processes_total",
                "Number of processes reported in the last collection cycle",
            )
            .namespace(namespace),
        )?;
        let diagnostics = Gauge::with_opts(
            Opts::new(
                "exporter_diagnostics",
                "Number of non-fatal problems seen in the last collection cycle",
            )
            .namespace(namespace),
        )?;
        let build_info = GaugeVec::new(
            Opts::new("exporter_build_info", "Build information of the exporter")
                .namespace(namespace),
            &["version"],
        )?;
        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION")])
            .set(1.0);

        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(processes_total.clone()))?;
        registry.register(Box::new(diagnostics.clone()))?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            scrape_duration,
            processes_total,
            diagnostics,
            build_info,
        })
    }
}

/// Returns the `(pid, group)` label sets that appear more than once in
/// `result`, once per repeated row.
pub fn duplicate_label_sets(result: &CollectionResult) -> Vec<(&str, &str)> {
    let mut seen = HashSet::new();
    result
        .samples
        .iter()
        .map(|s| (s.pid_label.as_str(), s.group.as_str()))
        .filter(|labels| !seen.insert(*labels))
        .collect()
}

/// Encodes every metric of `registry` in the Prometheus text format.
pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
