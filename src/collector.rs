//! Collection cycle: fetch the status report, parse it, join process stats.
//!
//! A `Collector` holds no state between cycles. Callers that share one
//! instance between concurrent scrapes must serialize `collect()` calls
//! themselves (the HTTP layer does so with its scrape lock).

use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::classifier::classify;
use crate::config::Config;
use crate::joiner::{join, ProcessSample};
use crate::procstat::{ProcfsStatProvider, StatProvider};
use crate::report::{CommandReportProducer, FileReportProducer, ReportProducer};
use crate::status::{parse_status_line, StatusRecord};

/// Non-fatal observation made during a collection cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    MalformedLine { line: String },
    UnknownStatus { key: String, status: String },
    InvalidPid { key: String, pid: String },
    StatLookupFailed { key: String, pid: i32, error: String },
}

/// Result of one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionResult {
    /// True when the report contained at least one process row.
    pub overall_up: bool,
    /// Samples in report order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<ProcessSample>,
    // TOML refuses a plain value after the samples tables
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Drives parser, classifier and joiner over one status report.
pub struct Collector {
    producer: Box<dyn ReportProducer>,
    stats: Box<dyn StatProvider>,
    parallel_lookups: bool,
}

impl Collector {
    pub fn new(producer: Box<dyn ReportProducer>, stats: Box<dyn StatProvider>) -> Self {
        Self {
            producer,
            stats,
            parallel_lookups: false,
        }
    }

    /// Builds the production collector: the status command (or a saved
    /// report file) joined with the proc filesystem.
    pub fn from_config(cfg: &Config) -> Self {
        let producer: Box<dyn ReportProducer> = match &cfg.report_file {
            Some(path) => Box::new(FileReportProducer::new(path)),
            None => Box::new(CommandReportProducer::new(
                cfg.status_command(),
                cfg.status_args(),
                cfg.command_timeout(),
            )),
        };

        Self::new(producer, Box::new(ProcfsStatProvider::new(cfg.proc_root())))
            .with_parallel_lookups(cfg.parallelism.is_some())
    }

    /// Runs stat lookups of one cycle on the rayon pool. Sample order is
    /// unaffected.
    pub fn with_parallel_lookups(mut self, enabled: bool) -> Self {
        self.parallel_lookups = enabled;
        self
    }

    /// Runs one collection cycle.
    #[instrument(skip(self))]
    pub fn collect(&self) -> CollectionResult {
        let start = Instant::now();
        let report = self.producer.fetch();

        let mut result = CollectionResult::default();
        let mut pending: Vec<(StatusRecord, bool)> = Vec::new();

        for line in report.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let record = match parse_status_line(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = %line, error = %e, "Malformed status line");
                    result.diagnostics.push(Diagnostic::MalformedLine {
                        line: line.to_string(),
                    });
                    continue;
                }
            };

            if record.is_header() {
                continue;
            }

            // Any process row means gridinit answered, whatever the process states
            result.overall_up = true;

            let class = classify(&record);
            if class.warning {
                warn!(line = %line, "Unknown process status");
                result.diagnostics.push(Diagnostic::UnknownStatus {
                    key: record.key.clone(),
                    status: record.status.clone(),
                });
            }

            pending.push((record, class.up));
        }

        let stats = self.stats.as_ref();
        let joined: Vec<_> = if self.parallel_lookups {
            pending
                .par_iter()
                .map(|(record, up)| join(record, *up, stats))
                .collect()
        } else {
            pending
                .iter()
                .map(|(record, up)| join(record, *up, stats))
                .collect()
        };

        for j in joined {
            result.samples.push(j.sample);
            result.diagnostics.extend(j.diagnostic);
        }

        debug!(
            "Collection cycle finished: up={}, {} samples, {} diagnostics, {:.2}ms",
            result.overall_up,
            result.samples.len(),
            result.diagnostics.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        result
    }
}
