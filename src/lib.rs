//! OpenIO Exporter Library
//!
//! Core of a Prometheus exporter for processes supervised by gridinit. One
//! collection cycle runs the supervisor status command, parses its table,
//! joins every reported process with `/proc/<pid>/stat` and hands the result
//! to the metrics layer.
//!
//! # Usage
//!
//! ```rust
//! use openio_exporter::{Collector, ProcStat, StatError, StatProvider, StaticReport};
//!
//! struct FixedStats;
//!
//! impl StatProvider for FixedStats {
//!     fn lookup(&self, pid: i32) -> Result<ProcStat, StatError> {
//!         Ok(ProcStat {
//!             virtual_memory_bytes: 100 * pid as u64,
//!             resident_memory_bytes: 1000 * pid as u64,
//!             cpu_seconds: 10.0 * pid as f64,
//!             start_time_seconds: 10000.0 * pid as f64,
//!         })
//!     }
//! }
//!
//! let report = "KEY STATUS PID GROUP\nOPENIO-account-0 UP 1 OPENIO,account,0\n";
//! let collector = Collector::new(Box::new(StaticReport::new(report)), Box::new(FixedStats));
//!
//! let result = collector.collect();
//! assert!(result.overall_up);
//! assert_eq!(result.samples.len(), 1);
//! assert_eq!(result.samples[0].virtual_memory_bytes, Some(100));
//! ```

pub mod classifier;
pub mod collector;
pub mod config;
pub mod health_stats;
pub mod joiner;
pub mod metrics;
pub mod procstat;
pub mod report;
pub mod status;

// Re-export main types for convenience
pub use classifier::{classify, Classification};
pub use collector::{CollectionResult, Collector, Diagnostic};
pub use config::{Config, ConfigError};
pub use health_stats::HealthStats;
pub use joiner::{join, Joined, ProcessSample};
pub use metrics::ExporterMetrics;
pub use procstat::{ProcStat, ProcfsStatProvider, StatError, StatProvider};
pub use report::{CommandReportProducer, FileReportProducer, ReportProducer, StaticReport};
pub use status::{parse_status_line, ParseError, StatusRecord, HEADER_KEY};
