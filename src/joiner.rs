//! Joins status records with per-process statistics.

use serde::Serialize;
use tracing::warn;

use crate::collector::Diagnostic;
use crate::procstat::{ProcStat, StatProvider};
use crate::status::StatusRecord;

/// Per-process metric bundle for one collection cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSample {
    /// Numeric pid, if the pid column parsed as an integer.
    pub pid: Option<i32>,
    /// Pid column as reported, used as the `pid` label.
    pub pid_label: String,
    pub group: String,
    pub up: bool,
    pub virtual_memory_bytes: Option<u64>,
    pub resident_memory_bytes: Option<u64>,
    pub cpu_seconds: Option<f64>,
    pub start_time_seconds: Option<f64>,
}

impl ProcessSample {
    fn without_stats(record: &StatusRecord, pid: Option<i32>, up: bool) -> Self {
        Self {
            pid,
            pid_label: record.pid.clone(),
            group: record.group.clone(),
            up,
            virtual_memory_bytes: None,
            resident_memory_bytes: None,
            cpu_seconds: None,
            start_time_seconds: None,
        }
    }

    fn with_stats(record: &StatusRecord, pid: i32, stat: ProcStat) -> Self {
        Self {
            virtual_memory_bytes: Some(stat.virtual_memory_bytes),
            resident_memory_bytes: Some(stat.resident_memory_bytes),
            cpu_seconds: Some(stat.cpu_seconds),
            start_time_seconds: Some(stat.start_time_seconds),
            ..Self::without_stats(record, Some(pid), true)
        }
    }

    /// Returns true when the OS statistics were joined into this sample.
    pub fn has_stats(&self) -> bool {
        self.virtual_memory_bytes.is_some()
    }
}

/// Outcome of joining one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub sample: ProcessSample,
    pub diagnostic: Option<Diagnostic>,
}

impl Joined {
    fn clean(sample: ProcessSample) -> Self {
        Self {
            sample,
            diagnostic: None,
        }
    }
}

/// Builds the sample for `record`, looking up process statistics when the
/// process is up and has a real pid.
///
/// A failed lookup only degrades this sample; it is reported through the
/// returned diagnostic.
pub fn join(record: &StatusRecord, status_up: bool, stats: &dyn StatProvider) -> Joined {
    let parsed_pid = record.pid.parse::<i32>();

    if !status_up {
        return Joined::clean(ProcessSample::without_stats(
            record,
            parsed_pid.ok(),
            false,
        ));
    }

    let pid = match parsed_pid {
        Ok(pid) => pid,
        Err(_) => {
            warn!(key = %record.key, pid = %record.pid, "Invalid PID");
            return Joined {
                sample: ProcessSample::without_stats(record, None, true),
                diagnostic: Some(Diagnostic::InvalidPid {
                    key: record.key.clone(),
                    pid: record.pid.clone(),
                }),
            };
        }
    };

    // gridinit reports -1 (or 0) while a process has no pid yet
    if pid < 1 {
        return Joined::clean(ProcessSample::without_stats(record, Some(pid), true));
    }

    match stats.lookup(pid) {
        Ok(stat) => Joined::clean(ProcessSample::with_stats(record, pid, stat)),
        Err(e) => {
            warn!(key = %record.key, pid, error = %e, "Process stat lookup failed");
            Joined {
                sample: ProcessSample::without_stats(record, Some(pid), true),
                diagnostic: Some(Diagnostic::StatLookupFailed {
                    key: record.key.clone(),
                    pid,
                    error: e.to_string(),
                }),
            }
        }
    }
}
