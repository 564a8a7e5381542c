//! Per-process statistics from the /proc filesystem.
//!
//! This module defines the `StatProvider` seam used by the joiner and the
//! procfs-backed implementation reading `/proc/<pid>/stat`.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default mount point of the proc filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// Get the memory page size in bytes.
fn get_page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_PAGESIZE
        unsafe {
            let size = libc::sysconf(libc::_SC_PAGESIZE);
            if size > 0 {
                return size as u64;
            }
        }
    }
    4096
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Memory page size (for resident memory calculation).
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// Statistics of a single process as exported per sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcStat {
    pub virtual_memory_bytes: u64,
    pub resident_memory_bytes: u64,
    pub cpu_seconds: f64,
    /// Seconds since the unix epoch.
    pub start_time_seconds: f64,
}

/// Errors from a process statistics lookup.
#[derive(Debug, Error)]
pub enum StatError {
    #[error("process {pid} not found")]
    NotFound { pid: i32 },

    #[error("failed to read stats of process {pid}: {source}")]
    Io {
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("malformed stats for process {pid}: {reason}")]
    Malformed { pid: i32, reason: String },
}

impl StatError {
    fn from_io(pid: i32, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StatError::NotFound { pid }
        } else {
            StatError::Io { pid, source: err }
        }
    }
}

/// Source of per-process statistics, keyed by pid.
pub trait StatProvider: Send + Sync {
    fn lookup(&self, pid: i32) -> Result<ProcStat, StatError>;
}

/// Reads process statistics from a proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcfsStatProvider {
    root: PathBuf,
}

impl Default for ProcfsStatProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcfsStatProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the system boot time (`btime`) from `<root>/stat`.
    fn boot_time_seconds(&self, pid: i32) -> Result<u64, StatError> {
        let content =
            fs::read_to_string(self.root.join("stat")).map_err(|e| StatError::Io { pid, source: e })?;
        parse_boot_time(&content).ok_or_else(|| StatError::Malformed {
            pid,
            reason: "btime missing from system stat".to_string(),
        })
    }
}

impl StatProvider for ProcfsStatProvider {
    fn lookup(&self, pid: i32) -> Result<ProcStat, StatError> {
        let stat_path = self.root.join(pid.to_string()).join("stat");
        let content = fs::read_to_string(stat_path).map_err(|e| StatError::from_io(pid, e))?;

        let raw = parse_pid_stat(&content).map_err(|reason| StatError::Malformed { pid, reason })?;
        let boot_time = self.boot_time_seconds(pid)?;

        Ok(ProcStat {
            virtual_memory_bytes: raw.vsize,
            resident_memory_bytes: raw.rss_pages.max(0) as u64 * *PAGE_SIZE,
            cpu_seconds: (raw.utime + raw.stime) as f64 / *CLK_TCK,
            start_time_seconds: boot_time as f64 + raw.starttime as f64 / *CLK_TCK,
        })
    }
}

/// Fields of `/proc/<pid>/stat` needed for a sample, in raw kernel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawPidStat {
    utime: u64,
    stime: u64,
    starttime: u64,
    vsize: u64,
    rss_pages: i64,
}

/// Parses `/proc/<pid>/stat`.
///
/// The comm field may contain spaces and parentheses, so fields are counted
/// from the last `)`. Field 3 (state) is index 0 of the remainder.
fn parse_pid_stat(content: &str) -> Result<RawPidStat, String> {
    let rest = content
        .rfind(')')
        .map(|idx| &content[idx + 1..])
        .ok_or_else(|| "missing comm field".to_string())?;

    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() <= 21 {
        return Err(format!(
            "expected at least 22 fields after comm, got {}",
            parts.len()
        ));
    }

    fn field<T: std::str::FromStr>(parts: &[&str], idx: usize, name: &str) -> Result<T, String> {
        parts[idx]
            .parse()
            .map_err(|_| format!("invalid {name} field '{}'", parts[idx]))
    }

    Ok(RawPidStat {
        utime: field(&parts, 11, "utime")?,
        stime: field(&parts, 12, "stime")?,
        starttime: field(&parts, 19, "starttime")?,
        vsize: field(&parts, 20, "vsize")?,
        rss_pages: field(&parts, 21, "rss")?,
    })
}

/// Extracts `btime` (boot time, seconds since epoch) from `/proc/stat`.
fn parse_boot_time(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
}
