//! Running statistics over collection cycles, rendered by `/health`.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Clone, Copy, Default)]
struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = RunningStat {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

#[derive(Default)]
struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (current, average, max, min).
    fn snapshot(&self) -> (f64, f64, f64, f64) {
        self.inner
            .lock()
            .map(|s| (s.last, s.avg(), s.max, s.min))
            .unwrap_or_default()
    }
}

/// Statistics over every collection cycle since startup.
pub struct HealthStats {
    samples: Stat,
    diagnostics: Stat,
    cycle_duration_seconds: Stat,
    total_cycles: AtomicU64,
    last_cycle_up: AtomicBool,
    started: Instant,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Self {
            samples: Stat::default(),
            diagnostics: Stat::default(),
            cycle_duration_seconds: Stat::default(),
            total_cycles: AtomicU64::new(0),
            last_cycle_up: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    pub fn record_cycle(&self, up: bool, samples: usize, diagnostics: usize, duration_seconds: f64) {
        self.samples.add_sample(samples as f64);
        self.diagnostics.add_sample(diagnostics as f64);
        self.cycle_duration_seconds.add_sample(duration_seconds);
        self.last_cycle_up.store(up, Ordering::Relaxed);
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles.load(Ordering::Relaxed)
    }

    /// Whether the most recent cycle saw at least one process row.
    pub fn last_cycle_up(&self) -> bool {
        self.last_cycle_up.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn render_table(&self) -> String {
        let left_col = 22usize;
        let col_w = 12usize;

        let mut out = String::new();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(out, "{}", "-".repeat(left_col + 3 + (col_w + 3) * 4)).ok();

        let rows = [
            ("samples", &self.samples, 0usize),
            ("diagnostics", &self.diagnostics, 0),
            ("cycle duration (s)", &self.cycle_duration_seconds, 3),
        ];
        for (label, stat, precision) in rows {
            let (cur, avg, max, min) = stat.snapshot();
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                format!("{:.p$}", cur, p = precision),
                format!("{:.p$}", avg, p = precision.max(1)),
                format!("{:.p$}", max, p = precision),
                format!("{:.p$}", min, p = precision),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "number of collection cycles: {}", self.total_cycles()).ok();
        writeln!(out, "uptime (s): {}", self.uptime_seconds()).ok();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut s = RunningStat::default();
        for v in [3.0, 1.0, 5.0] {
            s.add(v);
        }
        assert_eq!(s.count, 3);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.last, 5.0);
        assert!((s.avg() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stat_snapshot() {
        let stat = Stat::default();
        assert_eq!(stat.snapshot(), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_record_cycle() {
        let stats = HealthStats::new();
        assert!(!stats.last_cycle_up());

        stats.record_cycle(true, 16, 0, 0.05);
        stats.record_cycle(false, 0, 1, 0.01);

        assert_eq!(stats.total_cycles(), 2);
        assert!(!stats.last_cycle_up());
        assert_eq!(stats.samples.snapshot(), (0.0, 8.0, 16.0, 0.0));
    }

    #[test]
    fn test_render_table() {
        let stats = HealthStats::new();
        stats.record_cycle(true, 16, 2, 0.125);

        let table = stats.render_table();
        assert!(table.contains("samples"));
        assert!(table.contains("cycle duration (s)"));
        assert!(table.contains("0.125"));
        assert!(table.contains("number of collection cycles: 1"));
    }
}
