//! Producers of the raw supervisor status report.
//!
//! A producer never fails: every invocation problem degrades to an empty
//! report, which the collector turns into `up = 0`.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::{self, Handle};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default supervisor status command.
pub const DEFAULT_STATUS_COMMAND: &str = "gridinit_cmd";
/// Default supervisor status arguments.
pub const DEFAULT_STATUS_ARGS: &[&str] = &["status"];
/// Default deadline for one status command run.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Zero-argument source of status report text.
pub trait ReportProducer: Send + Sync {
    /// Returns the report text, or an empty string if it could not be produced.
    fn fetch(&self) -> String;
}

/// Runs the supervisor status command and captures its standard output.
///
/// The exit status is ignored: `gridinit_cmd status` exits 1 when a process
/// is down and 0 when it cannot reach its socket, so it says nothing about
/// whether the output is usable.
#[derive(Debug, Clone)]
pub struct CommandReportProducer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for CommandReportProducer {
    fn default() -> Self {
        Self::new(
            DEFAULT_STATUS_COMMAND,
            DEFAULT_STATUS_ARGS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_COMMAND_TIMEOUT,
        )
    }
}

impl CommandReportProducer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Human readable command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&self) -> io::Result<String> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the child on expiry kills it; the output pipe goes with it
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no output after {:?}", self.timeout),
                )
            })??;

        debug!("{} exited with {}", self.command_line(), output.status);
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs the command to completion from synchronous code.
    ///
    /// Uses the ambient runtime when called from a blocking worker, otherwise
    /// a private current-thread runtime. Must not be called from async code.
    fn run_blocking(&self) -> io::Result<String> {
        match Handle::try_current() {
            Ok(handle) => handle.block_on(self.run()),
            Err(_) => runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(self.run()),
        }
    }
}

impl ReportProducer for CommandReportProducer {
    fn fetch(&self) -> String {
        match self.run_blocking() {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %self.command_line(), error = %e, "Status command failed");
                String::new()
            }
        }
    }
}

/// Reads a saved status report from a file on every fetch.
#[derive(Debug, Clone)]
pub struct FileReportProducer {
    path: PathBuf,
}

impl FileReportProducer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportProducer for FileReportProducer {
    fn fetch(&self) -> String {
        match fs::read(&self.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read report file");
                String::new()
            }
        }
    }
}

/// Fixed in-memory report.
#[derive(Debug, Clone, Default)]
pub struct StaticReport {
    text: String,
}

impl StaticReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ReportProducer for StaticReport {
    fn fetch(&self) -> String {
        self.text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::NamedTempFile;

    #[cfg(unix)]
    fn sh(script: &str, timeout: Duration) -> CommandReportProducer {
        CommandReportProducer::new("sh", vec!["-c".into(), script.into()], timeout)
    }

    #[cfg(unix)]
    #[test]
    fn test_command_output_captured() {
        let producer = sh(
            "echo 'KEY STATUS PID GROUP'; echo 'svc UP 1 g'",
            Duration::from_secs(5),
        );
        assert_eq!(producer.fetch(), "KEY STATUS PID GROUP\nsvc UP 1 g\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_exit_code_ignored() {
        let producer = sh("echo 'svc DOWN -1 g'; exit 1", Duration::from_secs(5));
        assert_eq!(producer.fetch(), "svc DOWN -1 g\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_stderr_discarded() {
        let producer = sh(
            "echo 'Connection to UNIX socket failed: No such file' >&2",
            Duration::from_secs(5),
        );
        assert_eq!(producer.fetch(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_timeout_yields_empty() {
        let producer = sh("sleep 5", Duration::from_millis(100));
        let start = Instant::now();
        assert_eq!(producer.fetch(), "");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_timeout_with_inherited_stdout() {
        // The shell exits at once but its background child keeps stdout open
        let producer = sh("sleep 5 & echo 'svc UP 1 g'", Duration::from_millis(200));
        let start = Instant::now();
        assert_eq!(producer.fetch(), "");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_command_from_blocking_worker() {
        let producer = sh("echo 'svc UP 1 g'", Duration::from_secs(5));
        let output = tokio::task::spawn_blocking(move || producer.fetch())
            .await
            .unwrap();
        assert_eq!(output, "svc UP 1 g\n");
    }

    #[test]
    fn test_missing_command_yields_empty() {
        let producer = CommandReportProducer::new(
            "definitely-not-a-gridinit-binary",
            vec!["status".into()],
            Duration::from_secs(1),
        );
        assert_eq!(producer.fetch(), "");
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            CommandReportProducer::default().command_line(),
            "gridinit_cmd status"
        );
    }

    #[test]
    fn test_file_producer() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "KEY STATUS PID GROUP\n").unwrap();

        assert_eq!(
            FileReportProducer::new(file.path()).fetch(),
            "KEY STATUS PID GROUP\n"
        );
        assert_eq!(
            FileReportProducer::new("/nonexistent/report.txt").fetch(),
            ""
        );
    }

    #[test]
    fn test_file_producer_invalid_utf8_is_lossy() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), b"svc UP 1 caf\xe9\n").unwrap();

        assert_eq!(
            FileReportProducer::new(file.path()).fetch(),
            "svc UP 1 caf\u{FFFD}\n"
        );
    }
}
