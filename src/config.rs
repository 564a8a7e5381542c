//! Configuration management for openio-exporter.
//!
//! This module handles loading and validating configuration files. YAML,
//! JSON and TOML are supported; the format is chosen by file extension.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::metrics::DEFAULT_NAMESPACE;
use crate::procstat::DEFAULT_PROC_ROOT;
use crate::report::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_STATUS_ARGS, DEFAULT_STATUS_COMMAND};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 11010;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
/// Path of the health endpoint, served unless `enable_health` is false.
pub const HEALTH_PATH: &str = "/health";

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Locations searched when no config file is given explicitly.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/openio/openio-exporter.yaml",
    "/etc/openio/openio-exporter.yml",
    "/etc/openio/openio-exporter.json",
    "./openio-exporter.yaml",
    "./openio-exporter.yml",
    "./openio-exporter.json",
];

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,
    #[serde(alias = "telemetry-path")]
    pub metrics_path: Option<String>,

    // Metrics
    pub namespace: Option<String>,

    // Report source
    #[serde(alias = "status-command")]
    pub status_command: Option<String>,
    #[serde(alias = "status-args")]
    pub status_args: Option<Vec<String>>,
    #[serde(alias = "command-timeout-secs")]
    pub command_timeout_secs: Option<u64>,
    /// Read the status report from this file instead of running the command
    #[serde(alias = "report-file")]
    pub report_file: Option<PathBuf>,

    // Process statistics
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    /// Threads for parallel stat lookups (None = sequential, 0 = auto)
    pub parallelism: Option<usize>,

    // Feature flags
    pub enable_health: Option<bool>,
    pub enable_telemetry: Option<bool>,

    // TLS
    pub enable_tls: Option<bool>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            metrics_path: Some(DEFAULT_METRICS_PATH.to_string()),
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            status_command: Some(DEFAULT_STATUS_COMMAND.to_string()),
            status_args: Some(DEFAULT_STATUS_ARGS.iter().map(|s| s.to_string()).collect()),
            command_timeout_secs: Some(DEFAULT_COMMAND_TIMEOUT.as_secs()),
            report_file: None,
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            parallelism: None,
            enable_health: Some(true),
            enable_telemetry: Some(true),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn metrics_path(&self) -> &str {
        self.metrics_path.as_deref().unwrap_or(DEFAULT_METRICS_PATH)
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn status_command(&self) -> &str {
        self.status_command.as_deref().unwrap_or(DEFAULT_STATUS_COMMAND)
    }

    pub fn status_args(&self) -> Vec<String> {
        self.status_args
            .clone()
            .unwrap_or_else(|| DEFAULT_STATUS_ARGS.iter().map(|s| s.to_string()).collect())
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.namespace().is_empty() {
        return Err(ConfigError::Invalid("namespace must not be empty".into()));
    }
    if !cfg
        .namespace()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || cfg.namespace().starts_with(|c: char| c.is_ascii_digit())
    {
        return Err(ConfigError::Invalid(format!(
            "namespace '{}' is not a valid metric name prefix",
            cfg.namespace()
        )));
    }

    if !cfg.metrics_path().starts_with('/') || cfg.metrics_path() == "/" {
        return Err(ConfigError::Invalid(format!(
            "metrics_path '{}' must start with '/' and not be the root path",
            cfg.metrics_path()
        )));
    }

    if cfg.enable_health.unwrap_or(true) && cfg.metrics_path() == HEALTH_PATH {
        return Err(ConfigError::Invalid(format!(
            "metrics_path '{}' collides with the health endpoint",
            HEALTH_PATH
        )));
    }

    if cfg.command_timeout_secs == Some(0) {
        return Err(ConfigError::Invalid(
            "command_timeout_secs must be greater than zero".into(),
        ));
    }

    if cfg.report_file.is_none() && cfg.status_command().trim().is_empty() {
        return Err(ConfigError::Invalid(
            "status_command must not be empty".into(),
        ));
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' must be one of {}",
                level,
                LOG_LEVELS.join(", ")
            )));
        }
    }

    if cfg.enable_tls.unwrap_or(false) {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !has(&cfg.tls_cert_path) || !has(&cfg.tls_key_path) {
            return Err(ConfigError::Invalid(
                "enable_tls requires tls_cert_path and tls_key_path".into(),
            ));
        }
    }

    Ok(())
}

/// Loads a config file, or the first existing default location when `path`
/// is `None`. Returns the default config when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;

    let parse_err = |message: String| ConfigError::Parse {
        path: path.clone(),
        message,
    };

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
    };

    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.port(), 11010);
        assert_eq!(cfg.metrics_path(), "/metrics");
        assert_eq!(cfg.namespace(), "openio");
        assert_eq!(cfg.status_args(), vec!["status".to_string()]);
    }

    #[test]
    fn test_load_yaml_keeps_defaults_for_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "cfg.yaml", "port: 9999\nnamespace: gridinit\n");

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.port(), 9999);
        assert_eq!(cfg.namespace(), "gridinit");
        assert_eq!(cfg.status_command(), "gridinit_cmd");
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = TempDir::new().unwrap();
        let json = write(&dir, "cfg.json", r#"{"command_timeout_secs": 3}"#);
        let toml = write(&dir, "cfg.toml", "metrics_path = \"/probe\"\n");

        assert_eq!(
            load_config(Some(&json)).unwrap().command_timeout(),
            Duration::from_secs(3)
        );
        assert_eq!(load_config(Some(&toml)).unwrap().metrics_path(), "/probe");
    }

    #[test]
    fn test_load_kebab_case_aliases() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "cfg.yaml",
            "status-command: /usr/bin/gridinit_cmd\nstatus-args: [\"-S\", \"/run/gridinit.sock\", \"status\"]\n",
        );

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.status_command(), "/usr/bin/gridinit_cmd");
        assert_eq!(cfg.status_args().len(), 3);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "cfg.yaml", "port: [not, a, port]\n");

        assert!(matches!(
            load_config(Some(&bad)),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            load_config(Some(Path::new("/nonexistent/openio.yaml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            Config {
                namespace: Some(String::new()),
                ..Config::default()
            },
            Config {
                namespace: Some("open-io".into()),
                ..Config::default()
            },
            Config {
                metrics_path: Some("metrics".into()),
                ..Config::default()
            },
            Config {
                command_timeout_secs: Some(0),
                ..Config::default()
            },
            Config {
                enable_tls: Some(true),
                tls_cert_path: Some("/etc/ssl/cert.pem".into()),
                ..Config::default()
            },
            Config {
                log_level: Some("verbose".into()),
                ..Config::default()
            },
            Config {
                metrics_path: Some("/health".into()),
                ..Config::default()
            },
        ];

        for cfg in cases {
            assert!(
                validate_effective_config(&cfg).is_err(),
                "expected invalid: {:?}",
                cfg
            );
        }
    }

    #[test]
    fn test_metrics_path_may_reuse_health_path_when_disabled() {
        let cfg = Config {
            metrics_path: Some("/health".into()),
            enable_health: Some(false),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_validate_tls_complete() {
        let cfg = Config {
            enable_tls: Some(true),
            tls_cert_path: Some("/etc/ssl/cert.pem".into()),
            tls_key_path: Some("/etc/ssl/key.pem".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_ok());
    }
}
