//! CLI arguments and subcommands for openio-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands, and merges them over the
//! configuration file.

use clap::{Parser, Subcommand, ValueEnum};
use openio_exporter::config::{load_config, Config, ConfigError};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "openio-exporter",
    about = "Prometheus exporter for gridinit-supervised OpenIO processes",
    long_about = "Prometheus exporter for gridinit-supervised OpenIO processes.\n\n\
                  Runs `gridinit_cmd status` on every scrape and exports the up/down \
                  state, memory, CPU time and start time of every supervised process.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Path under which to expose metrics
    #[arg(long)]
    pub telemetry_path: Option<String>,

    /// Metric name prefix
    #[arg(long)]
    pub namespace: Option<String>,

    /// Supervisor status command
    #[arg(long)]
    pub status_command: Option<String>,

    /// Seconds to wait for the status command before killing it
    #[arg(long)]
    pub command_timeout: Option<u64>,

    /// Read the status report from a file instead of running the command
    #[arg(short = 'r', long)]
    pub report_file: Option<PathBuf>,

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Parallel stat lookup threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Log level (default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal exporter_* metrics
    #[arg(long)]
    pub disable_telemetry: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments
        #[arg(long)]
        commented: bool,
    },

    /// Run collection cycles and print the result
    Test {
        /// Number of test iterations
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Show every sample, not only the summary
        #[arg(long)]
        verbose: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Resolves configuration from CLI args, config file, and defaults.
///
/// Precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(path) = &args.telemetry_path {
        config.metrics_path = Some(path.clone());
    }
    if let Some(ns) = &args.namespace {
        config.namespace = Some(ns.clone());
    }
    if let Some(cmd) = &args.status_command {
        config.status_command = Some(cmd.clone());
    }
    if let Some(secs) = args.command_timeout {
        config.command_timeout_secs = Some(secs);
    }
    if let Some(path) = &args.report_file {
        config.report_file = Some(path.clone());
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if args.parallelism.is_some() {
        config.parallelism = args.parallelism;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level
            .to_possible_value()
            .map(|v| v.get_name().to_string());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    Ok(config)
}
