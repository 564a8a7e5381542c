//! Configuration output commands.

use anyhow::Context;
use openio_exporter::Config;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;

/// Serializes a config in the requested format.
fn render(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Generates a configuration file with default values.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("openio-exporter.yaml"));

    let mut content = render(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Prints the effective configuration.
pub fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render(config, &format)?);
    Ok(())
}

/// Adds comments to YAML configuration
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# OpenIO Exporter Configuration
# ==============================
#
# Server
# ------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 11010                  # HTTP port
# metrics_path: "/metrics"     # Path of the metrics endpoint
#
# Metrics
# -------
# namespace: "openio"          # Metric name prefix
#
# Status report
# -------------
# status_command: "gridinit_cmd"   # Supervisor status command
# status_args: ["status"]          # Its arguments
# command_timeout_secs: 10         # Kill the command after N seconds
# report_file: null                # Read a saved report instead of running the command
#
# Process statistics
# ------------------
# proc_root: "/proc"           # Root of the proc filesystem
# parallelism: null            # Parallel stat lookups (null = off, 0 = auto)
#
# Feature flags
# -------------
# enable_health: true          # Enable /health endpoint
# enable_telemetry: true       # Enable <namespace>_exporter_* metrics
#
# TLS
# ---
# enable_tls: false
# tls_cert_path: null
# tls_key_path: null
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
