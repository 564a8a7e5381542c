//! CLI command implementations for openio-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Configuration and system validation
//! - `config`: Configuration file generation
//! - `test`: One-shot collection cycles

pub mod check;
pub mod config;
pub mod test;

// Re-export command functions
pub use check::command_check;
pub use config::{command_config, show_config};
pub use test::command_test;
