// src/cli.rs

//! CLI argument parsing using `clap`.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::parse_duration;

/// Command-line arguments for `warmdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "warmdag",
    version,
    about = "Run warm-up commands concurrently in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Warmup.toml")]
    pub plan: String,

    /// Give up after this long (e.g. `30s`, `500ms`).
    ///
    /// Overrides `[config].timeout` from the plan.
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Maximum number of commands running at once.
    ///
    /// Overrides `[config].pool_size` from the plan.
    #[arg(long, value_name = "N")]
    pub pool_size: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WARMDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the dependency forest, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
