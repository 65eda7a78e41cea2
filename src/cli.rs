// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `autoapply`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "autoapply",
    version,
    about = "Run commands periodically and on HTTP requests.",
    long_about = None
)]
pub struct CliArgs {
    /// YAML configuration: a file path, or `env:NAME` to read it from the
    /// environment variable `NAME`.
    #[arg(value_name = "CONFIG")]
    pub config: String,

    /// Enable debug logging and print the full error chain on failure.
    #[arg(short, long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--debug`, `AUTOAPPLY_LOG`, `LOG_LEVEL` or `info` is used,
    /// in that order.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Stop each loop after this many iterations. `0` means no limit.
    #[arg(long, value_name = "N")]
    pub loops: Option<u64>,

    /// Parse and validate, print the decoded configuration, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
