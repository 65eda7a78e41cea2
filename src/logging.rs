// src/logging.rs

//! Logging setup for `autoapply` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--debug` (debug)
//! 3. `AUTOAPPLY_LOG` environment variable (e.g. "info", "debug")
//! 4. `LOG_LEVEL` environment variable
//! 5. default to `info`
//!
//! Logs are sent to STDERR so that stdout carries command output only.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, debug: bool) -> Result<()> {
    let level = resolve_level(
        cli_level,
        debug,
        std::env::var("AUTOAPPLY_LOG").ok().as_deref(),
        std::env::var("LOG_LEVEL").ok().as_deref(),
    );

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    Ok(())
}

fn resolve_level(
    cli_level: Option<LogLevel>,
    debug: bool,
    autoapply_log: Option<&str>,
    log_level: Option<&str>,
) -> Level {
    if let Some(lvl) = cli_level {
        return level_from_log_level(lvl);
    }
    if debug {
        return Level::DEBUG;
    }
    autoapply_log
        .and_then(parse_level_str)
        .or_else(|| log_level.and_then(parse_level_str))
        .unwrap_or(Level::INFO)
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
