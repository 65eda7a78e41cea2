// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutoapplyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AutoapplyError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        AutoapplyError::ConfigError(msg.into())
    }
}

/// Failure of a single command execution.
///
/// Batches classify these for reporting before applying their `onerror`
/// policy.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("command not found: {program}")]
    NotFound { program: String },

    #[error("command failed with code {code}")]
    ExitCode { code: i32 },

    #[error("command terminated by signal")]
    Signal,

    #[error("command execution failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Exit code of the child, when it exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::ExitCode { code } => Some(*code),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AutoapplyError>;
