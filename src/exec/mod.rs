// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running configured commands,
//! using `tokio::process::Command`, and routing their output to an
//! [`OutputSink`].
//!
//! - [`command`] defines a single validated command (shell string, argv or
//!   inline script).
//! - [`process`] spawns a child process and pumps its stdio.
//! - [`script`] materializes inline scripts as temporary executables.
//! - [`sink`] provides the `OutputSink` trait plus the process, buffer and
//!   channel implementations.
//! - [`batch`] runs an ordered list of commands under an `onerror` policy.

use std::collections::BTreeMap;

pub mod batch;
pub mod command;
pub mod process;
pub mod script;
pub mod sink;

pub use batch::{Batch, BatchOutcome};
pub use command::{Command, Invocation};
pub use sink::{BufferSink, ChannelSink, OutputSink, ProcessSink};

/// Extra environment variables layered over the inherited process
/// environment of a child.
pub type Env = BTreeMap<String, String>;
