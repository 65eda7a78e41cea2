// src/engine/mod.rs

//! Orchestration engine for autoapply.
//!
//! This module ties together:
//! - the one-time init batch ([`init`])
//! - the repeating loops with their cancellable sleep ([`looper`])
//! - the process-wide context used for coordinated shutdown ([`context`])
//! - the startup sequence server → init → loops ([`runtime`])
//!
//! Actual command execution is delegated to [`crate::exec`].

/// Options for a [`run`] invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop each loop after this many iterations. `Some(0)` is the same as
    /// `None`.
    pub loops: Option<u64>,
    /// Log and swallow loop failures instead of surfacing them from
    /// [`Context::wait`].
    pub catch_errors: bool,
}

pub mod context;
pub mod init;
pub mod looper;
pub mod runtime;

pub use context::{Context, RunState};
pub use init::Init;
pub use looper::Loop;
pub use runtime::run;
