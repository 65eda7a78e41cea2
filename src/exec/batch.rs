// src/exec/batch.rs

//! Sequential execution of a command list under an `onerror` policy.

use std::path::Path;

use tracing::{Instrument, debug, error, info, info_span};

use crate::errors::ExecError;
use crate::types::OnError;

use super::{Command, Env, OutputSink};

/// How a batch run ended when it did not propagate an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every command was attempted. `failures` counts the ones skipped under
    /// `onerror: ignore`.
    Completed { failures: usize },
    /// A command failed under `onerror: continue`; the remaining commands of
    /// this run were skipped.
    Aborted { ran: usize },
}

/// An ordered, non-empty list of commands sharing one error policy.
#[derive(Debug, Clone)]
pub struct Batch {
    name: String,
    commands: Vec<Command>,
    on_error: OnError,
}

impl Batch {
    pub fn new(
        name: impl Into<String>,
        commands: Vec<Command>,
        on_error: OnError,
    ) -> Result<Self, String> {
        let name = name.into();
        if commands.is_empty() {
            return Err(format!("{name}: no commands given!"));
        }
        Ok(Self {
            name,
            commands,
            on_error,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn on_error(&self) -> OnError {
        self.on_error
    }

    /// Run the commands one at a time in `cwd`.
    ///
    /// Only `onerror: fail` returns an error; `ignore` and `continue` report
    /// their failures through logging and the returned [`BatchOutcome`].
    pub async fn run(
        &self,
        cwd: &Path,
        env: &Env,
        sink: &dyn OutputSink,
    ) -> Result<BatchOutcome, ExecError> {
        let span = info_span!("batch", name = %self.name);
        self.run_inner(cwd, env, sink).instrument(span).await
    }

    async fn run_inner(
        &self,
        cwd: &Path,
        env: &Env,
        sink: &dyn OutputSink,
    ) -> Result<BatchOutcome, ExecError> {
        debug!(cwd = %cwd.display(), "executing in directory");

        let mut failures = 0;
        for (idx, command) in self.commands.iter().enumerate() {
            match command.describe() {
                Some(line) => info!("Executing command: {line}"),
                None => info!("Executing script..."),
            }

            let Err(err) = command.run(cwd, env, sink).await else {
                continue;
            };

            debug!(error = ?err, "command failed");
            report_failure(&err);

            match self.on_error {
                OnError::Fail => return Err(err),
                OnError::Ignore => failures += 1,
                OnError::Continue => {
                    debug!("skipping remaining commands of this run");
                    return Ok(BatchOutcome::Aborted { ran: idx + 1 });
                }
            }
        }

        Ok(BatchOutcome::Completed { failures })
    }
}

fn report_failure(err: &ExecError) {
    match err {
        ExecError::NotFound { program } => error!(program = %program, "Command not found!"),
        ExecError::ExitCode { code } => error!("Command exited with code {code}"),
        other => error!("Command execution failed: {other}"),
    }
}
