// src/exec/command.rs

use std::path::Path;

use tracing::debug;

use crate::errors::ExecError;
use crate::types::StdioMode;

use super::process::{spawn_and_wait, ProcessSpec};
use super::script::materialize_script;
use super::{Env, OutputSink};

/// What a command executes.
///
/// Exactly one form is ever present; the constructors below enforce the
/// non-blank / non-empty rules so the rest of the crate never re-checks them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run through the platform shell (`sh -c` / `cmd /C`).
    Shell(String),
    /// Run `argv[0]` directly with the remaining elements as arguments.
    Argv(Vec<String>),
    /// Inline script written to a temporary executable file.
    Script(String),
}

impl Invocation {
    pub fn shell(command: &str) -> Result<Self, String> {
        let command = command.trim();
        if command.is_empty() {
            return Err("command is empty!".to_string());
        }
        Ok(Invocation::Shell(command.to_string()))
    }

    pub fn argv(argv: Vec<String>) -> Result<Self, String> {
        match argv.first() {
            Some(program) if !program.is_empty() => Ok(Invocation::Argv(argv)),
            _ => Err(format!("invalid command: {}", argv.join(","))),
        }
    }

    pub fn script(script: &str) -> Result<Self, String> {
        let script = script.trim();
        if script.is_empty() {
            return Err("script is empty!".to_string());
        }
        Ok(Invocation::Script(script.to_string()))
    }
}

/// A single configured command, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    invocation: Invocation,
    stdout: StdioMode,
    stderr: StdioMode,
}

impl Command {
    pub fn new(invocation: Invocation) -> Self {
        Self {
            invocation,
            stdout: StdioMode::Pipe,
            stderr: StdioMode::Pipe,
        }
    }

    pub fn with_stdout(mut self, mode: StdioMode) -> Self {
        self.stdout = mode;
        self
    }

    pub fn with_stderr(mut self, mode: StdioMode) -> Self {
        self.stderr = mode;
        self
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn stdout_mode(&self) -> StdioMode {
        self.stdout
    }

    pub fn stderr_mode(&self) -> StdioMode {
        self.stderr
    }

    pub fn is_script(&self) -> bool {
        matches!(self.invocation, Invocation::Script(_))
    }

    /// JSON rendering of the command line for log messages, `None` for
    /// scripts.
    pub fn describe(&self) -> Option<String> {
        match &self.invocation {
            Invocation::Shell(s) => serde_json::to_string(s).ok(),
            Invocation::Argv(argv) => serde_json::to_string(argv).ok(),
            Invocation::Script(_) => None,
        }
    }

    /// Execute the command once in `cwd`.
    ///
    /// `env` is layered over the inherited process environment. Piped
    /// streams are forwarded chunk by chunk to `sink`.
    pub async fn run(
        &self,
        cwd: &Path,
        env: &Env,
        sink: &dyn OutputSink,
    ) -> Result<(), ExecError> {
        match &self.invocation {
            Invocation::Script(script) => {
                let path = materialize_script(script.clone()).await?;
                debug!(path = %path.display(), "script written");

                let spec = ProcessSpec::script(path.to_path_buf());
                let result = self.spawn(spec, cwd, env, sink).await;

                let shown = path.display().to_string();
                match path.close() {
                    Ok(()) => debug!(path = %shown, "script deleted"),
                    Err(e) => debug!(path = %shown, error = %e, "failed to delete script"),
                }
                result
            }
            Invocation::Shell(command) => {
                self.spawn(ProcessSpec::shell(command), cwd, env, sink).await
            }
            Invocation::Argv(argv) => {
                let spec = ProcessSpec::direct(argv[0].clone().into(), argv[1..].to_vec());
                self.spawn(spec, cwd, env, sink).await
            }
        }
    }

    async fn spawn(
        &self,
        spec: ProcessSpec,
        cwd: &Path,
        env: &Env,
        sink: &dyn OutputSink,
    ) -> Result<(), ExecError> {
        spawn_and_wait(spec, cwd, env, self.stdout, self.stderr, sink).await
    }
}
