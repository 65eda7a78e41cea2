// src/exec/process.rs

//! Child process spawning and stdio pumping.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::errors::ExecError;
use crate::types::StdioMode;

use super::{Env, OutputSink};

const CHUNK_SIZE: usize = 8192;

/// `ETXTBSY`: the executable is still open for writing, typically because a
/// process forked from another thread inherited the descriptor of a freshly
/// written script before its exec.
const TEXT_FILE_BUSY: i32 = 26;
const SPAWN_BUSY_RETRIES: u32 = 5;

/// Program plus arguments, before any platform shell wrapping.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    program: OsString,
    args: Vec<String>,
}

impl ProcessSpec {
    /// Execute `program` directly, without shell interpretation.
    pub fn direct(program: PathBuf, args: Vec<String>) -> Self {
        Self {
            program: program.into_os_string(),
            args,
        }
    }

    /// Run a script file through the platform shell.
    ///
    /// The shell honours a `#!` line and runs files without one as shell
    /// code. On unix the path is passed as `$0` and never re-parsed.
    pub fn script(path: PathBuf) -> Self {
        if cfg!(windows) {
            Self {
                program: "cmd".into(),
                args: vec!["/C".to_string(), path.display().to_string()],
            }
        } else {
            Self {
                program: "sh".into(),
                args: vec![
                    "-c".to_string(),
                    "\"$0\"".to_string(),
                    path.display().to_string(),
                ],
            }
        }
    }

    /// Execute `command` through the platform shell.
    pub fn shell(command: &str) -> Self {
        if cfg!(windows) {
            Self {
                program: "cmd".into(),
                args: vec!["/C".to_string(), command.to_string()],
            }
        } else {
            Self {
                program: "sh".into(),
                args: vec!["-c".to_string(), command.to_string()],
            }
        }
    }
}

fn stdio_for(mode: StdioMode) -> Stdio {
    match mode {
        StdioMode::Pipe => Stdio::piped(),
        StdioMode::Ignore => Stdio::null(),
    }
}

/// Spawn the process, forward its output to `sink` while it runs, and wait
/// for it to exit.
///
/// Resolves once the child has exited *and* both piped streams reached EOF.
pub async fn spawn_and_wait(
    spec: ProcessSpec,
    cwd: &Path,
    env: &Env,
    stdout: StdioMode,
    stderr: StdioMode,
    sink: &dyn OutputSink,
) -> Result<(), ExecError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(stdio_for(stdout))
        .stderr(stdio_for(stderr));

    let mut child = spawn_with_retry(&mut cmd, &spec).await?;

    let out = child.stdout.take();
    let err = child.stderr.take();

    let (out_res, err_res, status) = tokio::join!(
        pump(out, |chunk| sink.on_stdout(chunk)),
        pump(err, |chunk| sink.on_stderr(chunk)),
        child.wait(),
    );
    out_res?;
    err_res?;
    let status = status?;

    debug!(
        program = ?spec.program,
        exit_code = ?status.code(),
        success = status.success(),
        "process exited"
    );

    if status.success() {
        Ok(())
    } else {
        match status.code() {
            Some(code) => Err(ExecError::ExitCode { code }),
            None => Err(ExecError::Signal),
        }
    }
}

async fn spawn_with_retry(cmd: &mut Command, spec: &ProcessSpec) -> Result<Child, ExecError> {
    let mut attempt = 0;
    loop {
        match cmd.spawn() {
            Ok(child) => return Ok(child),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ExecError::NotFound {
                    program: spec.program.to_string_lossy().into_owned(),
                });
            }
            Err(e) if e.raw_os_error() == Some(TEXT_FILE_BUSY) && attempt < SPAWN_BUSY_RETRIES => {
                attempt += 1;
                debug!(program = ?spec.program, attempt, "executable busy; retrying spawn");
                tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
            }
            Err(e) => return Err(ExecError::Io(e)),
        }
    }
}

async fn pump<R, F>(reader: Option<R>, mut forward: F) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        forward(&buf[..n]);
    }
}
