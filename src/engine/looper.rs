// src/engine/looper.rs

//! Repeating batch execution with a cancellable sleep.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::LoopConfig;
use crate::errors::{AutoapplyError, Result};
use crate::exec::{Batch, BatchOutcome, Env, ProcessSink};

use super::RunOptions;
use super::context::RunState;

/// A batch that runs over and over until the context stops.
#[derive(Debug)]
pub struct Loop {
    name: String,
    batch: Batch,
    cwd: Option<PathBuf>,
    sleep: Duration,
    /// Token of the sleep currently in progress, if any. A fresh one is
    /// created for every sleep.
    pending_sleep: Mutex<Option<CancellationToken>>,
}

/// Keeps the context's active-loop count in sync with a running loop task,
/// including when the task fails or panics.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn enter(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            info!("Exit.");
        }
    }
}

impl Loop {
    pub fn from_config(cfg: &LoopConfig, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let batch = Batch::new(name.clone(), cfg.commands.clone(), cfg.on_error)
            .map_err(AutoapplyError::ConfigError)?;
        Ok(Self {
            name,
            batch,
            cwd: cfg.cwd.clone(),
            sleep: cfg.sleep,
            pending_sleep: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sleep_interval(&self) -> Duration {
        self.sleep
    }

    /// Launch the iteration task.
    ///
    /// The active-loop count of `state` is incremented immediately and
    /// decremented when the task ends, whatever its outcome.
    pub fn start(self: &Arc<Self>, options: RunOptions, state: RunState) -> JoinHandle<Result<()>> {
        let guard = ActiveGuard::enter(state.active_counter());
        let this = Arc::clone(self);
        let span = info_span!("loop", name = %self.name);

        tokio::spawn(
            async move {
                let _guard = guard;
                match this.run_loop(options, &state).await {
                    Err(err) if options.catch_errors => {
                        warn!(error = %err, "Error while running loop");
                        Ok(())
                    }
                    other => other,
                }
            }
            .instrument(span),
        )
    }

    /// Cancel the sleep in progress, if any. Idempotent.
    pub fn stop(&self) {
        let pending = self
            .pending_sleep
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(token) = pending {
            token.cancel();
            debug!(name = %self.name, "loop has been stopped");
        }
    }

    async fn run_loop(&self, options: RunOptions, state: &RunState) -> Result<()> {
        let mut iterations: u64 = 0;
        // A limit of 0 means no limit.
        let limit = options.loops.filter(|max| *max > 0);

        while state.is_running() {
            self.run_iteration().await?;
            iterations += 1;

            if limit.is_some_and(|max| iterations >= max) {
                debug!(iterations, "iteration limit reached");
                break;
            }
            if !state.is_running() {
                break;
            }

            if self.sleep.is_zero() {
                debug!("Not sleeping (sleep = 0)");
            } else {
                info!("Sleeping for {:?}...", self.sleep);
                self.sleep_cancellable(state).await;
            }
        }
        Ok(())
    }

    async fn run_iteration(&self) -> Result<BatchOutcome> {
        let env = Env::new();
        if let Some(cwd) = &self.cwd {
            return Ok(self.batch.run(cwd, &env, &ProcessSink).await?);
        }

        let dir = tokio::task::spawn_blocking(|| {
            tempfile::Builder::new().prefix("autoapply-").tempdir()
        })
        .await
        .map_err(|e| AutoapplyError::Other(e.into()))??;
        let result = self.batch.run(dir.path(), &env, &ProcessSink).await;
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!("Deleted temporary directory."),
            Ok(Err(e)) => warn!(error = %e, "failed to delete temporary directory"),
            Err(e) => warn!(error = %e, "temporary directory cleanup task failed"),
        }
        Ok(result?)
    }

    /// Sleep for the configured interval, returning early when [`Loop::stop`]
    /// is called or the context shuts down.
    async fn sleep_cancellable(&self, state: &RunState) {
        let token = state.sleep_token();
        *self
            .pending_sleep
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(token.clone());

        tokio::select! {
            _ = tokio::time::sleep(self.sleep) => {}
            _ = token.cancelled() => debug!("sleep cancelled"),
        }

        self.pending_sleep
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}
