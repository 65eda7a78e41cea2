// src/engine/context.rs

//! Process-wide run state and the [`Context`] handed back by
//! [`super::run`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{AutoapplyError, Result};
use crate::http::{Call, ServerHandle};

use super::looper::Loop;

/// Shared flag and counter observed by every loop task.
///
/// `running` only ever goes from true to false.
#[derive(Debug, Clone)]
pub struct RunState {
    running: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            running: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.running.is_cancelled()
    }

    pub fn active_loops(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Flip `running` to false. Idempotent.
    pub fn shut_down(&self) {
        self.running.cancel();
    }

    /// Resolves once [`RunState::shut_down`] has been called.
    pub async fn stopped(&self) {
        self.running.cancelled().await;
    }

    pub(crate) fn active_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    /// A fresh token for one sleep. It is also cancelled by a shutdown, so a
    /// stop issued right before the sleep begins is never lost.
    pub(crate) fn sleep_token(&self) -> CancellationToken {
        self.running.child_token()
    }
}

#[derive(Debug)]
struct LoopHandle {
    inner: Arc<Loop>,
    task: Mutex<Option<JoinHandle<Result<()>>>>,
}

/// Everything started by [`super::run`]: loop tasks, calls and the server.
#[derive(Debug)]
pub struct Context {
    state: RunState,
    loops: Vec<LoopHandle>,
    calls: Vec<Arc<Call>>,
    server: tokio::sync::Mutex<Option<ServerHandle>>,
    server_addr: Option<SocketAddr>,
}

impl Context {
    pub(crate) fn new(
        state: RunState,
        calls: Vec<Arc<Call>>,
        server: Option<ServerHandle>,
    ) -> Self {
        let server_addr = server.as_ref().map(ServerHandle::local_addr);
        Self {
            state,
            loops: Vec::new(),
            calls,
            server: tokio::sync::Mutex::new(server),
            server_addr,
        }
    }

    pub(crate) fn push_loop(&mut self, inner: Arc<Loop>, task: JoinHandle<Result<()>>) {
        self.loops.push(LoopHandle {
            inner,
            task: Mutex::new(Some(task)),
        });
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Number of loop tasks that have not finished yet.
    pub fn active_loops(&self) -> usize {
        self.state.active_loops()
    }

    pub fn loops(&self) -> impl Iterator<Item = &Loop> {
        self.loops.iter().map(|h| h.inner.as_ref())
    }

    pub fn calls(&self) -> &[Arc<Call>] {
        &self.calls
    }

    /// Address the server is bound to, when one was started.
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    /// Resolves once [`Context::stop`] has been requested.
    pub async fn stopped(&self) {
        self.state.stopped().await;
    }

    /// Flip `running` and interrupt every pending sleep without waiting for
    /// anything. Loop tasks end at their next iteration boundary.
    pub fn request_stop(&self) {
        if self.state.is_running() {
            info!("stopping...");
        }
        self.state.shut_down();
        for handle in &self.loops {
            handle.inner.stop();
        }
    }

    /// Stop everything and wait for the loop tasks to finish.
    ///
    /// Loops finish the iteration in progress; only sleeps are interrupted.
    /// Safe to call more than once.
    pub async fn stop(&self) -> Result<()> {
        self.request_stop();

        let server = self.server.lock().await.take();
        if let Some(server) = server {
            debug!("stopping server...");
            server.stop().await;
        }

        self.wait().await
    }

    /// Wait for every loop task to finish.
    ///
    /// Returns the first loop failure, if any. Tasks already awaited by an
    /// earlier call are skipped.
    pub async fn wait(&self) -> Result<()> {
        let mut first_err = None;
        for handle in &self.loops {
            let task = handle
                .task
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            let Some(task) = task else { continue };

            let outcome = match task.await {
                Ok(result) => result,
                Err(join_err) => Err(AutoapplyError::Other(anyhow::anyhow!(
                    "loop task for {} failed: {join_err}",
                    handle.inner.name()
                ))),
            };
            if let Err(err) = outcome {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
