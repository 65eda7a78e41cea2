// src/exec/sink.rs

//! Output sinks for child process stdio.
//!
//! A batch hands one sink down to each of its commands. Every chunk read
//! from a piped stdout/stderr is forwarded as soon as it arrives:
//!
//! - [`ProcessSink`] writes to this process's own stdout/stderr (loops, init).
//! - [`BufferSink`] accumulates everything for a buffered HTTP response.
//! - [`ChannelSink`] forwards chunks to a streaming HTTP response body.
//!
//! Tests can supply their own implementation to capture output.

use std::io::Write;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

/// Receiver of child process output chunks.
pub trait OutputSink: Send + Sync {
    fn on_stdout(&self, chunk: &[u8]);
    fn on_stderr(&self, chunk: &[u8]);
}

/// Forward output to the real stdout/stderr of this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSink;

impl OutputSink for ProcessSink {
    fn on_stdout(&self, chunk: &[u8]) {
        let mut out = std::io::stdout().lock();
        if out.write_all(chunk).and_then(|_| out.flush()).is_err() {
            trace!("failed to forward chunk to stdout");
        }
    }

    fn on_stderr(&self, chunk: &[u8]) {
        let mut err = std::io::stderr().lock();
        if err.write_all(chunk).and_then(|_| err.flush()).is_err() {
            trace!("failed to forward chunk to stderr");
        }
    }
}

/// Collect stdout and stderr, interleaved in arrival order.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Mutex<Vec<u8>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, chunk: &[u8]) {
        self.buf
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(chunk);
    }

    /// Consume the sink and return everything collected so far.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buf.into_inner().unwrap_or_else(|e| e.into_inner()))
    }
}

impl OutputSink for BufferSink {
    fn on_stdout(&self, chunk: &[u8]) {
        self.push(chunk);
    }

    fn on_stderr(&self, chunk: &[u8]) {
        self.push(chunk);
    }
}

/// Forward stdout and stderr chunks over an unbounded channel.
///
/// Send errors are ignored: they only mean the receiving side (e.g. an HTTP
/// client) went away.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { tx }
    }

    fn send(&self, chunk: &[u8]) {
        if self.tx.send(Bytes::copy_from_slice(chunk)).is_err() {
            trace!("output receiver closed; dropping chunk");
        }
    }
}

impl OutputSink for ChannelSink {
    fn on_stdout(&self, chunk: &[u8]) {
        self.send(chunk);
    }

    fn on_stderr(&self, chunk: &[u8]) {
        self.send(chunk);
    }
}
