use std::sync::Mutex;

use autoapply::exec::OutputSink;

/// An [`OutputSink`] that keeps stdout and stderr apart for assertions.
#[derive(Debug, Default)]
pub struct CaptureSink {
    stdout: Mutex<Vec<u8>>,
    stderr: Mutex<Vec<u8>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout.lock().unwrap()).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr.lock().unwrap()).into_owned()
    }
}

impl OutputSink for CaptureSink {
    fn on_stdout(&self, chunk: &[u8]) {
        self.stdout.lock().unwrap().extend_from_slice(chunk);
    }

    fn on_stderr(&self, chunk: &[u8]) {
        self.stderr.lock().unwrap().extend_from_slice(chunk);
    }
}
