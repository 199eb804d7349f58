use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the logging pipeline alive.
///
/// Holds the file sink's worker guard: dropping the handle flushes queued
/// events, so it should live as long as the process logs.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    flushes: Arc<AtomicU64>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        LoggingHandle {
            file_guard,
            flushes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Records a flush request. The non-blocking writer drains on its own;
    /// an explicit flush only happens on shutdown.
    pub fn flush(&self) {
        let n = self.flushes.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(flush_count = n, "logging flush requested");
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Drops the file guard, blocking until queued events are written.
    pub fn shutdown(mut self) {
        tracing::info!(
            file_sink = self.file_guard.is_some(),
            "logging shutdown"
        );
        drop(self.file_guard.take());
    }
}
