//! Fixed-window reset task for the overload counter.
//!
//! # States
//! ```text
//! Stopped ──restart()──▶ Running(handle)
//! Running ──restart()──▶ abort old handle ──▶ Running(new handle)
//! Running ──stop()─────▶ abort handle ──▶ Stopped
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// The single owned reset task of an overload guard.
#[derive(Debug, Default)]
pub enum ResetSchedule {
    #[default]
    Stopped,
    Running(JoinHandle<()>),
}

impl ResetSchedule {
    /// Cancel any running task, then start one that zeroes `counter` every `window`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn restart(&mut self, counter: Arc<AtomicU64>, window: Duration) {
        self.stop();

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(window).await;
                let previous = counter.swap(0, Ordering::SeqCst);
                tracing::trace!(previous, "Overload window reset");
            }
        });
        *self = ResetSchedule::Running(handle);
    }

    pub fn stop(&mut self) {
        if let ResetSchedule::Running(handle) = std::mem::take(self) {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ResetSchedule::Running(handle) if !handle.is_finished())
    }
}
