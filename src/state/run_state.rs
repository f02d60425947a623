//! Global run-state flag
//!
//! Cancellation is cooperative: flipping the flag to `Stopping` tells the
//! feeder to drain, workers to finish in-flight requests without starting
//! new ones, and the background tasks to make one final pass.

use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Notify;

/// Lifecycle phase of a crawl stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    Stopping,
    Stopped,
}

/// Shared atomic run-state flag with a wakeup for sleeping tasks
#[derive(Debug)]
pub struct RunState {
    phase: AtomicU8,
    changed: Notify,
}

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(RUNNING),
            changed: Notify::new(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self.phase.load(Ordering::SeqCst) {
            RUNNING => RunPhase::Running,
            STOPPING => RunPhase::Stopping,
            _ => RunPhase::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == RunPhase::Running
    }

    /// Requests a graceful shutdown; only the Running -> Stopping edge fires
    pub fn begin_shutdown(&self) {
        if self
            .phase
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.changed.notify_waiters();
        }
    }

    /// Marks the stage fully stopped after all tasks joined
    pub fn mark_stopped(&self) {
        self.phase.store(STOPPED, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    /// Resolves when the phase leaves Running
    pub async fn shutdown_requested(&self) {
        loop {
            let notified = self.changed.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
