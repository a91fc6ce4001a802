// src/engine/mod.rs

//! Orchestration engine for onchange.
//!
//! This module ties together:
//! - the debounce scheduler that batches changed paths into deduplicated
//!   passes and retries transient failures ([`debounce`])
//! - the session loop that multiplexes watch events, the debounce deadline,
//!   the terminate deadline and the stop signal ([`runtime`])
//! - the builder used to register a watch and obtain a session
//!   ([`registration`])
//!
//! The scheduler holds no IO of its own; the async shell is implemented in
//! [`runtime`].

use tokio::sync::watch;

/// Outcome of one task execution as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Transient failure; the task stays pending and is retried.
    Retry,
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

impl From<()> for TaskOutcome {
    fn from(_: ()) -> Self {
        TaskOutcome::Success
    }
}

/// `false` means "retry".
impl From<bool> for TaskOutcome {
    fn from(ok: bool) -> Self {
        if ok {
            TaskOutcome::Success
        } else {
            TaskOutcome::Retry
        }
    }
}

/// Cloneable handle that stops a running session. Idempotent.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

pub mod debounce;
pub mod registration;
pub mod runtime;

pub use debounce::{DebounceScheduler, PassReport, PendingTaskSet};
pub use registration::OnFileChanged;
pub use runtime::{Session, SessionOptions};
