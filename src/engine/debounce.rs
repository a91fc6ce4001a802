// src/engine/debounce.rs

//! Debounce/coalesce scheduler.
//!
//! Two states:
//!
//! - **Idle**: no deadline armed.
//! - **Pending**: a deadline is armed and at least one task waits for it.
//!
//! Every [`append`](DebounceScheduler::append) re-arms the single deadline
//! (restart-the-window debounce). When the deadline fires the owner calls
//! [`on_timeout`](DebounceScheduler::on_timeout), which runs every pending
//! task once, in arrival order, and keeps the ones that asked to be retried.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::TaskOutcome;
use crate::errors::Result;
use crate::exec::TaskExecutor;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Ordered set of paths awaiting execution.
#[derive(Debug, Default, Clone)]
pub struct PendingTaskSet {
    order: Vec<PathBuf>,
    members: HashSet<PathBuf>,
}

impl PendingTaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `task` unless it is already pending. Returns true if it was added.
    pub fn insert(&mut self, task: PathBuf) -> bool {
        if !self.members.insert(task.clone()) {
            return false;
        }
        self.order.push(task);
        true
    }

    pub fn contains(&self, task: &Path) -> bool {
        self.members.contains(task)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.order.iter().map(PathBuf::as_path)
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }
}

/// What one pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Tasks that completed successfully and left the pending set.
    pub executed: Vec<PathBuf>,
    /// Tasks that asked to be retried and stay pending.
    pub retried: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct DebounceScheduler {
    pending: PendingTaskSet,
    deadline: Option<Instant>,
    retry_interval: Duration,
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL)
    }
}

impl DebounceScheduler {
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            pending: PendingTaskSet::new(),
            deadline: None,
            retry_interval,
        }
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// The armed deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_idle(&self) -> bool {
        self.deadline.is_none()
    }

    pub fn pending(&self) -> &PendingTaskSet {
        &self.pending
    }

    /// Record `task` and restart the window: the deadline becomes
    /// `now + timeout`, replacing any armed deadline (retry included).
    ///
    /// Returns true if the task was not already pending.
    pub fn append(&mut self, task: impl Into<PathBuf>, timeout: Duration, now: Instant) -> bool {
        let task = task.into();
        let added = self.pending.insert(task.clone());
        self.deadline = Some(now + timeout);
        debug!(?task, added, pending = self.pending.len(), "debounce window restarted");
        added
    }

    /// Run one pass over the pending set.
    ///
    /// Each task is awaited before the next starts. Tasks reporting
    /// [`TaskOutcome::Retry`] stay pending and re-arm the deadline at
    /// `now + retry_interval`. An executor error stops the pass and is
    /// returned; the unexecuted tasks stay pending.
    pub async fn on_timeout<E>(&mut self, executor: &mut E) -> Result<PassReport>
    where
        E: TaskExecutor + ?Sized,
    {
        self.deadline = None;
        let tasks = self.pending.take();
        let mut report = PassReport::default();

        debug!(count = tasks.len(), "debounce window elapsed");

        let mut iter = tasks.into_iter();
        while let Some(task) = iter.next() {
            match executor.execute(&task).await {
                Ok(TaskOutcome::Success) => report.executed.push(task),
                Ok(TaskOutcome::Retry) => {
                    debug!(?task, "task asked for retry");
                    self.pending.insert(task.clone());
                    report.retried.push(task);
                }
                Err(err) => {
                    self.pending.insert(task);
                    for rest in iter {
                        self.pending.insert(rest);
                    }
                    return Err(err);
                }
            }
        }

        if !self.pending.is_empty() {
            self.deadline = Some(Instant::now() + self.retry_interval);
            info!(
                retrying = self.pending.len(),
                interval = ?self.retry_interval,
                "scheduling retry"
            );
        }

        Ok(report)
    }
}
