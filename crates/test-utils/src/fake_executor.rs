use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use onchange::engine::TaskOutcome;
use onchange::errors::OnchangeError;
use onchange::exec::{ExecFuture, TaskExecutor};
use tokio::time::Instant;

/// What the executor does for one call on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    Succeed,
    Retry,
    Fail,
}

/// A fake executor that:
/// - records which paths were "run" and when
/// - answers from a per-path script, then with `Success` once the script
///   runs out.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<(PathBuf, Instant)>>>,
    script: Arc<Mutex<HashMap<PathBuf, VecDeque<Scripted>>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for `path`, consumed one per call.
    pub fn script(&self, path: impl Into<PathBuf>, outcomes: &[Scripted]) {
        self.script
            .lock()
            .unwrap()
            .entry(path.into())
            .or_default()
            .extend(outcomes.iter().copied());
    }

    /// Paths in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Paths with the instant each call started.
    pub fn timed_calls(&self) -> Vec<(PathBuf, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, path: &Path) -> usize {
        self.calls.lock().unwrap().iter().filter(|(p, _)| p == path).count()
    }
}

impl TaskExecutor for RecordingExecutor {
    fn execute<'a>(&'a mut self, task: &'a Path) -> ExecFuture<'a> {
        self.calls
            .lock()
            .unwrap()
            .push((task.to_path_buf(), Instant::now()));

        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(task)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Scripted::Succeed);

        Box::pin(async move {
            match next {
                Scripted::Succeed => Ok(TaskOutcome::Success),
                Scripted::Retry => Ok(TaskOutcome::Retry),
                Scripted::Fail => Err(OnchangeError::Other(anyhow::anyhow!(
                    "scripted failure for {:?}",
                    task
                ))),
            }
        })
    }
}
