// src/exec/backend.rs

//! Pluggable task executor abstraction.
//!
//! The debounce scheduler talks to a `TaskExecutor` for every changed path it
//! releases. Production code plugs in [`CommandExecutor`](super::command::CommandExecutor);
//! tests and library users can wrap a plain closure with [`FnExecutor`] or
//! provide their own implementation.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::engine::TaskOutcome;
use crate::errors::Result;

/// Boxed future returned by [`TaskExecutor::execute`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + 'a>>;

/// Handler invoked once per changed path per debounce window.
///
/// - `Ok(TaskOutcome::Success)`: the path is done.
/// - `Ok(TaskOutcome::Retry)`: transient failure, keep the path pending and
///   try again after the retry interval.
/// - `Err(_)`: unrecoverable fault, stops the session.
pub trait TaskExecutor: Send {
    fn execute<'a>(&'a mut self, task: &'a Path) -> ExecFuture<'a>;
}

impl<T: TaskExecutor + ?Sized> TaskExecutor for Box<T> {
    fn execute<'a>(&'a mut self, task: &'a Path) -> ExecFuture<'a> {
        (**self).execute(task)
    }
}

/// Wraps a synchronous closure returning `()`, `bool` or [`TaskOutcome`].
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}

impl<F, R> TaskExecutor for FnExecutor<F>
where
    F: FnMut(&Path) -> R + Send,
    R: Into<TaskOutcome>,
{
    fn execute<'a>(&'a mut self, task: &'a Path) -> ExecFuture<'a> {
        let outcome = (self.f)(task).into();
        Box::pin(async move { Ok(outcome) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn fn_executor_converts_closure_results() {
        let mut seen = Vec::new();
        let mut exec = FnExecutor::new(|p: &Path| seen.push(p.to_path_buf()));
        let outcome = exec.execute(Path::new("/w/a.c")).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Success);
        drop(exec);
        assert_eq!(seen, vec![PathBuf::from("/w/a.c")]);

        let mut failing = FnExecutor::new(|_: &Path| false);
        assert_eq!(
            failing.execute(Path::new("/w/a.c")).await.unwrap(),
            TaskOutcome::Retry
        );
    }

    #[tokio::test]
    async fn boxed_executor_delegates() {
        let mut exec: Box<dyn TaskExecutor> = Box::new(FnExecutor::new(|_: &Path| TaskOutcome::Retry));
        assert_eq!(
            exec.execute(Path::new("x")).await.unwrap(),
            TaskOutcome::Retry
        );
    }
}
