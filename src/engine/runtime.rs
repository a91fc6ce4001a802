// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::watch as signal;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::errors::{OnchangeError, Result};
use crate::exec::TaskExecutor;
use crate::types::ChangeKind;
use crate::watch::Watch;

use super::StopHandle;
use super::debounce::DebounceScheduler;

/// Timing knobs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Quiet period after the last change before a pass runs.
    pub timeout: Duration,
    /// Delay before tasks that asked for a retry run again.
    pub retry_interval: Duration,
    /// Stop the session this long after it starts.
    pub terminate_after: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: super::debounce::DEFAULT_TIMEOUT,
            retry_interval: super::debounce::DEFAULT_RETRY_INTERVAL,
            terminate_after: None,
        }
    }
}

/// A registered watch plus its scheduler and executor.
///
/// One task owns everything: the loop multiplexes the stop signal, the
/// terminate deadline, the debounce deadline and watch events. While the
/// executor runs, new backend events wait in the channel.
pub struct Session<E: TaskExecutor> {
    watch: Watch,
    scheduler: DebounceScheduler,
    executor: E,
    options: SessionOptions,
    stop: StopHandle,
    stop_rx: signal::Receiver<bool>,
}

impl<E: TaskExecutor> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("watch", &self.watch)
            .field("scheduler", &self.scheduler)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: TaskExecutor> Session<E> {
    pub fn new(watch: Watch, executor: E, options: SessionOptions) -> Self {
        let (stop, stop_rx) = StopHandle::new();
        Self {
            watch,
            scheduler: DebounceScheduler::new(options.retry_interval),
            executor,
            options,
            stop,
            stop_rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn watch(&self) -> &Watch {
        &self.watch
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Run the loop inside the caller's runtime until stopped.
    ///
    /// The watch is released whether the loop ends by stop, by the terminate
    /// deadline or by an executor fault. Returns the executor back.
    pub async fn run(mut self) -> Result<E> {
        let result = self.run_loop().await;
        self.watch.stop();
        result.map(|()| self.executor)
    }

    /// Own a current-thread runtime and block until stopped.
    ///
    /// Fails when called from inside a Tokio runtime; use
    /// [`run`](Self::run) there.
    pub fn start(self) -> Result<E> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(OnchangeError::config(
                "Session::start called inside a Tokio runtime; await Session::run instead",
            ));
        }
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(self.run())
    }

    async fn run_loop(&mut self) -> Result<()> {
        let terminate_at = self.options.terminate_after.map(|d| Instant::now() + d);
        let mut watch_open = true;

        info!(
            timeout = ?self.options.timeout,
            retry_interval = ?self.options.retry_interval,
            terminate_after = ?self.options.terminate_after,
            "session started"
        );

        loop {
            if *self.stop_rx.borrow() {
                info!("stop requested");
                break;
            }

            let debounce_at = self.scheduler.deadline();

            tokio::select! {
                biased;

                changed = self.stop_rx.changed() => {
                    if changed.is_err() {
                        debug!("stop channel closed");
                    }
                    // Re-checked at the top of the loop.
                }

                _ = sleep_until_opt(terminate_at) => {
                    info!("terminate deadline reached");
                    break;
                }

                _ = sleep_until_opt(debounce_at) => {
                    let report = self.scheduler.on_timeout(&mut self.executor).await?;
                    debug!(
                        executed = report.executed.len(),
                        retried = report.retried.len(),
                        "debounce pass finished"
                    );
                }

                change = self.watch.next_change(), if watch_open => {
                    match change {
                        Some(change) if change.kind == ChangeKind::Changed => {
                            self.scheduler.append(change.path, self.options.timeout, Instant::now());
                        }
                        Some(change) => {
                            debug!(path = ?change.path, kind = %change.kind, "not scheduling");
                        }
                        None => {
                            debug!("watch event stream ended");
                            watch_open = false;
                        }
                    }
                }
            }
        }

        info!(pending = self.scheduler.pending().len(), "session stopped");
        Ok(())
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
