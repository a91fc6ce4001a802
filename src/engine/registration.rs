// src/engine/registration.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigFile, LoopConfig};
use crate::errors::{OnchangeError, Result};
use crate::exec::TaskExecutor;
use crate::fs::FileSystem;
use crate::watch::{EventReceiver, Watch, WatchBackend, WatchSpec};

use super::runtime::{Session, SessionOptions};

/// Builder for a watch that calls an executor for every changed file.
///
/// ```no_run
/// use std::path::Path;
/// use std::time::Duration;
/// use onchange::config::LoopConfig;
/// use onchange::engine::OnFileChanged;
/// use onchange::exec::FnExecutor;
///
/// let session = OnFileChanged::new("src")
///     .include(["*.c"])
///     .exclude(["build"])
///     .timeout(Duration::from_millis(100))
///     .register(&LoopConfig::from_env()?, FnExecutor::new(|p: &Path| println!("{}", p.display())))?;
/// let _stop = session.stop_handle();
/// session.start()?;
/// # Ok::<(), onchange::errors::OnchangeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OnFileChanged {
    spec: WatchSpec,
    options: SessionOptions,
}

impl OnFileChanged {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            spec: WatchSpec::new(path),
            options: SessionOptions::default(),
        }
    }

    /// Builder preloaded from a validated config file.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut builder = Self {
            spec: cfg.watch_spec(),
            options: SessionOptions::default(),
        }
        .timeout(cfg.timeout())
        .retry_interval(cfg.retry_interval());
        if let Some(after) = cfg.terminate_after() {
            builder = builder.terminate_after(after);
        }
        builder
    }

    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.spec.recursive = recursive;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.options.retry_interval = interval;
        self
    }

    pub fn terminate_after(mut self, after: Duration) -> Self {
        self.options.terminate_after = Some(after);
        self
    }

    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Install the watch on the backend selected by `config`.
    pub fn register<E: TaskExecutor>(self, config: &LoopConfig, executor: E) -> Result<Session<E>> {
        self.check()?;
        let watch = Watch::start(&self.spec, config)?;
        Ok(Session::new(watch, executor, self.options))
    }

    /// Install the watch on an injected backend and filesystem.
    pub fn register_with_backend<E: TaskExecutor>(
        self,
        backend: Box<dyn WatchBackend>,
        events: EventReceiver,
        fs: Arc<dyn FileSystem>,
        executor: E,
    ) -> Result<Session<E>> {
        self.check()?;
        let watch = Watch::with_backend(&self.spec, backend, events, fs)?;
        Ok(Session::new(watch, executor, self.options))
    }

    fn check(&self) -> Result<()> {
        if self.options.timeout.is_zero() {
            return Err(OnchangeError::config("timeout must be positive"));
        }
        if self.options.retry_interval.is_zero() {
            return Err(OnchangeError::config("retry interval must be positive"));
        }
        if self.options.terminate_after.is_some_and(|d| d.is_zero()) {
            return Err(OnchangeError::config("terminate_after must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_patterns() {
        let b = OnFileChanged::new("/w")
            .include(["*.c"])
            .include(vec!["*.h".to_string()])
            .exclude(["build"])
            .recursive(false)
            .timeout(Duration::from_millis(100))
            .terminate_after(Duration::from_secs(2));

        assert_eq!(b.spec().include, vec!["*.c", "*.h"]);
        assert_eq!(b.spec().exclude, vec!["build"]);
        assert!(!b.spec().recursive);
        assert_eq!(b.options().timeout, Duration::from_millis(100));
        assert_eq!(b.options().terminate_after, Some(Duration::from_secs(2)));
    }

    #[test]
    fn defaults_follow_scheduler_defaults() {
        let b = OnFileChanged::new("/w");
        assert!(b.spec().recursive);
        assert_eq!(b.options().timeout, Duration::from_secs(1));
        assert_eq!(b.options().retry_interval, Duration::from_millis(500));
        assert_eq!(b.options().terminate_after, None);
    }

    #[test]
    fn zero_durations_are_rejected() {
        assert!(OnFileChanged::new("/w").timeout(Duration::ZERO).check().is_err());
        assert!(
            OnFileChanged::new("/w")
                .retry_interval(Duration::ZERO)
                .check()
                .is_err()
        );
        assert!(OnFileChanged::new("/w").check().is_ok());
    }
}
