// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::watch::WatchSpec;

/// Configuration file as read from TOML, before validation.
///
/// ```toml
/// [watch]
/// path = "src"
/// include = ["*.c"]
/// exclude = ["build"]
/// recursive = true
/// timeout = 1.0
/// retry_interval = 0.5
/// terminate_after = 10.0
///
/// [run]
/// commands = [["ninja"], ["ctest", "FILE"]]
/// cwd = "build"
/// retry_on_failure = false
/// skip_unchanged = false
/// ```
///
/// Both sections are optional; command-line flags fill in or override
/// anything here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub run: RunSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// File, directory or last-component glob to watch.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Debounce window in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Seconds between retries of failed commands.
    #[serde(default = "default_retry_interval")]
    pub retry_interval: f64,

    /// Stop watching after this many seconds.
    #[serde(default)]
    pub terminate_after: Option<f64>,
}

fn default_recursive() -> bool {
    true
}

fn default_timeout() -> f64 {
    1.0
}

fn default_retry_interval() -> f64 {
    0.5
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            path: None,
            include: Vec::new(),
            exclude: Vec::new(),
            recursive: default_recursive(),
            timeout: default_timeout(),
            retry_interval: default_retry_interval(),
            terminate_after: None,
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Command chain. Each command is a program followed by its arguments;
    /// an argument equal to `FILE` is replaced with the changed path.
    #[serde(default)]
    pub commands: Vec<Vec<String>>,

    /// Working directory for the commands.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Retry a path whose command chain exited non-zero.
    #[serde(default)]
    pub retry_on_failure: bool,

    /// Skip paths whose content did not change since their last successful run.
    #[serde(default)]
    pub skip_unchanged: bool,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see
/// [`validate`](crate::config::validate)).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub run: RunSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watch: WatchSection, run: RunSection) -> Self {
        Self { watch, run }
    }

    pub fn watch_spec(&self) -> WatchSpec {
        WatchSpec {
            path: self.watch.path.clone().unwrap_or_else(|| PathBuf::from(".")),
            include: self.watch.include.clone(),
            exclude: self.watch.exclude.clone(),
            recursive: self.watch.recursive,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.watch.timeout)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs_f64(self.watch.retry_interval)
    }

    pub fn terminate_after(&self) -> Option<Duration> {
        self.watch.terminate_after.map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let raw: RawConfigFile = toml::from_str("").unwrap();
        assert!(raw.watch.recursive);
        assert_eq!(raw.watch.timeout, 1.0);
        assert_eq!(raw.watch.retry_interval, 0.5);
        assert!(raw.run.commands.is_empty());
    }

    #[test]
    fn full_file_parses() {
        let raw: RawConfigFile = toml::from_str(
            r#"
            [watch]
            path = "src"
            include = ["*.c"]
            exclude = ["build"]
            recursive = false
            timeout = 0.1
            terminate_after = 2.0

            [run]
            commands = [["ninja"], ["ctest", "FILE"]]
            cwd = "build"
            retry_on_failure = true
            "#,
        )
        .unwrap();

        assert_eq!(raw.watch.path, Some(PathBuf::from("src")));
        assert!(!raw.watch.recursive);
        assert_eq!(raw.watch.terminate_after, Some(2.0));
        assert_eq!(raw.run.commands.len(), 2);
        assert!(raw.run.retry_on_failure);
        assert!(!raw.run.skip_unchanged);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<RawConfigFile>("[watch]\npaths = [\"a\"]").is_err());
    }
}
