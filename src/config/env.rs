// src/config/env.rs

//! Process-wide loop options read once from the environment.

use std::time::Duration;

use crate::errors::{OnchangeError, Result};
use crate::types::BackendKind;

pub const ENV_DEBUG: &str = "ONCHANGE_DEBUG";
pub const ENV_BACKEND: &str = "ONCHANGE_BACKEND";
pub const ENV_ASYNC: &str = "ONCHANGE_ASYNC";
pub const ENV_POLL_INTERVAL_MS: &str = "ONCHANGE_POLL_INTERVAL_MS";
pub const ENV_LOG: &str = "ONCHANGE_LOG";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Immutable loop configuration, threaded into every constructor that needs
/// it.
///
/// | variable                    | effect                                      |
/// |-----------------------------|---------------------------------------------|
/// | `ONCHANGE_DEBUG=1`          | debug logging                               |
/// | `ONCHANGE_BACKEND`          | `native`, `emulated` or `poll`              |
/// | `ONCHANGE_ASYNC=1`          | run on a multi-threaded host runtime        |
/// | `ONCHANGE_POLL_INTERVAL_MS` | poll backend interval (default 500)         |
/// | `ONCHANGE_LOG`              | log level when `--log-level` is not given   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    pub debug: bool,
    pub backend: BackendKind,
    pub async_mode: bool,
    pub poll_interval: Duration,
    pub log_level: Option<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            debug: false,
            backend: BackendKind::default(),
            async_mode: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_level: None,
        }
    }
}

impl LoopConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = lookup(ENV_DEBUG) {
            cfg.debug = parse_flag(ENV_DEBUG, &v)?;
        }
        if let Some(v) = lookup(ENV_ASYNC) {
            cfg.async_mode = parse_flag(ENV_ASYNC, &v)?;
        }
        if let Some(v) = lookup(ENV_BACKEND) {
            if !v.trim().is_empty() {
                cfg.backend = v
                    .parse()
                    .map_err(|e: String| OnchangeError::config(format!("{ENV_BACKEND}: {e}")))?;
            }
        }
        if let Some(v) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms: u64 = v.trim().parse().map_err(|_| {
                OnchangeError::config(format!(
                    "{ENV_POLL_INTERVAL_MS}: expected milliseconds, got {v:?}"
                ))
            })?;
            if ms == 0 {
                return Err(OnchangeError::config(format!(
                    "{ENV_POLL_INTERVAL_MS} must be positive"
                )));
            }
            cfg.poll_interval = Duration::from_millis(ms);
        }
        cfg.log_level = lookup(ENV_LOG).filter(|s| !s.trim().is_empty());

        Ok(cfg)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => Err(OnchangeError::config(format!(
            "{name}: expected 0/1, got {other:?}"
        ))),
    }
}
