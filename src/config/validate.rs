// src/config/validate.rs

use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{OnchangeError, Result};
use crate::watch::PathMatcher;

/// Programs run through the shell on Windows rather than resolved on `PATH`.
pub const SHELL_BUILTINS: &[&str] = &["echo", "dir"];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = OnchangeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watch, raw.run))
    }
}

/// Check a raw configuration without converting it.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_path(cfg)?;
    validate_durations(cfg)?;
    validate_patterns(cfg)?;
    validate_commands(cfg)?;
    Ok(())
}

fn ensure_has_path(cfg: &RawConfigFile) -> Result<()> {
    match &cfg.watch.path {
        Some(p) if !p.as_os_str().is_empty() => Ok(()),
        _ => Err(OnchangeError::config(
            "no watch path given (pass SRC or set [watch].path)",
        )),
    }
}

fn validate_durations(cfg: &RawConfigFile) -> Result<()> {
    check_positive("watch.timeout", cfg.watch.timeout)?;
    check_positive("watch.retry_interval", cfg.watch.retry_interval)?;
    if let Some(t) = cfg.watch.terminate_after {
        check_positive("watch.terminate_after", t)?;
    }
    Ok(())
}

fn check_positive(name: &str, secs: f64) -> Result<()> {
    if secs.is_finite() && secs > 0.0 {
        Ok(())
    } else {
        Err(OnchangeError::config(format!(
            "{name} must be a positive number of seconds, got {secs}"
        )))
    }
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    PathMatcher::new(".", &cfg.watch.include, &cfg.watch.exclude)?;
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.commands.is_empty() {
        return Err(OnchangeError::config(
            "no command given (pass `-- CMD` or set [run].commands)",
        ));
    }

    let cwd = cfg.run.cwd.as_deref().unwrap_or(Path::new("."));

    for (idx, command) in cfg.run.commands.iter().enumerate() {
        let Some(program) = command.first().filter(|p| !p.trim().is_empty()) else {
            return Err(OnchangeError::config(format!("command #{} is empty", idx + 1)));
        };
        if SHELL_BUILTINS.contains(&program.as_str()) {
            continue;
        }
        which::which_in(program, std::env::var_os("PATH"), cwd).map_err(|_| {
            OnchangeError::config(format!("command not found: {program}"))
        })?;
    }

    Ok(())
}
