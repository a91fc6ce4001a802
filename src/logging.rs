// src/logging.rs

//! Logging setup for `onchange` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ONCHANGE_DEBUG=1` (debug)
//! 3. `ONCHANGE_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that command stdout stays clean.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::config::LoopConfig;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, config: &LoopConfig) -> Result<()> {
    let level = effective_level(cli_level, config);

    fmt()
        .with_max_level(level)
        .with_target(level >= tracing::Level::DEBUG)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;

    Ok(())
}

/// Resolve the level from the CLI flag and the loop configuration.
pub fn effective_level(cli_level: Option<LogLevel>, config: &LoopConfig) -> tracing::Level {
    if let Some(lvl) = cli_level {
        return level_from_log_level(lvl);
    }
    if config.debug {
        return tracing::Level::DEBUG;
    }
    config
        .log_level
        .as_deref()
        .and_then(parse_level_str)
        .unwrap_or(tracing::Level::INFO)
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn cli_flag_wins() {
        let cfg = LoopConfig {
            debug: true,
            ..LoopConfig::default()
        };
        assert_eq!(effective_level(Some(LogLevel::Warn), &cfg), Level::WARN);
    }

    #[test]
    fn debug_env_beats_log_env() {
        let cfg = LoopConfig {
            debug: true,
            log_level: Some("error".into()),
            ..LoopConfig::default()
        };
        assert_eq!(effective_level(None, &cfg), Level::DEBUG);
    }

    #[test]
    fn log_env_then_default() {
        let cfg = LoopConfig {
            log_level: Some("Trace".into()),
            ..LoopConfig::default()
        };
        assert_eq!(effective_level(None, &cfg), Level::TRACE);

        let cfg = LoopConfig {
            log_level: Some("chatty".into()),
            ..LoopConfig::default()
        };
        assert_eq!(effective_level(None, &cfg), Level::INFO);
    }
}
