// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Kind of change reported by a watch.
///
/// - `Renamed`: an entry appeared, disappeared or was renamed (creation and
///   deletion are reported as renames, like most native primitives do).
/// - `Changed`: the content or metadata of an entry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Renamed,
    Changed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Renamed => f.write_str("renamed"),
            ChangeKind::Changed => f.write_str("changed"),
        }
    }
}

/// Which native notification backend to use.
///
/// - `Native`: the platform's recommended watcher with native recursion
///   (default).
/// - `Emulated`: the platform's recommended watcher, one non-recursive watch
///   per directory; recursion is emulated by the watch handle.
/// - `Poll`: a polling watcher, for filesystems where native notifications are
///   unreliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Native,
    Emulated,
    Poll,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Native
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(BackendKind::Native),
            "emulated" => Ok(BackendKind::Emulated),
            "poll" | "polling" => Ok(BackendKind::Poll),
            other => Err(format!(
                "invalid backend: {other} (expected \"native\", \"emulated\" or \"poll\")"
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => f.write_str("native"),
            BackendKind::Emulated => f.write_str("emulated"),
            BackendKind::Poll => f.write_str("poll"),
        }
    }
}
