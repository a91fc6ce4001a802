// src/watch/backend/mod.rs

//! Native watch primitives behind a small trait.
//!
//! A [`WatchBackend`] installs one primitive per [`WatchTarget`] and reports
//! raw `(target, entry, kind)` notifications over an unbounded channel. The
//! watch handle decides which targets to install; the router decides what the
//! notifications mean. Tests swap in a fake backend and inject events
//! directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::types::{BackendKind, ChangeKind};
use crate::watch::patterns::PathMatcher;

pub mod notify;

pub use self::notify::NotifyBackend;

/// A raw notification from one watch target.
///
/// File targets report with `entry = None`; directory targets report the
/// entry relative to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub target: PathBuf,
    pub entry: Option<PathBuf>,
    pub kind: ChangeKind,
}

impl RawEvent {
    pub fn new(target: impl Into<PathBuf>, entry: Option<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            target: target.into(),
            entry,
            kind,
        }
    }

    /// Absolute path the notification is about.
    pub fn resolve(&self) -> PathBuf {
        match &self.entry {
            Some(entry) => self.target.join(entry),
            None => self.target.clone(),
        }
    }
}

/// Everything a backend can put on its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Raw(RawEvent),
    /// Events were dropped; the consumer should re-walk its roots.
    Rescan,
    /// A per-event failure reported by the native layer. Never fatal.
    Error(String),
}

pub type EventSender = mpsc::UnboundedSender<BackendEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// What a backend can do natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// One primitive covers a whole directory tree.
    pub native_recursion: bool,
    /// A directory primitive reports changes to the files inside it.
    pub directory_entries: bool,
}

/// One concrete path to install a native primitive on.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub is_dir: bool,
    /// Request native recursion. Only honoured when the backend supports it.
    pub recursive: bool,
    pub matcher: Arc<PathMatcher>,
}

impl WatchTarget {
    pub fn file(path: impl Into<PathBuf>, matcher: Arc<PathMatcher>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            recursive: false,
            matcher,
        }
    }

    pub fn dir(path: impl Into<PathBuf>, recursive: bool, matcher: Arc<PathMatcher>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            recursive,
            matcher,
        }
    }
}

/// Platform watch primitive contract.
pub trait WatchBackend: Send {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> BackendCapabilities;

    /// Install a primitive for `target`. A path that vanished before the
    /// primitive could be installed is reported as
    /// [`OnchangeError::Backend`](crate::errors::OnchangeError::Backend) with
    /// `notify::ErrorKind::PathNotFound`.
    fn watch(&mut self, target: &WatchTarget) -> Result<()>;

    /// Release the primitive installed for `path`.
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}

/// Create the backend selected by `kind` along with the receiving end of its
/// event channel.
pub fn create_backend(
    kind: BackendKind,
    poll_interval: Duration,
) -> Result<(Box<dyn WatchBackend>, EventReceiver)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let backend = NotifyBackend::new(kind, poll_interval, tx)?;
    Ok((Box::new(backend), rx))
}
