// src/watch/handle.rs

//! One logical watch composed of many native primitives.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{OnchangeError, Result};
use crate::fs::FileSystem;
use crate::watch::backend::{BackendCapabilities, WatchBackend, WatchTarget};
use crate::watch::patterns::PathMatcher;
use crate::watch::walk::{WalkOptions, enumerate, is_traversable};

/// Owns a backend and every target installed on it.
///
/// When the backend lacks native recursion the handle emulates it: the router
/// reports newly discovered directories and the handle adds a non-recursive
/// watch for each one it does not already have.
pub struct WatchHandle {
    backend: Box<dyn WatchBackend>,
    installed: BTreeMap<PathBuf, WatchTarget>,
    stopped: bool,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("backend", &self.backend.name())
            .field("installed", &self.installed.keys().collect::<Vec<_>>())
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl WatchHandle {
    /// Install every target. If one fails, the targets already installed are
    /// released before the error is returned.
    pub fn start(backend: Box<dyn WatchBackend>, targets: Vec<WatchTarget>) -> Result<Self> {
        let mut handle = Self {
            backend,
            installed: BTreeMap::new(),
            stopped: false,
        };

        for target in targets {
            if let Err(err) = handle.install(target) {
                handle.stop();
                return Err(err);
            }
        }

        info!(
            backend = handle.backend.name(),
            targets = handle.installed.len(),
            "watch started"
        );
        Ok(handle)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.backend.capabilities()
    }

    pub fn emulates_recursion(&self) -> bool {
        !self.backend.capabilities().native_recursion
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.installed.contains_key(path)
    }

    pub fn watched_paths(&self) -> impl Iterator<Item = &Path> {
        self.installed.keys().map(PathBuf::as_path)
    }

    /// Add a non-recursive watch on a newly discovered directory.
    ///
    /// Returns `Ok(false)` when recursion is native, the directory is already
    /// watched, or it vanished before the watch could be installed.
    pub fn add_directory(&mut self, dir: &Path, matcher: Arc<PathMatcher>) -> Result<bool> {
        if self.stopped || !self.emulates_recursion() {
            return Ok(false);
        }
        self.install(WatchTarget::dir(dir, false, matcher))
    }

    /// Drop the watches on `path` and everything below it. Used when a
    /// directory is observed to be gone; a recreated directory is picked up
    /// again by the router's re-walk of its parent.
    pub fn forget(&mut self, path: &Path) {
        let gone: Vec<PathBuf> = self
            .installed
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();

        for p in gone {
            self.installed.remove(&p);
            if let Err(err) = self.backend.unwatch(&p) {
                debug!(path = ?p, error = %err, "releasing vanished watch");
            }
        }
    }

    /// Release every native primitive. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        let installed = std::mem::take(&mut self.installed);
        for path in installed.keys() {
            if let Err(err) = self.backend.unwatch(path) {
                debug!(path = ?path, error = %err, "error releasing watch");
            }
        }
        debug!(released = installed.len(), "watch stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn install(&mut self, target: WatchTarget) -> Result<bool> {
        if self.installed.contains_key(&target.path) {
            return Ok(false);
        }

        match self.backend.watch(&target) {
            Ok(()) => {
                debug!(path = ?target.path, is_dir = target.is_dir, "watching");
                self.installed.insert(target.path.clone(), target);
                Ok(true)
            }
            // Deleted before we got to it; its parent is still watched.
            Err(OnchangeError::Backend(err)) if matches!(err.kind, notify::ErrorKind::PathNotFound) => {
                debug!(path = ?target.path, "watch target vanished before install");
                Ok(false)
            }
            Err(err) => {
                warn!(path = ?target.path, error = %err, "failed to install watch");
                Err(err)
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Targets to install at startup for the given concrete roots.
///
/// - A file root gets one file target.
/// - A directory root gets one natively recursive target when the backend can
///   recurse; otherwise the root plus one target per traversable directory
///   below it.
/// - Non-recursive watches cover the root directory only.
/// - Backends that do not report directory entries also get one target per
///   enumerated file.
pub fn plan_targets(
    fs: &dyn FileSystem,
    roots: &[PathBuf],
    matcher: &Arc<PathMatcher>,
    recursive: bool,
    caps: BackendCapabilities,
) -> Vec<WatchTarget> {
    let mut targets = Vec::new();
    let options = if recursive {
        WalkOptions::recursive()
    } else {
        WalkOptions::flat()
    };

    for root in roots {
        if fs.is_file(root) {
            targets.push(WatchTarget::file(root, Arc::clone(matcher)));
            continue;
        }

        let needs_walk = (recursive && !caps.native_recursion) || !caps.directory_entries;
        let found = needs_walk.then(|| enumerate(fs, root, matcher, options));

        if recursive && caps.native_recursion {
            targets.push(WatchTarget::dir(root, true, Arc::clone(matcher)));
        } else if recursive {
            if let Some(found) = &found {
                for dir in &found.dirs {
                    if dir == root || is_traversable(matcher, root, dir) {
                        targets.push(WatchTarget::dir(dir, false, Arc::clone(matcher)));
                    }
                }
            }
        } else {
            targets.push(WatchTarget::dir(root, false, Arc::clone(matcher)));
        }

        if !caps.directory_entries {
            if let Some(found) = found {
                for file in found.files {
                    if is_traversable(matcher, root, &file) {
                        targets.push(WatchTarget::file(file, Arc::clone(matcher)));
                    }
                }
            }
        }
    }

    targets
}
