// src/watch/watcher.rs

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::LoopConfig;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::backend::{BackendEvent, EventReceiver, WatchBackend, create_backend};
use crate::watch::handle::{WatchHandle, plan_targets};
use crate::watch::patterns::PathMatcher;
use crate::watch::router::{Change, ChangeRouter, Routed};
use crate::watch::walk::expand_root;

/// What to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    /// A file, a directory, or a glob in the last component (`src/*.c`).
    pub path: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub recursive: bool,
}

impl WatchSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            include: Vec::new(),
            exclude: Vec::new(),
            recursive: true,
        }
    }
}

/// A running watch: native primitives plus the router that interprets their
/// notifications.
///
/// Changes are pulled one at a time with [`next_change`](Self::next_change)
/// on the task that owns the watch.
pub struct Watch {
    handle: WatchHandle,
    router: ChangeRouter,
    events: EventReceiver,
    buffered: VecDeque<Change>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("handle", &self.handle)
            .field("router", &self.router)
            .field("buffered", &self.buffered.len())
            .finish()
    }
}

impl Watch {
    /// Start watching with the backend selected by `config`.
    pub fn start(spec: &WatchSpec, config: &LoopConfig) -> Result<Self> {
        let (backend, events) = create_backend(config.backend, config.poll_interval)?;
        Self::with_backend(spec, backend, events, Arc::new(RealFileSystem))
    }

    /// Start watching on an injected backend and filesystem.
    pub fn with_backend(
        spec: &WatchSpec,
        backend: Box<dyn WatchBackend>,
        events: EventReceiver,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let (roots, matcher) = resolve(spec, fs.as_ref())?;

        let targets = plan_targets(
            fs.as_ref(),
            &roots,
            &matcher,
            spec.recursive,
            backend.capabilities(),
        );
        let handle = WatchHandle::start(backend, targets)?;
        let router = ChangeRouter::new(fs, roots, matcher, spec.recursive);

        info!(
            path = ?spec.path,
            roots = ?router.roots(),
            recursive = spec.recursive,
            backend = handle.backend_name(),
            "watching"
        );

        Ok(Self {
            handle,
            router,
            events,
            buffered: VecDeque::new(),
        })
    }

    /// Wait for the next matched change.
    ///
    /// Returns `None` once the watch is stopped and the backend channel is
    /// drained. Cancel-safe: dropping the future loses no change.
    pub async fn next_change(&mut self) -> Option<Change> {
        loop {
            if let Some(change) = self.buffered.pop_front() {
                return Some(change);
            }
            let event = self.events.recv().await?;
            self.process(event);
        }
    }

    /// Release every native primitive. Idempotent; also run on drop.
    pub fn stop(&mut self) {
        if self.handle.is_stopped() {
            return;
        }
        self.handle.stop();
        self.events.close();
        self.buffered.clear();
        info!("watch stopped");
    }

    pub fn roots(&self) -> &[PathBuf] {
        self.router.roots()
    }

    pub fn matcher(&self) -> &PathMatcher {
        self.router.matcher()
    }

    /// Files currently known to match.
    pub fn known_files(&self) -> impl Iterator<Item = &Path> {
        self.router.known_files()
    }

    pub fn watched_paths(&self) -> impl Iterator<Item = &Path> {
        self.handle.watched_paths()
    }

    fn process(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Raw(raw) => {
                debug!(watch_target = ?raw.target, entry = ?raw.entry, kind = %raw.kind, "raw event");
                let routed = self.router.route(&raw);
                self.apply(routed);
            }
            BackendEvent::Rescan => {
                warn!("watch backend dropped events; rescanning roots");
                let routed = self.router.rescan();
                self.apply(routed);
            }
            BackendEvent::Error(msg) => {
                warn!(error = %msg, "watch backend error");
            }
        }
    }

    fn apply(&mut self, routed: Routed) {
        for path in &routed.removed {
            self.handle.forget(path);
        }
        for dir in &routed.new_dirs {
            match self.handle.add_directory(dir, Arc::clone(self.router.matcher())) {
                Ok(true) => debug!(?dir, "watching new directory"),
                Ok(false) => {}
                Err(err) => warn!(?dir, error = %err, "failed to watch new directory"),
            }
        }
        self.buffered.extend(routed.changes);
    }
}

/// Files a watch on `spec` would start out knowing about, without installing
/// anything.
pub fn matched_files(spec: &WatchSpec, fs: Arc<dyn FileSystem>) -> Result<Vec<PathBuf>> {
    let (roots, matcher) = resolve(spec, fs.as_ref())?;
    let router = ChangeRouter::new(fs, roots, matcher, spec.recursive);
    Ok(router.known_files().map(Path::to_path_buf).collect())
}

/// Concrete roots and the matcher shared by every target of the watch.
fn resolve(spec: &WatchSpec, fs: &dyn FileSystem) -> Result<(Vec<PathBuf>, Arc<PathMatcher>)> {
    let roots = expand_root(fs, &spec.path)?;
    let base = matcher_base(fs, &spec.path, &roots);
    let matcher = Arc::new(PathMatcher::new(base, &spec.include, &spec.exclude)?);
    Ok((roots, matcher))
}

/// Directory relative patterns are evaluated against: the watch root for an
/// existing directory, the parent for a file root or an expanded glob root.
fn matcher_base(fs: &dyn FileSystem, spec_path: &Path, roots: &[PathBuf]) -> PathBuf {
    let Some(first) = roots.first() else {
        return spec_path.to_path_buf();
    };
    if fs.exists(spec_path) && fs.is_dir(first) {
        return first.clone();
    }
    first.parent().map(Path::to_path_buf).unwrap_or_else(|| first.clone())
}
