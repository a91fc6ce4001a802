// src/watch/backend/notify.rs

//! `notify`-based backends: the platform's recommended watcher (with native or
//! emulated recursion) and the polling watcher.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use tracing::{debug, trace};

use crate::errors::Result;
use crate::types::{BackendKind, ChangeKind};

use super::{
    BackendCapabilities, BackendEvent, EventSender, RawEvent, WatchBackend, WatchTarget,
};

/// A thin wrapper around [`RecommendedWatcher`] and [`PollWatcher`].
enum NotifyWatcher {
    Recommended(RecommendedWatcher),
    Polling(PollWatcher),
}

impl NotifyWatcher {
    fn watch(&mut self, path: &Path, mode: RecursiveMode) -> notify::Result<()> {
        match self {
            Self::Recommended(w) => w.watch(path, mode),
            Self::Polling(w) => w.watch(path, mode),
        }
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        match self {
            Self::Recommended(w) => w.unwatch(path),
            Self::Polling(w) => w.unwatch(path),
        }
    }
}

/// Backend over `notify`.
///
/// The callback runs on notify's own thread and only forwards events over the
/// channel; all interpretation happens on the loop task.
pub struct NotifyBackend {
    kind: BackendKind,
    watcher: NotifyWatcher,
    /// Paths installed as file targets, so their events report `entry = None`.
    files: Arc<Mutex<HashSet<PathBuf>>>,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl NotifyBackend {
    pub fn new(kind: BackendKind, poll_interval: Duration, tx: EventSender) -> Result<Self> {
        let files: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));

        let handler = {
            let files = Arc::clone(&files);
            move |res: notify::Result<Event>| match res {
                Ok(event) => forward(&tx, &files, event),
                Err(err) => {
                    // The receiver is gone once the watch stopped; nothing to do.
                    let _ = tx.send(BackendEvent::Error(err.to_string()));
                }
            }
        };

        let watcher = match kind {
            BackendKind::Native | BackendKind::Emulated => {
                NotifyWatcher::Recommended(RecommendedWatcher::new(handler, Config::default())?)
            }
            BackendKind::Poll => {
                let config = Config::default().with_poll_interval(poll_interval);
                NotifyWatcher::Polling(PollWatcher::new(handler, config)?)
            }
        };

        debug!(backend = %kind, "created notify backend");
        Ok(Self {
            kind,
            watcher,
            files,
        })
    }

    fn file_targets(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        // A panic while holding the lock leaves the set usable.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WatchBackend for NotifyBackend {
    fn name(&self) -> &'static str {
        match self.kind {
            BackendKind::Native => "native",
            BackendKind::Emulated => "emulated",
            BackendKind::Poll => "poll",
        }
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            native_recursion: !matches!(self.kind, BackendKind::Emulated),
            directory_entries: true,
        }
    }

    fn watch(&mut self, target: &WatchTarget) -> Result<()> {
        let mode = if target.is_dir && target.recursive && self.capabilities().native_recursion {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        if !target.is_dir {
            self.file_targets().insert(target.path.clone());
        }

        if let Err(err) = self.watcher.watch(&target.path, mode) {
            if !target.is_dir {
                self.file_targets().remove(&target.path);
            }
            return Err(err.into());
        }

        trace!(path = ?target.path, ?mode, "installed notify watch");
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.file_targets().remove(path);
        self.watcher.unwatch(path)?;
        Ok(())
    }
}

fn forward(tx: &EventSender, files: &Mutex<HashSet<PathBuf>>, event: Event) {
    if event.need_rescan() {
        let _ = tx.send(BackendEvent::Rescan);
        return;
    }

    let Some(kind) = classify(&event.kind) else {
        return;
    };

    let files = files.lock().unwrap_or_else(|e| e.into_inner());
    for path in event.paths {
        let raw = to_raw(path, kind, &files);
        if tx.send(BackendEvent::Raw(raw)).is_err() {
            return;
        }
    }
}

/// Map a notify event kind onto the two kinds the router understands.
///
/// Creation and removal are reported as renames, the way most native
/// primitives report them. Pure access events are dropped.
fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Access(_) => None,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            Some(ChangeKind::Renamed)
        }
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Some(ChangeKind::Changed),
    }
}

fn to_raw(path: PathBuf, kind: ChangeKind, files: &HashSet<PathBuf>) -> RawEvent {
    if files.contains(&path) {
        return RawEvent::new(path, None, kind);
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => RawEvent::new(parent, Some(PathBuf::from(name)), kind),
        _ => RawEvent::new(path, None, kind),
    }
}
