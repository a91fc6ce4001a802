use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use onchange::errors::{OnchangeError, Result};
use onchange::types::ChangeKind;
use onchange::watch::{
    BackendCapabilities, BackendEvent, EventReceiver, EventSender, RawEvent, WatchBackend,
    WatchTarget,
};
use tokio::sync::mpsc;

pub const NATIVE: BackendCapabilities = BackendCapabilities {
    native_recursion: true,
    directory_entries: true,
};

pub const EMULATED: BackendCapabilities = BackendCapabilities {
    native_recursion: false,
    directory_entries: true,
};

#[derive(Debug, Default)]
struct State {
    watched: BTreeSet<PathBuf>,
    installs: Vec<PathBuf>,
    released: Vec<PathBuf>,
    fail_on: Option<PathBuf>,
}

/// A backend that installs nothing:
/// - records every `watch` / `unwatch` call
/// - fails on one chosen path, if asked to
/// - lets the test inject raw notifications through its [`FakeController`].
pub struct FakeBackend {
    caps: BackendCapabilities,
    state: Arc<Mutex<State>>,
}

/// Test-side view of a [`FakeBackend`], usable after the backend has been
/// moved into a watch.
#[derive(Clone)]
pub struct FakeController {
    state: Arc<Mutex<State>>,
    tx: EventSender,
}

impl FakeBackend {
    pub fn new(caps: BackendCapabilities) -> (Box<dyn WatchBackend>, EventReceiver, FakeController) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(State::default()));
        let backend = Self {
            caps,
            state: Arc::clone(&state),
        };
        (Box::new(backend), rx, FakeController { state, tx })
    }
}

impl WatchBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.caps
    }

    fn watch(&mut self, target: &WatchTarget) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on.as_deref() == Some(target.path.as_path()) {
            return Err(OnchangeError::Other(anyhow::anyhow!(
                "refusing to watch {:?}",
                target.path
            )));
        }
        state.installs.push(target.path.clone());
        state.watched.insert(target.path.clone());
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.watched.remove(path);
        state.released.push(path.to_path_buf());
        Ok(())
    }
}

impl FakeController {
    /// Make the next `watch` call on `path` fail.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().fail_on = Some(path.into());
    }

    /// Paths with a live primitive.
    pub fn watched(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().watched.iter().cloned().collect()
    }

    /// Every successful `watch` call, in order.
    pub fn installs(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().installs.clone()
    }

    /// Every `unwatch` call, in order.
    pub fn released(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().released.clone()
    }

    /// Inject a notification for an entry of a watched directory.
    pub fn entry(&self, dir: impl Into<PathBuf>, name: &str, kind: ChangeKind) {
        self.send(BackendEvent::Raw(RawEvent::new(
            dir,
            Some(PathBuf::from(name)),
            kind,
        )));
    }

    /// Inject a notification for a watched file.
    pub fn file(&self, path: impl Into<PathBuf>, kind: ChangeKind) {
        self.send(BackendEvent::Raw(RawEvent::new(path, None, kind)));
    }

    pub fn send(&self, event: BackendEvent) {
        // The receiver is closed once the watch stops; late events are dropped.
        let _ = self.tx.send(event);
    }
}
