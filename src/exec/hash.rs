// src/exec/hash.rs

//! Content hashing so unchanged files are not re-run.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use blake3::Hasher;
use tracing::{debug, info};

use crate::engine::TaskOutcome;
use crate::errors::Result;
use crate::fs::FileSystem;

use super::backend::{ExecFuture, TaskExecutor};

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut reader = fs.open_read(path)?;
    let mut hasher = Hasher::new();
    io::copy(&mut reader, &mut hasher)
        .with_context(|| format!("hashing file {:?}", path))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Abstract storage for per-path content hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, path: &Path) -> Option<String>;
    fn save(&mut self, path: &Path, hash: &str);
}

/// Stores hashes in memory only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<PathBuf, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, path: &Path) -> Option<String> {
        self.map.get(path).cloned()
    }

    fn save(&mut self, path: &Path, hash: &str) {
        self.map.insert(path.to_path_buf(), hash.to_string());
    }
}

/// Executor decorator that skips a path whose content is identical to the
/// content it had at its last successful execution.
///
/// Unreadable files (removed, permission denied) are always passed through.
pub struct SkipUnchanged<E> {
    inner: E,
    fs: Arc<dyn FileSystem>,
    store: Box<dyn HashStore>,
}

impl<E> SkipUnchanged<E> {
    pub fn new(inner: E, fs: Arc<dyn FileSystem>) -> Self {
        Self::with_store(inner, fs, Box::new(MemoryHashStore::new()))
    }

    pub fn with_store(inner: E, fs: Arc<dyn FileSystem>, store: Box<dyn HashStore>) -> Self {
        Self { inner, fs, store }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: TaskExecutor> TaskExecutor for SkipUnchanged<E> {
    fn execute<'a>(&'a mut self, task: &'a Path) -> ExecFuture<'a> {
        Box::pin(async move {
            let hash = match compute_file_hash(self.fs.as_ref(), task) {
                Ok(h) => Some(h),
                Err(err) => {
                    debug!(path = ?task, error = %err, "cannot hash file; executing anyway");
                    None
                }
            };

            if let Some(h) = &hash {
                if self.store.load(task).as_deref() == Some(h.as_str()) {
                    info!(path = ?task, "content unchanged; skipping");
                    return Ok(TaskOutcome::Success);
                }
            }

            let outcome = self.inner.execute(task).await?;
            if let (TaskOutcome::Success, Some(h)) = (outcome, &hash) {
                self.store.save(task, h);
            }
            Ok(outcome)
        })
    }
}
