#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use onchange::config::{ConfigFile, RawConfigFile};
use tempfile::TempDir;

/// A temporary directory tree, canonicalised so paths compare equal to what
/// a watch reports.
pub struct TempTree {
    dir: TempDir,
    root: PathBuf,
}

impl TempTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path().canonicalize().expect("canonicalize temp dir");
        Self { dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file, creating its parent directories.
    pub fn file(self, rel: &str, content: &str) -> Self {
        self.write(rel, content);
        self
    }

    pub fn dir(self, rel: &str) -> Self {
        self.mkdir(rel);
        self
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write file");
        path
    }

    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).expect("create dir");
        path
    }

    pub fn remove(&self, rel: &str) {
        let path = self.path(rel);
        if path.is_dir() {
            fs::remove_dir_all(&path).expect("remove dir");
        } else {
            fs::remove_file(&path).expect("remove file");
        }
    }

    pub fn rename(&self, from: &str, to: &str) {
        fs::rename(self.path(from), self.path(to)).expect("rename");
    }

    pub fn temp_dir(&self) -> &TempDir {
        &self.dir
    }
}

impl Default for TempTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut config = RawConfigFile::default();
        config.watch.path = Some(path.into());
        Self { config }
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.config.watch.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn command(mut self, argv: &[&str]) -> Self {
        self.config
            .run
            .commands
            .push(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn timeout(mut self, secs: f64) -> Self {
        self.config.watch.timeout = secs;
        self
    }

    pub fn terminate_after(mut self, secs: f64) -> Self {
        self.config.watch.terminate_after = Some(secs);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
