// src/watch/walk.rs

//! Initial enumeration of the paths under a watch root.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use tracing::debug;

use crate::errors::{OnchangeError, Result};
use crate::fs::FileSystem;
use crate::watch::path_utils::has_magic;
use crate::watch::patterns::PathMatcher;

/// How far [`enumerate`] descends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Descend into matching directories.
    pub recursive: bool,
    /// Record and descend into every directory, matching or not, so that
    /// matching files below unmatched directories are found.
    pub all_dirs: bool,
}

impl WalkOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            all_dirs: true,
        }
    }

    pub fn flat() -> Self {
        Self::default()
    }
}

/// Directories and files found under one or more roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Resolve a watch root into concrete, canonical paths.
///
/// A root that exists is taken literally, even when its name contains glob
/// characters. Otherwise wildcards in its last component (`src/*.c`) are
/// expanded one level against the entries of its parent directory. Wildcards
/// anywhere else are rejected, as is a pattern that matches nothing or a plain
/// root that does not exist.
pub fn expand_root(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
    if fs.exists(root) {
        return Ok(vec![fs.canonicalize(root)?]);
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| OnchangeError::config(format!("invalid watch root {:?}", root)))?;

    let parent = match root.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if !has_magic(&name) || !fs.is_dir(parent) {
        if has_magic(&root.to_string_lossy()) {
            return Err(OnchangeError::config(format!(
                "glob wildcards are only supported in the last component of the watch root: {:?}",
                root
            )));
        }
        return Err(OnchangeError::PathNotFound(root.to_path_buf()));
    }

    let glob = GlobBuilder::new(&name)
        .literal_separator(true)
        .case_insensitive(cfg!(windows))
        .build()
        .map_err(|source| OnchangeError::Pattern {
            pattern: name.clone(),
            source,
        })?
        .compile_matcher();

    let entries = fs.read_dir(parent)?;

    let mut roots = Vec::new();
    for entry in entries {
        let matched = entry
            .file_name()
            .is_some_and(|n| glob.is_match(n.to_string_lossy().as_ref()));
        if matched {
            roots.push(fs.canonicalize(&entry)?);
        }
    }

    if roots.is_empty() {
        return Err(OnchangeError::config(format!(
            "watch root pattern {:?} matches no paths",
            root
        )));
    }

    debug!(?root, ?roots, "expanded glob watch root");
    Ok(roots)
}

/// Breadth-first enumeration of `root`.
///
/// The root itself is never filtered: a file root is always returned in
/// `files`, a directory root always heads `dirs`. Entries of one directory are
/// visited in lexicographic order. Directories that cannot be read (permission
/// denied, removed mid-walk) are skipped.
pub fn enumerate(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &PathMatcher,
    options: WalkOptions,
) -> Enumeration {
    let mut out = Enumeration::default();

    if fs.is_file(root) {
        out.files.push(root.to_path_buf());
        return out;
    }

    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    visited.insert(identity(fs, root));
    out.dirs.push(root.to_path_buf());
    queue.push_back(root.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = ?dir, error = %err, "skipping unreadable directory");
                continue;
            }
        };

        for entry in entries {
            let is_dir = fs.is_dir(&entry);
            let descend = if matcher.matches(&entry) {
                if is_dir {
                    out.dirs.push(entry.clone());
                    options.recursive || options.all_dirs
                } else {
                    if fs.is_file(&entry) {
                        out.files.push(entry);
                    }
                    continue;
                }
            } else if is_dir && options.all_dirs {
                out.dirs.push(entry.clone());
                true
            } else {
                false
            };

            // Symlinked directories can form cycles; descend once per target.
            if descend && visited.insert(identity(fs, &entry)) {
                queue.push_back(entry);
            }
        }
    }

    out
}

/// Whether `path` and every directory between `root` and `path` pass the
/// exclude filter. Paths outside `root` are not traversable.
pub fn is_traversable(matcher: &PathMatcher, root: &Path, path: &Path) -> bool {
    if !path.starts_with(root) {
        return false;
    }
    path.ancestors()
        .take_while(|a| *a != root)
        .all(|a| !matcher.is_excluded(a))
}

fn identity(fs: &dyn FileSystem, path: &Path) -> PathBuf {
    fs.canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
