// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Whether `s` contains glob wildcard characters.
pub fn has_magic(s: &str) -> bool {
    s.contains(['*', '?', '['])
}
