// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::{OnchangeError, Result};
use crate::watch::path_utils::{has_magic, to_slash};

/// Compiled include/exclude pattern lists for one watch.
///
/// A pattern matches a path when any of these holds:
///
/// - it glob-matches the base name (`*.c` matches `src/file.c`);
/// - it is a plain (non-glob) pattern equal to one segment of the path
///   relative to `base` (`build` matches `build/out/file.c`);
/// - it glob-matches the whole relative path or the whole absolute path
///   (`src/*.c` matches `src/file.c` but not `src/sub/file.c`).
///
/// `*`, `?` and `[...]` never match a path separator. Matching is
/// case-insensitive on Windows.
///
/// ```text
/// include = []            -> every path is a candidate
/// include = ["*.cpp"]     -> only .cpp files
/// exclude = ["moc_*"]     -> ...except generated moc files
/// exclude = [".git", "node_modules"]
/// ```
#[derive(Clone)]
pub struct PathMatcher {
    base: PathBuf,
    include: PatternList,
    exclude: PatternList,
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher")
            .field("base", &self.base)
            .field("include", &self.include.raw)
            .field("exclude", &self.exclude.raw)
            .finish()
    }
}

impl PathMatcher {
    /// Compile the pattern lists. `base` is the directory relative paths are
    /// computed from (the watch root, or the parent of a file root).
    pub fn new(base: impl Into<PathBuf>, include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            base: base.into(),
            include: PatternList::compile(include)?,
            exclude: PatternList::compile(exclude)?,
        })
    }

    /// A matcher that accepts everything under `base`.
    pub fn accept_all(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            include: PatternList::empty(),
            exclude: PatternList::empty(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include.raw
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude.raw
    }

    /// Returns true if `path` passes the include list (or the include list is
    /// empty) and hits no exclude pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let candidate = self.candidate(path);
        if !self.include.is_empty() && !self.include.matches(&candidate) {
            return false;
        }
        !self.exclude.matches(&candidate)
    }

    /// Only the exclude half of [`matches`](Self::matches).
    ///
    /// Directories are traversal vehicles, not matched content, so the
    /// watcher descends into any directory that is not excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.matches(&self.candidate(path))
    }

    fn candidate(&self, path: &Path) -> Candidate {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rel = path.strip_prefix(&self.base).ok().map(to_slash);
        Candidate {
            name,
            rel,
            full: to_slash(path),
        }
    }
}

struct Candidate {
    name: String,
    rel: Option<String>,
    full: String,
}

impl Candidate {
    /// Segments used for plain-pattern equality: the relative path when the
    /// path lives under the base, otherwise the full path.
    fn segments(&self) -> impl Iterator<Item = &str> {
        self.rel
            .as_deref()
            .unwrap_or(self.full.as_str())
            .split('/')
            .filter(|s| !s.is_empty())
    }
}

#[derive(Clone)]
struct PatternList {
    raw: Vec<String>,
    globs: GlobSet,
    /// Non-glob patterns, compared against single path segments.
    plain: Vec<String>,
}

impl PatternList {
    fn empty() -> Self {
        Self {
            raw: Vec::new(),
            globs: GlobSet::empty(),
            plain: Vec::new(),
        }
    }

    fn compile(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut plain = Vec::new();

        for pat in patterns {
            if pat.trim().is_empty() {
                return Err(OnchangeError::config("empty glob pattern"));
            }
            let glob = GlobBuilder::new(pat)
                .literal_separator(true)
                .case_insensitive(cfg!(windows))
                .build()
                .map_err(|source| OnchangeError::Pattern {
                    pattern: pat.clone(),
                    source,
                })?;
            builder.add(glob);
            if !has_magic(pat) {
                plain.push(pat.clone());
            }
        }

        let globs = builder.build().map_err(|source| OnchangeError::Pattern {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self {
            raw: patterns.to_vec(),
            globs,
            plain,
        })
    }

    fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn matches(&self, c: &Candidate) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.globs.is_match(&c.name) || self.globs.is_match(&c.full) {
            return true;
        }
        if let Some(rel) = &c.rel {
            if self.globs.is_match(rel) {
                return true;
            }
        }
        c.segments()
            .any(|seg| self.plain.iter().any(|p| segment_eq(p, seg)))
    }
}

fn segment_eq(pattern: &str, segment: &str) -> bool {
    if cfg!(windows) {
        pattern.to_lowercase() == segment.to_lowercase()
    } else {
        pattern == segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pats(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn matcher(include: &[&str], exclude: &[&str]) -> PathMatcher {
        PathMatcher::new("/w", &pats(include), &pats(exclude)).unwrap()
    }

    #[test]
    fn empty_include_accepts_everything() {
        let m = matcher(&[], &[]);
        assert!(m.matches(Path::new("/w/a.c")));
        assert!(m.matches(Path::new("/w/deep/dir/b.o")));
    }

    #[test]
    fn include_matches_base_name() {
        let m = matcher(&["*.c"], &[]);
        assert!(m.matches(Path::new("/w/file.c")));
        assert!(m.matches(Path::new("/w/sub/file.c")));
        assert!(!m.matches(Path::new("/w/file.o")));
    }

    #[test]
    fn exclude_wins_over_include() {
        let m = matcher(&["*.c"], &["file.c"]);
        assert!(!m.matches(Path::new("/w/file.c")));
        assert!(m.matches(Path::new("/w/other.c")));
    }

    #[test]
    fn plain_exclude_matches_any_segment() {
        let m = matcher(&[], &["*.o", "ign"]);
        assert!(!m.matches(Path::new("/w/ign")));
        assert!(!m.matches(Path::new("/w/ign/file.c")));
        assert!(!m.matches(Path::new("/w/notign/file.o")));
        assert!(m.matches(Path::new("/w/notign/file.c")));
    }

    #[test]
    fn segment_match_is_exact_not_prefix() {
        let m = matcher(&[], &["ign"]);
        assert!(m.matches(Path::new("/w/ignored/file.c")));
        assert!(m.matches(Path::new("/w/notign/file.c")));
    }

    #[test]
    fn segments_above_base_are_not_considered() {
        let m = PathMatcher::new("/tmp/ign/w", &[], &pats(&["ign"])).unwrap();
        assert!(m.matches(Path::new("/tmp/ign/w/file.c")));
    }

    #[test]
    fn wildcards_do_not_cross_separators() {
        let m = matcher(&["src/*.c"], &[]);
        assert!(m.matches(Path::new("/w/src/main.c")));
        assert!(!m.matches(Path::new("/w/src/sub/main.c")));
    }

    #[test]
    fn full_path_glob_matches() {
        let m = matcher(&["/w/gen/*.h"], &[]);
        assert!(m.matches(Path::new("/w/gen/a.h")));
        assert!(!m.matches(Path::new("/w/src/a.h")));
    }

    #[test]
    fn is_excluded_ignores_include() {
        let m = matcher(&["*.c"], &["build"]);
        assert!(!m.is_excluded(Path::new("/w/src")));
        assert!(m.is_excluded(Path::new("/w/build")));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = PathMatcher::new("/w", &pats(&["[abc"]), &[]).unwrap_err();
        assert!(matches!(err, OnchangeError::Pattern { .. }));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(PathMatcher::new("/w", &[], &pats(&[""])).is_err());
    }

    #[cfg(windows)]
    #[test]
    fn matching_is_case_insensitive_on_windows() {
        let m = PathMatcher::new("C:\\w", &pats(&["*.C"]), &pats(&["IGN"])).unwrap();
        assert!(m.matches(Path::new("C:\\w\\file.c")));
        assert!(!m.matches(Path::new("C:\\w\\ign\\file.c")));
    }
}
