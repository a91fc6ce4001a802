// src/watch/router.rs

//! Turns raw backend notifications into concrete changed file paths.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::fs::FileSystem;
use crate::types::ChangeKind;
use crate::watch::backend::RawEvent;
use crate::watch::patterns::PathMatcher;
use crate::watch::walk::{WalkOptions, enumerate, is_traversable};

/// A matched change to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl Change {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Result of routing one raw notification.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Routed {
    /// Matched changes, in the order they should be delivered.
    pub changes: Vec<Change>,
    /// Newly discovered directories that pass the exclude filter. Only
    /// populated in recursive mode.
    pub new_dirs: Vec<PathBuf>,
    /// Known paths that no longer exist.
    pub removed: Vec<PathBuf>,
}

impl Routed {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.new_dirs.is_empty() && self.removed.is_empty()
    }

    fn merge(&mut self, other: Routed) {
        self.changes.extend(other.changes);
        self.new_dirs.extend(other.new_dirs);
        self.removed.extend(other.removed);
    }
}

/// Filters and resolves notifications against a snapshot of known paths.
///
/// The snapshot is seeded from the initial enumeration so that re-walking a
/// directory only reports files that were not there before.
pub struct ChangeRouter {
    fs: Arc<dyn FileSystem>,
    roots: Vec<PathBuf>,
    matcher: Arc<PathMatcher>,
    recursive: bool,
    known_files: BTreeSet<PathBuf>,
    known_dirs: BTreeSet<PathBuf>,
}

impl fmt::Debug for ChangeRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRouter")
            .field("roots", &self.roots)
            .field("recursive", &self.recursive)
            .field("known_files", &self.known_files.len())
            .field("known_dirs", &self.known_dirs.len())
            .finish()
    }
}

impl ChangeRouter {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        roots: Vec<PathBuf>,
        matcher: Arc<PathMatcher>,
        recursive: bool,
    ) -> Self {
        let mut router = Self {
            fs,
            roots,
            matcher,
            recursive,
            known_files: BTreeSet::new(),
            known_dirs: BTreeSet::new(),
        };

        for root in router.roots.clone() {
            if router.fs.is_file(&root) {
                router.known_files.insert(root);
            } else {
                // Seeding only fills the snapshot; nothing is reported.
                let _ = router.rewalk(&root, &root);
            }
        }

        debug!(
            files = router.known_files.len(),
            dirs = router.known_dirs.len(),
            "seeded change router"
        );
        router
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn matcher(&self) -> &Arc<PathMatcher> {
        &self.matcher
    }

    pub fn known_files(&self) -> impl Iterator<Item = &Path> {
        self.known_files.iter().map(PathBuf::as_path)
    }

    pub fn route(&mut self, raw: &RawEvent) -> Routed {
        let path = raw.resolve();

        let Some(root) = self.root_for(&path).map(Path::to_path_buf) else {
            trace!(?path, "ignoring event outside watched roots");
            return Routed::default();
        };

        if self.fs.is_dir(&path) {
            return self.directory_event(&path, &root);
        }

        if self.fs.is_file(&path) {
            return self.file_event(path, &root, raw.kind);
        }

        self.vanished(&path, &root, raw.kind)
    }

    /// Re-walk every directory root, reporting files that appeared and
    /// dropping known paths that disappeared since the last look.
    pub fn rescan(&mut self) -> Routed {
        let mut out = Routed::default();

        let gone: Vec<PathBuf> = self
            .known_files
            .iter()
            .chain(self.known_dirs.iter())
            .filter(|p| !self.fs.exists(p))
            .cloned()
            .collect();
        for path in gone {
            self.known_files.remove(&path);
            self.known_dirs.remove(&path);
            out.removed.push(path);
        }

        for root in self.roots.clone() {
            if self.fs.is_dir(&root) {
                out.merge(self.rewalk(&root, &root));
            }
        }
        out
    }

    fn root_for(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .find(|root| {
                path == root.as_path()
                    || if self.recursive {
                        path.starts_with(root)
                    } else {
                        path.parent() == Some(root.as_path())
                    }
            })
            .map(PathBuf::as_path)
    }

    fn accepts(&self, root: &Path, path: &Path) -> bool {
        path == root || (self.matcher.matches(path) && is_traversable(&self.matcher, root, path))
    }

    fn file_event(&mut self, path: PathBuf, root: &Path, kind: ChangeKind) -> Routed {
        let mut out = Routed::default();
        if !self.accepts(root, &path) {
            trace!(?path, "ignoring unmatched path");
            return out;
        }

        self.known_files.insert(path.clone());
        if kind == ChangeKind::Renamed {
            out.changes.push(Change::new(path.clone(), ChangeKind::Renamed));
        }
        out.changes.push(Change::new(path, ChangeKind::Changed));
        out
    }

    fn directory_event(&mut self, dir: &Path, root: &Path) -> Routed {
        if self.recursive {
            if dir != root && !is_traversable(&self.matcher, root, dir) {
                trace!(?dir, "ignoring excluded directory");
                return Routed::default();
            }
            self.rewalk(dir, root)
        } else {
            self.rewalk(root, root)
        }
    }

    /// Walk `dir` and report whatever the snapshot does not know yet.
    fn rewalk(&mut self, dir: &Path, root: &Path) -> Routed {
        let options = if self.recursive {
            WalkOptions::recursive()
        } else {
            WalkOptions::flat()
        };
        let found = enumerate(self.fs.as_ref(), dir, &self.matcher, options);
        let mut out = Routed::default();

        for d in found.dirs {
            if d == root || !is_traversable(&self.matcher, root, &d) {
                continue;
            }
            if self.known_dirs.insert(d.clone()) && self.recursive {
                out.new_dirs.push(d);
            }
        }

        for f in found.files {
            if self.accepts(root, &f) && self.known_files.insert(f.clone()) {
                out.changes.push(Change::new(f, ChangeKind::Changed));
            }
        }

        if !out.is_empty() {
            debug!(
                ?dir,
                new_files = out.changes.len(),
                new_dirs = out.new_dirs.len(),
                "directory re-walk"
            );
        }
        out
    }

    fn vanished(&mut self, path: &Path, root: &Path, kind: ChangeKind) -> Routed {
        let mut out = Routed::default();
        let was_known = self.known_files.contains(path) || self.known_dirs.contains(path);

        let mut removed: Vec<PathBuf> = Vec::new();
        self.known_files.retain(|p| {
            let under = p.starts_with(path);
            if under {
                removed.push(p.clone());
            }
            !under
        });
        self.known_dirs.retain(|p| {
            let under = p.starts_with(path);
            if under {
                removed.push(p.clone());
            }
            !under
        });
        removed.sort();
        out.removed = removed;

        if kind == ChangeKind::Renamed && (was_known || self.accepts(root, path)) {
            out.changes.push(Change::new(path, ChangeKind::Renamed));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn pats(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn setup(
        include: &[&str],
        exclude: &[&str],
        recursive: bool,
    ) -> (MockFileSystem, ChangeRouter) {
        let fs = MockFileSystem::new();
        fs.add_file("/w/file.c", b"");
        fs.add_file("/w/sub/old.c", b"");
        let matcher = Arc::new(PathMatcher::new("/w", &pats(include), &pats(exclude)).unwrap());
        let router = ChangeRouter::new(
            Arc::new(fs.clone()),
            vec![PathBuf::from("/w")],
            matcher,
            recursive,
        );
        (fs, router)
    }

    fn dir_event(dir: &str, entry: &str, kind: ChangeKind) -> RawEvent {
        RawEvent::new(dir, Some(PathBuf::from(entry)), kind)
    }

    #[test]
    fn seeds_snapshot_from_initial_enumeration() {
        let (_fs, router) = setup(&[], &[], true);
        let known: Vec<_> = router.known_files().collect();
        assert_eq!(known, vec![Path::new("/w/file.c"), Path::new("/w/sub/old.c")]);
    }

    #[test]
    fn changed_file_is_reported_once() {
        let (_fs, mut router) = setup(&["*.c"], &[], true);
        let out = router.route(&dir_event("/w", "file.c", ChangeKind::Changed));
        assert_eq!(out.changes, vec![Change::new("/w/file.c", ChangeKind::Changed)]);
    }

    #[test]
    fn renamed_existing_file_reports_rename_then_change() {
        let (fs, mut router) = setup(&["*.c"], &[], true);
        fs.add_file("/w/new.c", b"");
        let out = router.route(&dir_event("/w", "new.c", ChangeKind::Renamed));
        assert_eq!(
            out.changes,
            vec![
                Change::new("/w/new.c", ChangeKind::Renamed),
                Change::new("/w/new.c", ChangeKind::Changed),
            ]
        );
    }

    #[test]
    fn rename_to_unmatched_name_is_dropped() {
        let (fs, mut router) = setup(&["*.c"], &[], true);
        fs.add_file("/w/new.o", b"");
        let out = router.route(&dir_event("/w", "new.o", ChangeKind::Renamed));
        assert!(out.changes.is_empty());
    }

    #[test]
    fn removed_known_file_reports_rename_and_forgets_it() {
        let (fs, mut router) = setup(&[], &[], true);
        fs.remove("/w/file.c");
        let out = router.route(&dir_event("/w", "file.c", ChangeKind::Renamed));
        assert_eq!(out.changes, vec![Change::new("/w/file.c", ChangeKind::Renamed)]);
        assert_eq!(out.removed, vec![PathBuf::from("/w/file.c")]);
        assert!(!router.known_files().any(|p| p == Path::new("/w/file.c")));
    }

    #[test]
    fn removed_directory_drops_descendants() {
        let (fs, mut router) = setup(&[], &[], true);
        fs.remove("/w/sub");
        let out = router.route(&dir_event("/w", "sub", ChangeKind::Renamed));
        assert_eq!(
            out.removed,
            vec![PathBuf::from("/w/sub"), PathBuf::from("/w/sub/old.c")]
        );
    }

    #[test]
    fn new_directory_is_walked_for_files_and_reported() {
        let (fs, mut router) = setup(&["*.c"], &[], true);
        fs.add_file("/w/fresh/a.c", b"");
        fs.add_file("/w/fresh/nested/b.c", b"");
        fs.add_file("/w/fresh/skip.o", b"");

        let out = router.route(&dir_event("/w", "fresh", ChangeKind::Renamed));
        assert_eq!(
            out.changes,
            vec![
                Change::new("/w/fresh/a.c", ChangeKind::Changed),
                Change::new("/w/fresh/nested/b.c", ChangeKind::Changed),
            ]
        );
        assert_eq!(
            out.new_dirs,
            vec![PathBuf::from("/w/fresh"), PathBuf::from("/w/fresh/nested")]
        );

        // A second look finds nothing new.
        let out = router.route(&dir_event("/w", "fresh", ChangeKind::Changed));
        assert!(out.is_empty());
    }

    #[test]
    fn excluded_directory_is_not_walked() {
        let (fs, mut router) = setup(&[], &["ign"], true);
        fs.add_file("/w/ign/file.c", b"");
        let out = router.route(&dir_event("/w", "ign", ChangeKind::Renamed));
        assert!(out.is_empty());
    }

    #[test]
    fn non_recursive_ignores_nested_paths() {
        let (fs, mut router) = setup(&["*.c"], &[], false);
        fs.add_file("/w/sub/new.c", b"");
        let out = router.route(&dir_event("/w/sub", "new.c", ChangeKind::Renamed));
        assert!(out.is_empty());

        let out = router.route(&dir_event("/w", "file.c", ChangeKind::Changed));
        assert_eq!(out.changes.len(), 1);
    }

    #[test]
    fn paths_outside_roots_are_ignored() {
        let (fs, mut router) = setup(&[], &[], true);
        fs.add_file("/other/file.c", b"");
        let out = router.route(&dir_event("/other", "file.c", ChangeKind::Changed));
        assert!(out.is_empty());
    }

    #[test]
    fn file_root_is_always_accepted() {
        let fs = MockFileSystem::new();
        fs.add_file("/w/file.o", b"");
        let matcher = Arc::new(PathMatcher::new("/w", &pats(&["*.c"]), &[]).unwrap());
        let mut router = ChangeRouter::new(
            Arc::new(fs),
            vec![PathBuf::from("/w/file.o")],
            matcher,
            true,
        );
        let out = router.route(&RawEvent::new("/w/file.o", None, ChangeKind::Changed));
        assert_eq!(out.changes, vec![Change::new("/w/file.o", ChangeKind::Changed)]);
    }

    #[test]
    fn rescan_reports_new_files_and_prunes_missing() {
        let (fs, mut router) = setup(&[], &[], true);
        fs.remove("/w/file.c");
        fs.add_file("/w/later.c", b"");
        let out = router.rescan();
        assert_eq!(out.changes, vec![Change::new("/w/later.c", ChangeKind::Changed)]);
        assert_eq!(out.removed, vec![PathBuf::from("/w/file.c")]);
    }
}
