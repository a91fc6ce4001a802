// tests/tree_enumerator.rs

mod common;
use crate::common::TempTree;

use std::path::PathBuf;
use std::sync::Arc;

use onchange::fs::RealFileSystem;
use onchange::watch::{PathMatcher, WalkOptions, WatchSpec, enumerate, expand_root, matched_files};

fn pats(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn sample() -> TempTree {
    TempTree::new()
        .file("file.c", "")
        .file("file.o", "")
        .file("ign/file.c", "")
        .file("notign/file.c", "")
        .file("notign/deep/x.c", "")
}

#[test]
fn recursive_walk_is_breadth_first_and_sorted() {
    let tree = sample();
    let matcher = PathMatcher::new(tree.root(), &pats(&["*.c"]), &pats(&["ign"])).unwrap();

    let found = enumerate(&RealFileSystem, tree.root(), &matcher, WalkOptions::recursive());

    assert_eq!(
        found.files,
        vec![
            tree.path("file.c"),
            tree.path("notign/file.c"),
            tree.path("notign/deep/x.c"),
        ]
    );
    assert_eq!(found.dirs[0], tree.root().to_path_buf());
    assert!(found.dirs.contains(&tree.path("notign/deep")));
}

#[test]
fn flat_walk_stays_at_the_top() {
    let tree = sample();
    let matcher = PathMatcher::new(tree.root(), &pats(&["*.c"]), &[]).unwrap();

    let found = enumerate(&RealFileSystem, tree.root(), &matcher, WalkOptions::flat());

    assert_eq!(found.files, vec![tree.path("file.c")]);
}

#[test]
fn file_root_is_returned_unfiltered() {
    let tree = sample();
    let matcher = PathMatcher::new(tree.root(), &pats(&["*.h"]), &[]).unwrap();

    let found = enumerate(&RealFileSystem, &tree.path("file.o"), &matcher, WalkOptions::recursive());

    assert_eq!(found.files, vec![tree.path("file.o")]);
    assert!(found.dirs.is_empty());
}

#[test]
fn glob_root_expands_last_component() {
    let tree = TempTree::new()
        .file("a.c", "")
        .file("b.c", "")
        .file("c.h", "")
        .dir("d.c");

    let roots = expand_root(&RealFileSystem, &tree.path("*.c")).unwrap();

    assert_eq!(roots, vec![tree.path("a.c"), tree.path("b.c"), tree.path("d.c")]);
}

#[test]
fn glob_root_rules() {
    let tree = TempTree::new().file("src/a.c", "");

    // Wildcards outside the last component.
    assert!(expand_root(&RealFileSystem, &tree.path("*/a.c")).is_err());
    // Nothing matches.
    assert!(expand_root(&RealFileSystem, &tree.path("*.rs")).is_err());
    // Missing plain root.
    assert!(expand_root(&RealFileSystem, &tree.path("nope")).is_err());
}

#[test]
fn bracketed_parent_directory_is_watched_literally() {
    let tree = TempTree::new().file("build[1]/src/a.c", "").file("build1/src/b.c", "");

    let roots = expand_root(&RealFileSystem, &tree.path("build[1]/src")).unwrap();
    assert_eq!(roots, vec![tree.path("build[1]/src")]);

    let spec = WatchSpec::new(tree.path("build[1]/src"));
    let files = matched_files(&spec, Arc::new(RealFileSystem)).unwrap();
    assert_eq!(files, vec![tree.path("build[1]/src/a.c")]);
}

#[cfg(unix)]
#[test]
fn symlink_cycle_is_walked_once() {
    let tree = TempTree::new().file("a/x.c", "");
    std::os::unix::fs::symlink(tree.root(), tree.path("a/loop")).unwrap();
    let matcher = PathMatcher::new(tree.root(), &[], &[]).unwrap();

    let found = enumerate(&RealFileSystem, tree.root(), &matcher, WalkOptions::recursive());

    assert_eq!(found.files, vec![tree.path("a/x.c")]);
}

#[test]
fn matched_files_lists_the_initial_snapshot() {
    let tree = sample();
    let mut spec = WatchSpec::new(tree.root());
    spec.include = pats(&["*.c"]);
    spec.exclude = pats(&["ign"]);

    let mut files = matched_files(&spec, Arc::new(RealFileSystem)).unwrap();
    files.sort();

    let mut expected: Vec<PathBuf> = vec![
        tree.path("file.c"),
        tree.path("notign/deep/x.c"),
        tree.path("notign/file.c"),
    ];
    expected.sort();
    assert_eq!(files, expected);
}
