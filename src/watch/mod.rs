// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `include` / `exclude` glob patterns ([`patterns`]).
//! - Enumerating the initial tree under a watch root ([`walk`]).
//! - Installing native watch primitives through a pluggable backend, with
//!   recursion emulated where the backend cannot recurse itself
//!   ([`backend`], [`handle`]).
//! - Resolving raw notifications into matched file changes ([`router`]).
//!
//! It does **not** know about debouncing or execution; [`Watch`] only yields
//! changed paths to whoever drives it.

pub mod backend;
pub mod handle;
pub mod path_utils;
pub mod patterns;
pub mod router;
pub mod walk;
pub mod watcher;

pub use backend::{
    BackendCapabilities, BackendEvent, EventReceiver, EventSender, RawEvent, WatchBackend,
    WatchTarget, create_backend,
};
pub use handle::WatchHandle;
pub use patterns::PathMatcher;
pub use router::{Change, ChangeRouter, Routed};
pub use walk::{Enumeration, WalkOptions, enumerate, expand_root};
pub use watcher::{Watch, WatchSpec, matched_files};
