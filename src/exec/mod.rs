// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `TaskExecutor` trait the debounce scheduler
//!   calls for every released path, and `FnExecutor` for plain closures.
//! - [`command`] runs a chain of external commands per path using
//!   `tokio::process::Command`.
//! - [`hash`] contains the `SkipUnchanged` decorator that skips paths whose
//!   content did not change since their last successful run.

pub mod backend;
pub mod command;
pub mod hash;

pub use backend::{ExecFuture, FnExecutor, TaskExecutor};
pub use command::CommandExecutor;
pub use hash::{HashStore, MemoryHashStore, SkipUnchanged};
