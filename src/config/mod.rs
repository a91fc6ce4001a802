// src/config/mod.rs

//! Configuration loading and validation for onchange.
//!
//! Responsibilities:
//! - Read loop options from the environment (`env.rs`).
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate durations, patterns and commands (`validate.rs`).

pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::LoopConfig;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile, RunSection, WatchSection};
pub use validate::validate_config;
