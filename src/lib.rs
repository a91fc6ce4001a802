// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_from_path};
use crate::config::{ConfigFile, LoopConfig, RawConfigFile};
use crate::engine::OnFileChanged;
use crate::exec::{CommandExecutor, SkipUnchanged, TaskExecutor};
use crate::fs::RealFileSystem;

/// Run the CLI to completion on the runtime `loop_config` asks for.
///
/// With `async_mode` the session is spawned as one task on a multi-threaded
/// runtime; otherwise it owns a current-thread loop.
pub fn run_blocking(args: CliArgs, loop_config: LoopConfig) -> Result<()> {
    let rt = build_runtime(&loop_config)?;
    if loop_config.async_mode {
        rt.block_on(async move { tokio::spawn(run(args, loop_config)).await? })
    } else {
        rt.block_on(run(args, loop_config))
    }
}

/// Multi-threaded runtime in async mode, current-thread otherwise.
pub fn build_runtime(loop_config: &LoopConfig) -> io::Result<tokio::runtime::Runtime> {
    let mut builder = if loop_config.async_mode {
        tokio::runtime::Builder::new_multi_thread()
    } else {
        tokio::runtime::Builder::new_current_thread()
    };
    builder.enable_all().build()
}

/// High-level entry point used by [`run_blocking`].
///
/// This wires together:
/// - config loading (file + flags)
/// - watch registration on the backend chosen by `loop_config`
/// - the command executor (optionally skipping unchanged content)
/// - Ctrl-C handling
pub async fn run(args: CliArgs, loop_config: LoopConfig) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        write_dry_run(&cfg, &mut io::stdout().lock())?;
        return Ok(());
    }

    let executor = build_executor(&cfg);
    let session = OnFileChanged::from_config(&cfg)
        .register(&loop_config, executor)
        .context("starting watch")?;

    // Ctrl-C → graceful shutdown.
    {
        let stop = session.stop_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupted; stopping");
            stop.stop();
        });
    }

    session.run().await?;
    Ok(())
}

/// Read the config file (explicit `--config`, or `Onchange.toml` when no
/// `SRC` is given), merge the flags over it and validate.
pub fn resolve_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = match &args.config {
        Some(path) => {
            load_from_path(path).with_context(|| format!("loading config {:?}", path))?
        }
        None if args.src.is_none() && default_config_path().is_file() => {
            let path = default_config_path();
            debug!(?path, "using config file from working directory");
            load_from_path(&path).with_context(|| format!("loading config {:?}", path))?
        }
        None => RawConfigFile::default(),
    };

    args.apply_to(&mut raw);
    Ok(ConfigFile::try_from(raw)?)
}

/// The command chain, wrapped in [`SkipUnchanged`] when `skip_unchanged` is
/// set.
pub fn build_executor(cfg: &ConfigFile) -> Box<dyn TaskExecutor> {
    let commands = CommandExecutor::from_config(cfg);
    if cfg.run.skip_unchanged {
        Box::new(SkipUnchanged::new(commands, Arc::new(RealFileSystem)))
    } else {
        Box::new(commands)
    }
}

/// Dry-run output: the resolved configuration, the command chain and the
/// files the watch would start with.
pub fn write_dry_run(cfg: &ConfigFile, out: &mut dyn Write) -> Result<()> {
    let spec = cfg.watch_spec();

    writeln!(out, "onchange dry-run")?;
    writeln!(out, "  watch.path = {}", spec.path.display())?;
    if !spec.include.is_empty() {
        writeln!(out, "  watch.include = {:?}", spec.include)?;
    }
    if !spec.exclude.is_empty() {
        writeln!(out, "  watch.exclude = {:?}", spec.exclude)?;
    }
    writeln!(out, "  watch.recursive = {}", spec.recursive)?;
    writeln!(out, "  watch.timeout = {:?}", cfg.timeout())?;
    writeln!(out, "  watch.retry_interval = {:?}", cfg.retry_interval())?;
    if let Some(t) = cfg.terminate_after() {
        writeln!(out, "  watch.terminate_after = {:?}", t)?;
    }
    if let Some(cwd) = &cfg.run.cwd {
        writeln!(out, "  run.cwd = {}", cwd.display())?;
    }
    writeln!(out, "  run.retry_on_failure = {}", cfg.run.retry_on_failure)?;
    writeln!(out, "  run.skip_unchanged = {}", cfg.run.skip_unchanged)?;
    writeln!(out)?;

    writeln!(out, "commands ({}):", cfg.run.commands.len())?;
    for argv in &cfg.run.commands {
        writeln!(out, "  - {}", argv.join(" "))?;
    }
    writeln!(out)?;

    let files = watch::matched_files(&spec, Arc::new(RealFileSystem))?;
    writeln!(out, "matched files ({}):", files.len())?;
    for file in files {
        writeln!(out, "  - {}", file.display())?;
    }

    debug!("dry-run complete (no watching)");
    Ok(())
}
