// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::RawConfigFile;

/// Command-line arguments for `onchange`.
///
/// ```text
/// onchange src -i '*.c' '*.h' -e build -- ninja && ctest FILE
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "onchange",
    version,
    about = "Run commands when files change.",
    long_about = None
)]
pub struct CliArgs {
    /// File, directory, or glob in the last component, to watch.
    #[arg(value_name = "SRC")]
    pub src: Option<PathBuf>,

    /// Only react to paths matching one of these patterns.
    #[arg(short, long, value_name = "GLOB", num_args = 1.., action = ArgAction::Append)]
    pub include: Vec<String>,

    /// Ignore paths matching any of these patterns.
    #[arg(short, long, value_name = "GLOB", num_args = 1.., action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Working directory for the commands.
    #[arg(short = 'c', long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Watch only the top level of SRC.
    #[arg(long)]
    pub no_recursive: bool,

    /// Debounce window in seconds.
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Stop watching after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub terminate_after: Option<f64>,

    /// Retry a path whose commands exited non-zero.
    #[arg(long)]
    pub retry_on_failure: bool,

    /// Skip paths whose content did not change since their last successful run.
    #[arg(long)]
    pub skip_unchanged: bool,

    /// Path to a config file (TOML). Flags override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ONCHANGE_DEBUG` / `ONCHANGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate, print the configuration and the matched files, but don't watch.
    #[arg(long)]
    pub dry_run: bool,

    /// Commands to run, separated by `&&`. `FILE` is replaced with the changed path.
    #[arg(last = true, value_name = "CMD")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// The trailing command split on `&&`.
    pub fn command_chain(&self) -> Vec<Vec<String>> {
        split_chain(&self.command)
    }

    /// Merge flags into a (possibly empty) config file. Flags that were given
    /// replace the file's values.
    pub fn apply_to(&self, raw: &mut RawConfigFile) {
        if let Some(src) = &self.src {
            raw.watch.path = Some(src.clone());
        }
        if !self.include.is_empty() {
            raw.watch.include = self.include.clone();
        }
        if !self.exclude.is_empty() {
            raw.watch.exclude = self.exclude.clone();
        }
        if self.no_recursive {
            raw.watch.recursive = false;
        }
        if let Some(t) = self.timeout {
            raw.watch.timeout = t;
        }
        if let Some(t) = self.terminate_after {
            raw.watch.terminate_after = Some(t);
        }
        if let Some(cwd) = &self.cwd {
            raw.run.cwd = Some(cwd.clone());
        }
        if self.retry_on_failure {
            raw.run.retry_on_failure = true;
        }
        if self.skip_unchanged {
            raw.run.skip_unchanged = true;
        }
        let chain = self.command_chain();
        if !chain.is_empty() {
            raw.run.commands = chain;
        }
    }
}

/// Split `a b && c d` into `[[a, b], [c, d]]`, dropping empty commands.
pub fn split_chain(words: &[String]) -> Vec<Vec<String>> {
    words
        .split(|w| w == "&&")
        .filter(|c| !c.is_empty())
        .map(<[String]>::to_vec)
        .collect()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("onchange").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_original_style_invocation() {
        let args = parse_from(&[
            "src", "-i", "*.c", "*.h", "-e", "build", "-c", "out", "--", "ninja", "&&", "ctest",
            "FILE",
        ]);
        assert_eq!(args.src, Some(PathBuf::from("src")));
        assert_eq!(args.include, vec!["*.c", "*.h"]);
        assert_eq!(args.exclude, vec!["build"]);
        assert_eq!(args.cwd, Some(PathBuf::from("out")));
        assert_eq!(
            args.command_chain(),
            vec![vec!["ninja".to_string()], vec!["ctest".to_string(), "FILE".to_string()]]
        );
    }

    #[test]
    fn split_chain_drops_empty_segments() {
        let words: Vec<String> = ["&&", "a", "&&", "&&", "b", "x", "&&"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            split_chain(&words),
            vec![vec!["a".to_string()], vec!["b".to_string(), "x".to_string()]]
        );
    }

    #[test]
    fn flags_override_config_file() {
        let mut raw: RawConfigFile = toml::from_str(
            "[watch]\npath = \"a\"\ninclude = [\"*.py\"]\ntimeout = 2.0\n[run]\ncommands = [[\"make\"]]\n",
        )
        .unwrap();

        let args = parse_from(&["b", "-t", "0.1", "--no-recursive", "--retry-on-failure"]);
        args.apply_to(&mut raw);

        assert_eq!(raw.watch.path, Some(PathBuf::from("b")));
        assert_eq!(raw.watch.include, vec!["*.py"]);
        assert_eq!(raw.watch.timeout, 0.1);
        assert!(!raw.watch.recursive);
        assert!(raw.run.retry_on_failure);
        assert_eq!(raw.run.commands, vec![vec!["make".to_string()]]);
    }
}
