// tests/config_file.rs

mod common;
use crate::common::{ConfigFileBuilder, TempTree};

use std::time::Duration;

use clap::Parser;

use onchange::cli::CliArgs;
use onchange::config::{ConfigFile, load_and_validate, load_from_path};
use onchange::engine::OnFileChanged;
use onchange::resolve_config;

fn args(list: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(std::iter::once("onchange").chain(list.iter().copied())).unwrap()
}

#[test]
fn flags_override_the_config_file() {
    let tree = TempTree::new().dir("src");
    let cfg_path = tree.write(
        "Onchange.toml",
        &format!(
            "[watch]\npath = {:?}\ninclude = [\"*.c\"]\ntimeout = 2.0\n\n[run]\ncommands = [[\"echo\", \"FILE\"]]\n",
            tree.path("src")
        ),
    );
    let cfg_arg = cfg_path.to_string_lossy().into_owned();

    let cfg = resolve_config(&args(&["--config", &cfg_arg, "-t", "0.25", "-e", "build"])).unwrap();

    assert_eq!(cfg.watch.include, vec!["*.c"]);
    assert_eq!(cfg.watch.exclude, vec!["build"]);
    assert_eq!(cfg.timeout(), Duration::from_millis(250));
    assert_eq!(cfg.run.commands, vec![vec!["echo".to_string(), "FILE".to_string()]]);
}

#[test]
fn command_line_alone_is_enough() {
    let tree = TempTree::new();
    let src = tree.root().to_string_lossy().into_owned();

    let cfg = resolve_config(&args(&[&src, "--terminate-after", "3", "--", "echo", "&&", "echo", "FILE"]))
        .unwrap();

    assert_eq!(cfg.terminate_after(), Some(Duration::from_secs(3)));
    assert_eq!(cfg.run.commands.len(), 2);
}

#[test]
fn missing_command_is_rejected() {
    let tree = TempTree::new();
    let src = tree.root().to_string_lossy().into_owned();
    assert!(resolve_config(&args(&[&src])).is_err());
}

#[test]
fn unknown_keys_are_rejected() {
    let tree = TempTree::new();
    let path = tree.write("bad.toml", "[watch]\npath = \".\"\ncolour = \"blue\"\n");
    assert!(load_from_path(&path).is_err());
}

#[test]
fn invalid_durations_fail_validation() {
    let tree = TempTree::new();
    let path = tree.write(
        "zero.toml",
        "[watch]\npath = \".\"\ntimeout = 0.0\n[run]\ncommands = [[\"echo\"]]\n",
    );
    assert!(load_and_validate(&path).is_err());
}

#[test]
fn builder_settings_follow_the_config() {
    let tree = TempTree::new();
    let cfg: ConfigFile = ConfigFileBuilder::new(tree.root())
        .include("*.c")
        .exclude("build")
        .command(&["echo", "FILE"])
        .timeout(0.1)
        .terminate_after(5.0)
        .build();

    let builder = OnFileChanged::from_config(&cfg);

    assert_eq!(builder.spec().path, tree.root());
    assert_eq!(builder.spec().include, vec!["*.c"]);
    assert_eq!(builder.spec().exclude, vec!["build"]);
    assert_eq!(builder.options().timeout, Duration::from_millis(100));
    assert_eq!(builder.options().terminate_after, Some(Duration::from_secs(5)));
}
