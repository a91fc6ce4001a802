// src/exec/command.rs

//! Runs a chain of external commands for each changed path.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::ConfigFile;
use crate::config::validate::SHELL_BUILTINS;
use crate::engine::TaskOutcome;

use super::backend::{ExecFuture, TaskExecutor};

/// Argument replaced with the changed path.
pub const FILE_PLACEHOLDER: &str = "FILE";

/// Executor that runs `commands` in order for every changed path.
///
/// The chain stops at the first command that exits non-zero. That path is
/// retried only when `retry_on_failure` is set. A program that cannot be
/// found is logged and never retried.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    commands: Vec<Vec<String>>,
    cwd: Option<PathBuf>,
    retry_on_failure: bool,
}

impl CommandExecutor {
    pub fn new(commands: Vec<Vec<String>>) -> Self {
        Self {
            commands,
            cwd: None,
            retry_on_failure: false,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(cfg.run.commands.clone())
            .cwd(cfg.run.cwd.clone())
            .retry_on_failure(cfg.run.retry_on_failure)
    }

    pub fn cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn retry_on_failure(mut self, retry: bool) -> Self {
        self.retry_on_failure = retry;
        self
    }

    pub fn commands(&self) -> &[Vec<String>] {
        &self.commands
    }

    /// The command chain for `task`, with every `FILE` argument replaced.
    pub fn render(&self, task: &Path) -> Vec<Vec<String>> {
        let file = task.to_string_lossy();
        self.commands
            .iter()
            .map(|argv| {
                argv.iter()
                    .map(|arg| {
                        if arg == FILE_PLACEHOLDER {
                            file.to_string()
                        } else {
                            arg.clone()
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn build(&self, argv: &[String]) -> Option<Command> {
        let (program, args) = argv.split_first()?;

        let mut cmd = if cfg!(windows) && SHELL_BUILTINS.contains(&program.as_str()) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(program);
            c
        } else {
            Command::new(program)
        };
        cmd.args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        Some(cmd)
    }

    fn failed(&self) -> TaskOutcome {
        if self.retry_on_failure {
            TaskOutcome::Retry
        } else {
            TaskOutcome::Success
        }
    }
}

impl TaskExecutor for CommandExecutor {
    fn execute<'a>(&'a mut self, task: &'a Path) -> ExecFuture<'a> {
        Box::pin(async move {
            for argv in self.render(task) {
                let line = argv.join(" ");
                let Some(mut cmd) = self.build(&argv) else {
                    continue;
                };

                info!(path = ?task, cmd = %line, "running command");
                let status = match cmd.status().await {
                    Ok(status) => status,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        error!(cmd = %line, "command not found");
                        return Ok(TaskOutcome::Success);
                    }
                    Err(err) => {
                        error!(cmd = %line, error = %err, "failed to start command");
                        return Ok(self.failed());
                    }
                };

                if !status.success() {
                    error!(
                        path = ?task,
                        cmd = %line,
                        exit_code = status.code().unwrap_or(-1),
                        retry = self.retry_on_failure,
                        "command failed"
                    );
                    return Ok(self.failed());
                }
                debug!(cmd = %line, "command finished");
            }
            Ok(TaskOutcome::Success)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(cmds: &[&[&str]]) -> Vec<Vec<String>> {
        cmds.iter()
            .map(|c| c.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn render_replaces_only_whole_file_arguments() {
        let exec = CommandExecutor::new(chain(&[&["ninja"], &["cc", "-c", "FILE", "FILE.o"]]));
        let rendered = exec.render(Path::new("/w/a.c"));
        assert_eq!(rendered[0], vec!["ninja"]);
        assert_eq!(rendered[1], vec!["cc", "-c", "/w/a.c", "FILE.o"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_chain_is_success() {
        let mut exec = CommandExecutor::new(chain(&[&["true"], &["true"]]));
        let outcome = exec.execute(Path::new("x")).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_retries_only_when_asked() {
        let mut exec = CommandExecutor::new(chain(&[&["false"]]));
        assert_eq!(exec.execute(Path::new("x")).await.unwrap(), TaskOutcome::Success);

        let mut exec = CommandExecutor::new(chain(&[&["false"]])).retry_on_failure(true);
        assert_eq!(exec.execute(Path::new("x")).await.unwrap(), TaskOutcome::Retry);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn chain_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let mut exec = CommandExecutor::new(vec![
            vec!["false".to_string()],
            vec!["touch".to_string(), marker.to_string_lossy().into_owned()],
        ])
        .retry_on_failure(true);

        assert_eq!(exec.execute(Path::new("x")).await.unwrap(), TaskOutcome::Retry);
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_argument_reaches_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("touched");
        let mut exec = CommandExecutor::new(chain(&[&["touch", "FILE"]]));
        exec.execute(&target).await.unwrap();
        assert!(target.exists());
    }

    #[tokio::test]
    async fn missing_program_is_not_retried() {
        let mut exec =
            CommandExecutor::new(chain(&[&["onchange-test-no-such-program"]])).retry_on_failure(true);
        assert_eq!(exec.execute(Path::new("x")).await.unwrap(), TaskOutcome::Success);
    }
}
