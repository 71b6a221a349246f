use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

use super::Vcs;
use crate::plan::git_date;

/// Failure of a `git` invocation.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed with code {code:?}: {}", .stderr.trim())]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Process-spawning seam, so the git calls can be observed in tests.
pub trait CommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
    ) -> std::io::Result<CommandResult>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        cwd: &Path,
    ) -> std::io::Result<CommandResult> {
        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k, v)))
            .env("GIT_TERMINAL_PROMPT", "0")
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// [`Vcs`] implementation that shells out to the system `git` binary.
#[derive(Debug, Clone)]
pub struct CliVcs<E = ProcessCommandExecutor> {
    repo: PathBuf,
    remote: Option<String>,
    executor: E,
}

impl CliVcs<ProcessCommandExecutor> {
    pub fn new(repo: impl Into<PathBuf>, remote: Option<String>) -> Self {
        Self::with_executor(repo, remote, ProcessCommandExecutor)
    }
}

impl<E: CommandExecutor> CliVcs<E> {
    pub fn with_executor(repo: impl Into<PathBuf>, remote: Option<String>, executor: E) -> Self {
        Self {
            repo: repo.into(),
            remote,
            executor,
        }
    }

    fn run(&self, args: Vec<String>, envs: &[(String, String)]) -> Result<String, GitError> {
        let command = format!("git {}", args.join(" "));
        debug!(%command, "spawning git");
        let result = self
            .executor
            .execute("git", &args, envs, &self.repo)
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        if result.success {
            return Ok(result.stdout);
        }

        let stderr = if result.stderr.trim().is_empty() {
            result.stdout
        } else {
            result.stderr
        };
        Err(GitError::Failed {
            command,
            code: result.code,
            stderr,
        })
    }
}

impl<E: CommandExecutor> Vcs for CliVcs<E> {
    fn stage(&self, path: &Path) -> Result<()> {
        self.run(
            vec!["add".to_string(), path.to_string_lossy().into_owned()],
            &[],
        )?;
        Ok(())
    }

    fn commit(&self, message: &str, when: &DateTime<FixedOffset>) -> Result<()> {
        let date = git_date(when);
        let envs = [
            ("GIT_AUTHOR_DATE".to_string(), date.clone()),
            ("GIT_COMMITTER_DATE".to_string(), date),
        ];
        self.run(
            vec!["commit".to_string(), "-m".to_string(), message.to_string()],
            &envs,
        )?;
        Ok(())
    }

    fn push(&self) -> Result<()> {
        let mut args = vec!["push".to_string()];
        if let Some(remote) = &self.remote {
            args.push(remote.clone());
            args.push("HEAD".to_string());
        }
        self.run(args, &[])?;
        Ok(())
    }
}
