//! Git integration layer.
//!
//! Callers only see the [`Vcs`] trait; [`open`] picks the backend named in
//! the config. The CLI backend shells out to `git`, the git2 backend does the
//! same work in-process through libgit2.

mod cli_backend;
mod git2_backend;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

use crate::config::Backend;

pub use cli_backend::{CliVcs, CommandExecutor, CommandResult, GitError, ProcessCommandExecutor};
pub use git2_backend::Git2Vcs;

/// The three operations a backfill run needs from version control.
pub trait Vcs {
    /// Stage `path`, given relative to the directory the backend was opened on.
    fn stage(&self, path: &Path) -> Result<()>;
    /// Commit the index with author and committer dates set to `when`.
    fn commit(&self, message: &str, when: &DateTime<FixedOffset>) -> Result<()>;
    /// Push the current branch.
    fn push(&self) -> Result<()>;
}

/// Open the backend selected by `backend` for the repository at `repo`.
pub fn open(backend: Backend, repo: &Path, remote: Option<String>) -> Result<Box<dyn Vcs>> {
    Ok(match backend {
        Backend::Cli => Box::new(CliVcs::new(repo, remote)),
        Backend::Git2 => Box::new(Git2Vcs::open(repo, remote)?),
    })
}
