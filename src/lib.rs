//! Crate entry point for **backfill**.
//!
//! Keeps a counter file inside a git working tree and commits one increment
//! per calendar day missed since the last recorded commit, then pushes.
//! Each submodule owns one responsibility (state files, day planning, git
//! backends, the run itself); the `pub use` re-exports expose the commands.

mod config;
mod git;
mod init;
mod paths;
mod plan;
mod run;
mod status;
mod store;

pub use config::{Backend, Config, load_config};
pub use git::{
    CliVcs, CommandExecutor, CommandResult, Git2Vcs, GitError, ProcessCommandExecutor, Vcs,
};
pub use init::{InitOptions, cmd_init};
pub use paths::{CONFIG_FILE, GlobalOpts, Paths, resolve};
pub use plan::{Order, commit_timestamp, git_date, missing_days};
pub use run::{CommitRecord, RunOptions, RunSummary, backfill, cmd_run, plan, render_message};
pub use status::cmd_status;
pub use store::{read_last_commit_date, read_number, write_last_commit_date, write_number};
