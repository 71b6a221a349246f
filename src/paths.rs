use anyhow::{Context, Result};
use std::{env, path::Path, path::PathBuf};

use crate::config::{Config, load_config};

/// Default config file name, looked up in the repository directory.
pub const CONFIG_FILE: &str = "backfill.toml";

/// Location overrides shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Repository directory; the current directory when unset.
    pub dir: Option<PathBuf>,
    /// Explicit config file; `<dir>/backfill.toml` when unset.
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub repo: PathBuf,
    pub config: PathBuf,
    pub counter: PathBuf,
    pub last_date: PathBuf,
}

impl Paths {
    /// Path of `file` relative to the repository root, as git expects it.
    pub fn repo_relative<'a>(&self, file: &'a Path) -> &'a Path {
        file.strip_prefix(&self.repo).unwrap_or(file)
    }
}

pub fn repo_dir(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(d) => Ok(d.to_path_buf()),
        None => env::current_dir().context("cannot determine current directory"),
    }
}

/// Build the file layout for `repo` from a loaded config.
///
/// Relative file names in the config are resolved against `repo`.
pub fn paths(repo: &Path, config: PathBuf, cfg: &Config) -> Paths {
    Paths {
        repo: repo.to_path_buf(),
        config,
        counter: repo.join(&cfg.counter_file),
        last_date: repo.join(&cfg.date_file),
    }
}

/// Resolve the repository directory, load the config and build [`Paths`].
pub fn resolve(opts: &GlobalOpts) -> Result<(Paths, Config)> {
    let repo = repo_dir(opts.dir.as_deref())?;
    let config = opts
        .config
        .clone()
        .unwrap_or_else(|| repo.join(CONFIG_FILE));
    let cfg = load_config(&config, opts.config.is_some())?;
    Ok((paths(&repo, config, &cfg), cfg))
}
