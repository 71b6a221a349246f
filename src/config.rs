use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::plan::Order;

/// Configuration loaded from `backfill.toml`.
///
/// Every key is optional; a missing file means all defaults.
///
/// Example TOML:
/// ```toml
/// counter_file = "number.txt"
/// date_file    = "last_commit_date.txt"
/// message      = "Update number: {date}"
/// order        = "oldest-first"
/// backend      = "git2"
/// push         = true
/// remote       = "origin"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Counter file, relative to the repository directory.
    pub counter_file: String,
    /// Last-commit-date file, relative to the repository directory.
    pub date_file: String,
    /// Commit message template. `{date}` and `{number}` are substituted.
    pub message: String,
    pub order: Order,
    pub backend: Backend,
    pub push: bool,
    /// Remote to push to. Unset means the current branch's upstream.
    pub remote: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            counter_file: "number.txt".to_string(),
            date_file: "last_commit_date.txt".to_string(),
            message: "Update number: {date}".to_string(),
            order: Order::default(),
            backend: Backend::default(),
            push: true,
            remote: None,
        }
    }
}

/// Which git implementation records commits and pushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Shell out to the system `git` binary.
    #[default]
    Cli,
    /// Use libgit2 in-process.
    Git2,
}

/// Load and parse the config file at `path`.
///
/// # Errors
/// - Returns an error if parsing the TOML fails.
/// - Returns an error if the file is missing and `required` is set
///   (i.e. the user named it explicitly); otherwise defaults are used.
pub fn load_config(path: &Path, required: bool) -> Result<Config> {
    let txt = match fs::read_to_string(path) {
        Ok(txt) => txt,
        Err(e) if e.kind() == ErrorKind::NotFound && !required => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("config not found: {}", path.display()));
        }
    };
    let cfg: Config = toml::from_str(&txt)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cfg)
}
