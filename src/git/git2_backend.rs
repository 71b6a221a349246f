use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset};
use git2::{
    Commit, Cred, CredentialType, ErrorCode, PushOptions, RemoteCallbacks, Repository, Signature,
    Time,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Vcs;

/// Build a `PushOptions` with credential callbacks enabled.
///
/// HTTPS remotes go through the configured git credential helper; everything
/// else tries the user's SSH agent and falls back to default credentials.
/// A ref the remote refuses to update is turned into an error.
fn push_opts_with_creds() -> PushOptions<'static> {
    let mut cb = RemoteCallbacks::new();
    cb.credentials(|url, username_from_url, allowed| {
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
            && let Ok(cfg) = git2::Config::open_default()
            && let Ok(cred) = Cred::credential_helper(&cfg, url, username_from_url)
        {
            return Ok(cred);
        }
        Cred::ssh_key_from_agent(username_from_url.unwrap_or("git")).or_else(|_| Cred::default())
    });
    cb.push_update_reference(|refname, status| match status {
        Some(msg) => Err(git2::Error::from_str(&format!(
            "remote rejected {}: {}",
            refname, msg
        ))),
        None => Ok(()),
    });

    let mut po = PushOptions::new();
    po.remote_callbacks(cb);
    po
}

/// [`Vcs`] implementation on top of libgit2.
pub struct Git2Vcs {
    repo: Repository,
    /// Directory the backend was opened on; staged paths are relative to it.
    base: PathBuf,
    remote: Option<String>,
}

impl Git2Vcs {
    /// Open the repository containing `path`, searching parent directories
    /// like `git` does.
    ///
    /// # Errors
    /// Returns an error if `path` is not inside a git working tree.
    pub fn open(path: &Path, remote: Option<String>) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("not a git repository: {}", path.display()))?;
        Ok(Self {
            repo,
            base: path.to_path_buf(),
            remote,
        })
    }

    /// Resolve `path` (relative to the opened directory) to the form the
    /// index expects: relative to the working tree root.
    fn workdir_relative(&self, path: &Path) -> Result<PathBuf> {
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| anyhow!("bare repository has no working tree"))?;
        let root = fs::canonicalize(workdir)
            .with_context(|| format!("cannot resolve {}", workdir.display()))?;
        let abs = fs::canonicalize(self.base.join(path))
            .with_context(|| format!("cannot resolve {}", path.display()))?;
        abs.strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| {
                anyhow!(
                    "{} is outside the working tree {}",
                    abs.display(),
                    root.display()
                )
            })
    }

    /// Author identity from the repository's `user.name` / `user.email`,
    /// stamped at `when`.
    fn signature(&self, when: &DateTime<FixedOffset>) -> Result<Signature<'static>> {
        let cfg = self.repo.config()?;
        let name = cfg
            .get_string("user.name")
            .context("git config user.name is not set")?;
        let email = cfg
            .get_string("user.email")
            .context("git config user.email is not set")?;
        let time = Time::new(when.timestamp(), when.offset().local_minus_utc() / 60);
        Ok(Signature::new(&name, &email, &time)?)
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remote for the current branch: the configured one, then the branch's
    /// upstream remote, then `origin`.
    fn remote_name(&self, head_ref: &str) -> String {
        if let Some(r) = &self.remote {
            return r.clone();
        }
        self.repo
            .branch_upstream_remote(head_ref)
            .ok()
            .and_then(|buf| buf.as_str().map(str::to_string))
            .unwrap_or_else(|| "origin".to_string())
    }
}

impl Vcs for Git2Vcs {
    fn stage(&self, path: &Path) -> Result<()> {
        let rel = self.workdir_relative(path)?;
        let mut index = self.repo.index()?;
        index
            .add_path(&rel)
            .with_context(|| format!("git add {}", rel.display()))?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str, when: &DateTime<FixedOffset>) -> Result<()> {
        let sig = self.signature(when)?;
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = self.head_commit()?;
        let parents: Vec<&Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .context("git commit")?;
        debug!(%oid, "created commit");
        Ok(())
    }

    fn push(&self) -> Result<()> {
        let head = self.repo.head().context("HEAD does not point to a branch")?;
        let head_ref = head
            .name()
            .ok_or_else(|| anyhow!("invalid reference name"))?
            .to_string();
        if !head.is_branch() {
            return Err(anyhow!("cannot push a detached HEAD"));
        }

        let name = self.remote_name(&head_ref);
        let mut remote = self
            .repo
            .find_remote(&name)
            .with_context(|| format!("remote not found: {}", name))?;
        let mut po = push_opts_with_creds();
        remote
            .push(&[format!("{0}:{0}", head_ref)], Some(&mut po))
            .with_context(|| format!("git push {} {}", name, head_ref))?;
        Ok(())
    }
}
