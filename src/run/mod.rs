mod progress;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use indicatif::ProgressBar;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::git::{self, Vcs};
use crate::paths::{GlobalOpts, Paths, resolve};
use crate::plan::{commit_timestamp, missing_days};
use crate::store::{
    DATE_FORMAT, increment, read_last_commit_date, read_number, write_last_commit_date,
    write_number,
};

use progress::{commit_bar, err_style, ok_style, spinner_style};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Print the commits that would be made and change nothing.
    pub dry_run: bool,
    /// Skip the final push even if the config enables it.
    pub no_push: bool,
}

/// One backfilled day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub day: NaiveDate,
    pub number: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub commits: Vec<CommitRecord>,
    pub pushed: bool,
    pub dry_run: bool,
}

/// Substitute `{date}` (`YYYY-MM-DD`) and `{number}` in a message template.
pub fn render_message(template: &str, day: NaiveDate, number: i64) -> String {
    template
        .replace("{date}", &day.format(DATE_FORMAT).to_string())
        .replace("{number}", &number.to_string())
}

/// The commits a run would make today, in commit order, without touching
/// anything.
pub fn plan(p: &Paths, cfg: &Config, today: NaiveDate) -> Result<Vec<CommitRecord>> {
    let last = read_last_commit_date(&p.last_date)?;
    let mut number = read_number(&p.counter)?;
    missing_days(last, today, cfg.order)
        .into_iter()
        .map(|day| {
            number = number
                .checked_add(1)
                .ok_or_else(|| anyhow!("counter overflow in {}", p.counter.display()))?;
            Ok(CommitRecord {
                day,
                number,
                message: render_message(&cfg.message, day, number),
            })
        })
        .collect()
}

/// CLI command: backfill one commit per missing day, then push.
///
/// # Errors
/// Returns the first failure; commits made before it stay in place and the
/// last-commit-date file reflects the newest day actually committed.
pub fn cmd_run(global: &GlobalOpts, opts: &RunOptions) -> Result<RunSummary> {
    let (p, cfg) = resolve(global)?;
    let now = Local::now().fixed_offset();

    if opts.dry_run {
        return Ok(RunSummary {
            commits: plan(&p, &cfg, now.date_naive())?,
            pushed: false,
            dry_run: true,
        });
    }

    let vcs = git::open(cfg.backend, &p.repo, cfg.remote.clone())?;
    backfill(&p, &cfg, vcs.as_ref(), &now, cfg.push && !opts.no_push)
}

/// Commit every missing day up to `now`'s date through `vcs`.
///
/// For each day: increment and persist the counter, stage it, commit with
/// the backdated time, then record the newest committed day in the date file.
pub fn backfill(
    p: &Paths,
    cfg: &Config,
    vcs: &dyn Vcs,
    now: &DateTime<FixedOffset>,
    push: bool,
) -> Result<RunSummary> {
    let today = now.date_naive();
    let mut recorded = read_last_commit_date(&p.last_date)?;
    let days = missing_days(recorded, today, cfg.order);
    if days.is_empty() {
        info!(last = %recorded, %today, "no missing days");
    }

    let stage_path = p.repo_relative(&p.counter);
    let pb = commit_bar(days.len() as u64);
    let mut commits = Vec::with_capacity(days.len());

    let res: Result<()> = (|| {
        for day in days {
            let number = increment(&p.counter)?;
            let message = render_message(&cfg.message, day, number);
            pb.set_message(message.clone());

            // An uncommitted increment must not survive into the next run.
            if let Err(e) = commit_day(vcs, stage_path, &message, day, now) {
                write_number(&p.counter, number - 1)
                    .with_context(|| format!("failed to restore counter after: {:#}", e))?;
                return Err(e);
            }

            recorded = recorded.max(day);
            write_last_commit_date(&p.last_date, recorded)?;
            info!(%day, number, "committed");
            pb.inc(1);
            commits.push(CommitRecord {
                day,
                number,
                message,
            });
        }
        Ok(())
    })();

    match res {
        Ok(()) => pb.finish_and_clear(),
        Err(e) => {
            pb.set_style(err_style());
            pb.abandon_with_message(format!("backfill stopped (error: {})", e));
            return Err(e);
        }
    }

    if push {
        push_with_progress(vcs)?;
    }

    Ok(RunSummary {
        commits,
        pushed: push,
        dry_run: false,
    })
}

fn commit_day(
    vcs: &dyn Vcs,
    path: &Path,
    message: &str,
    day: NaiveDate,
    now: &DateTime<FixedOffset>,
) -> Result<()> {
    let when =
        commit_timestamp(day, now).ok_or_else(|| anyhow!("no valid commit time on {}", day))?;
    vcs.stage(path)?;
    vcs.commit(message, &when)
        .with_context(|| format!("failed to commit {}", day))
}

fn push_with_progress(vcs: &dyn Vcs) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message("pushing…");
    pb.enable_steady_tick(Duration::from_millis(80));

    match vcs.push() {
        Ok(()) => {
            pb.set_style(ok_style());
            pb.finish_with_message("pushed");
            info!("push succeeded");
            Ok(())
        }
        Err(e) => {
            pb.set_style(err_style());
            pb.finish_with_message(format!("push failed (error: {})", e));
            Err(e.context("failed to push"))
        }
    }
}
