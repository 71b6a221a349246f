use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::info;

use crate::paths::{GlobalOpts, resolve};
use crate::store::{write_last_commit_date, write_number};

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Initial counter value.
    pub start: i64,
    /// Initial last-commit date; today when unset.
    pub date: Option<NaiveDate>,
    /// Overwrite existing state files.
    pub force: bool,
}

/// What [`init`] did to each state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOutcome {
    pub counter_written: bool,
    pub date_written: bool,
}

pub fn init(global: &GlobalOpts, opts: &InitOptions, today: NaiveDate) -> Result<InitOutcome> {
    let (p, _) = resolve(global)?;

    let counter_written = opts.force || !p.counter.exists();
    if counter_written {
        write_number(&p.counter, opts.start)?;
        info!(path = %p.counter.display(), start = opts.start, "wrote counter file");
    }

    let date_written = opts.force || !p.last_date.exists();
    if date_written {
        let date = opts.date.unwrap_or(today);
        write_last_commit_date(&p.last_date, date)?;
        info!(path = %p.last_date.display(), %date, "wrote date file");
    }

    Ok(InitOutcome {
        counter_written,
        date_written,
    })
}

/// CLI command: create the counter and date files if they are missing.
///
/// Existing files are kept unless `--force` is given.
pub fn cmd_init(global: &GlobalOpts, opts: &InitOptions) -> Result<()> {
    let out = init(global, opts, Local::now().date_naive())?;
    match (out.counter_written, out.date_written) {
        (false, false) => println!("already initialized (use --force to overwrite)"),
        (c, d) => {
            if c {
                println!("wrote counter file");
            }
            if d {
                println!("wrote date file");
            }
        }
    }
    Ok(())
}
