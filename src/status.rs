use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::path::PathBuf;

use crate::paths::{GlobalOpts, resolve};
use crate::plan::missing_days;
use crate::store::{DATE_FORMAT, read_last_commit_date, read_number};

/// Snapshot of the repository's backfill state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub repo: PathBuf,
    pub number: i64,
    pub last: NaiveDate,
    pub today: NaiveDate,
    pub missing: usize,
}

impl Status {
    pub fn render(&self) -> String {
        format!(
            "repo:        {}\ncounter:     {}\nlast commit: {}\ntoday:       {}\nmissing:     {} day(s)",
            self.repo.display(),
            self.number,
            self.last.format(DATE_FORMAT),
            self.today.format(DATE_FORMAT),
            self.missing,
        )
    }
}

pub fn status(global: &GlobalOpts, today: NaiveDate) -> Result<Status> {
    let (p, cfg) = resolve(global)?;
    let last = read_last_commit_date(&p.last_date)?;
    Ok(Status {
        repo: p.repo,
        number: read_number(&p.counter)?,
        last,
        today,
        missing: missing_days(last, today, cfg.order).len(),
    })
}

/// CLI command: print the counter, the last recorded date and how many days
/// a run would backfill. Read-only.
pub fn cmd_status(global: &GlobalOpts) -> Result<()> {
    let st = status(global, Local::now().date_naive())?;
    println!("{}", st.render());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn status_counts_missing_days() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("number.txt"), "12\n").unwrap();
        fs::write(td.path().join("last_commit_date.txt"), "2024-02-27").unwrap();
        let global = GlobalOpts {
            dir: Some(td.path().to_path_buf()),
            config: None,
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let st = status(&global, today).unwrap();

        assert_eq!(st.repo, td.path());
        assert!(
            st.render()
                .starts_with(&format!("repo:        {}\n", td.path().display()))
        );
        assert_eq!(st.number, 12);
        assert_eq!(st.missing, 3);
        assert!(st.render().contains("last commit: 2024-02-27"));
        assert!(st.render().contains("missing:     3 day(s)"));
    }

    #[test]
    fn status_fails_without_state_files() {
        let td = tempdir().unwrap();
        let global = GlobalOpts {
            dir: Some(td.path().to_path_buf()),
            config: None,
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(status(&global, today).is_err());
    }
}
