use backfill::{GlobalOpts, RunOptions, cmd_run, read_last_commit_date, read_number};
use chrono::{Days, Local, NaiveDate, TimeZone};
use git2::{Repository, Signature, Sort};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Working repo with the two state files committed, plus a bare `origin`.
fn setup(base: &Path, number: i64, last: NaiveDate, config: &str) -> Repository {
    setup_in(base, "", number, last, config)
}

/// Like [`setup`], with the state files and config under `work/<sub>`.
fn setup_in(base: &Path, sub: &str, number: i64, last: NaiveDate, config: &str) -> Repository {
    let remote_dir = base.join("remote.git");
    let work_dir = base.join("work");
    Repository::init_bare(&remote_dir).unwrap();
    let repo = Repository::init(&work_dir).unwrap();

    {
        let mut cfg = repo.config().unwrap();
        cfg.set_str("user.name", "Backfill Test").unwrap();
        cfg.set_str("user.email", "backfill@example.com").unwrap();
        cfg.set_bool("commit.gpgsign", false).unwrap();
    }
    repo.remote("origin", remote_dir.to_str().unwrap()).unwrap();

    let state_dir = work_dir.join(sub);
    fs::create_dir_all(&state_dir).unwrap();
    fs::write(state_dir.join("number.txt"), number.to_string()).unwrap();
    fs::write(
        state_dir.join("last_commit_date.txt"),
        last.format("%Y-%m-%d").to_string(),
    )
    .unwrap();
    fs::write(state_dir.join("backfill.toml"), config).unwrap();

    {
        let mut index = repo.index().unwrap();
        index.add_path(&Path::new(sub).join("number.txt")).unwrap();
        index
            .add_path(&Path::new(sub).join("last_commit_date.txt"))
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Backfill Test", "backfill@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }
    repo
}

fn committed_counter(repo: &Repository, path: &str) -> Vec<u8> {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    head.tree()
        .unwrap()
        .get_path(Path::new(path))
        .unwrap()
        .to_object(repo)
        .unwrap()
        .peel_to_blob()
        .unwrap()
        .content()
        .to_vec()
}

/// Author dates of every commit reachable from HEAD, newest commit first.
fn author_days(repo: &Repository) -> Vec<NaiveDate> {
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.set_sorting(Sort::TOPOLOGICAL).unwrap();
    walk.map(|oid| {
        let c = repo.find_commit(oid.unwrap()).unwrap();
        Local
            .timestamp_opt(c.author().when().seconds(), 0)
            .unwrap()
            .date_naive()
    })
    .collect()
}

fn global(dir: &Path) -> GlobalOpts {
    GlobalOpts {
        dir: Some(dir.to_path_buf()),
        config: None,
    }
}

#[test]
fn cli_backend_commits_each_missing_day_and_pushes() {
    if !git_available() {
        eprintln!("skipping: git binary not found");
        return;
    }
    let td = tempdir().unwrap();
    let today = Local::now().date_naive();
    let last = today.checked_sub_days(Days::new(3)).unwrap();
    let repo = setup(td.path(), 5, last, "remote = \"origin\"\n");
    let work = td.path().join("work");

    let summary = cmd_run(&global(&work), &RunOptions::default()).unwrap();

    assert_eq!(summary.commits.len(), 3);
    assert!(summary.pushed);
    assert_eq!(read_number(&work.join("number.txt")).unwrap(), 8);
    assert_eq!(
        read_last_commit_date(&work.join("last_commit_date.txt")).unwrap(),
        today
    );

    let days = author_days(&repo);
    assert_eq!(days.len(), 4);
    let mut backfilled = days[..3].to_vec();
    backfilled.sort();
    assert_eq!(
        backfilled,
        vec![
            today.checked_sub_days(Days::new(2)).unwrap(),
            today.checked_sub_days(Days::new(1)).unwrap(),
            today,
        ]
    );

    let head = repo.head().unwrap();
    let remote = Repository::open_bare(td.path().join("remote.git")).unwrap();
    let pushed = remote.find_reference(head.name().unwrap()).unwrap();
    assert_eq!(pushed.target(), head.target());
}

#[test]
fn git2_backend_commits_oldest_first_without_push() {
    let td = tempdir().unwrap();
    let today = Local::now().date_naive();
    let last = today.checked_sub_days(Days::new(2)).unwrap();
    let repo = setup(
        td.path(),
        0,
        last,
        "backend = \"git2\"\norder = \"oldest-first\"\npush = false\nmessage = \"bump {number}\"\n",
    );
    let work = td.path().join("work");

    let summary = cmd_run(&global(&work), &RunOptions::default()).unwrap();

    assert!(!summary.pushed);
    assert_eq!(read_number(&work.join("number.txt")).unwrap(), 2);

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("bump 2"));
    assert_eq!(
        author_days(&repo)[..2].to_vec(),
        vec![today, today.checked_sub_days(Days::new(1)).unwrap()]
    );

    assert_eq!(committed_counter(&repo, "number.txt"), b"2");

    let remote = Repository::open_bare(td.path().join("remote.git")).unwrap();
    assert!(remote.head().is_err());
}

#[test]
fn git2_backend_pushes_to_origin() {
    let td = tempdir().unwrap();
    let today = Local::now().date_naive();
    let last = today.checked_sub_days(Days::new(1)).unwrap();
    let repo = setup(td.path(), 0, last, "backend = \"git2\"\nremote = \"origin\"\n");
    let work = td.path().join("work");

    let summary = cmd_run(&global(&work), &RunOptions::default()).unwrap();
    assert!(summary.pushed);

    let head = repo.head().unwrap();
    let remote = Repository::open_bare(td.path().join("remote.git")).unwrap();
    let pushed = remote.find_reference(head.name().unwrap()).unwrap();
    assert_eq!(pushed.target(), head.target());
}

#[test]
fn run_outside_a_repository_fails() {
    let td = tempdir().unwrap();
    fs::write(td.path().join("number.txt"), "1").unwrap();
    fs::write(td.path().join("last_commit_date.txt"), "2000-01-01").unwrap();
    fs::write(td.path().join("backfill.toml"), "backend = \"git2\"\n").unwrap();

    let err = cmd_run(&global(td.path()), &RunOptions::default()).unwrap_err();
    assert!(err.to_string().contains("not a git repository"));
}

#[test]
fn git2_backend_works_from_a_subdirectory() {
    let td = tempdir().unwrap();
    let today = Local::now().date_naive();
    let last = today.checked_sub_days(Days::new(1)).unwrap();
    let repo = setup_in(
        td.path(),
        "counter",
        4,
        last,
        "backend = \"git2\"\npush = false\n",
    );
    let state = td.path().join("work").join("counter");

    let summary = cmd_run(&global(&state), &RunOptions::default()).unwrap();

    assert_eq!(summary.commits.len(), 1);
    assert_eq!(committed_counter(&repo, "counter/number.txt"), b"5");
    assert_eq!(
        read_last_commit_date(&state.join("last_commit_date.txt")).unwrap(),
        today
    );
}

#[test]
fn cli_backend_works_from_a_subdirectory() {
    if !git_available() {
        eprintln!("skipping: git binary not found");
        return;
    }
    let td = tempdir().unwrap();
    let today = Local::now().date_naive();
    let last = today.checked_sub_days(Days::new(1)).unwrap();
    let repo = setup_in(td.path(), "counter", 4, last, "push = false\n");
    let state = td.path().join("work").join("counter");

    cmd_run(&global(&state), &RunOptions::default()).unwrap();

    assert_eq!(committed_counter(&repo, "counter/number.txt"), b"5");
}
