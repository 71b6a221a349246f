//! # backfill
//!
//! Keeps a daily counter in a git repository:
//! - `backfill run` commits one increment per missed day and pushes
//! - `backfill status` shows the counter and how many days are missing
//! - `backfill init` creates the counter and date files
//! - `backfill paths` prints the resolved file locations
//!
//! Running without a subcommand is the same as `backfill run`.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use backfill::{
    GlobalOpts, InitOptions, RunOptions, RunSummary, cmd_init, cmd_run, cmd_status, resolve,
};

#[derive(Parser, Debug)]
#[command(
    name = "backfill",
    version,
    about = "backfill - commit a counter once per missed day and push"
)]
struct Cli {
    /// Repository directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    dir: Option<PathBuf>,
    /// Config file (defaults to <dir>/backfill.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Commit one increment per missing day, then push
    Run {
        /// Print the planned commits without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Do not push after committing
        #[arg(long)]
        no_push: bool,
    },
    /// Show the counter, last commit date and missing days
    Status,
    /// Create the counter and date files
    Init {
        /// Initial counter value
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        start: i64,
        /// Initial last-commit date (YYYY-MM-DD); today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved file locations
    Paths,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(summary: &RunSummary) {
    if summary.dry_run {
        for c in &summary.commits {
            println!("{} -> {}  {}", c.day, c.number, c.message);
        }
        println!("{} commit(s) planned (dry run)", summary.commits.len());
        return;
    }
    match summary.commits.last() {
        Some(last) => println!(
            "committed {} day(s); counter is now {}",
            summary.commits.len(),
            last.number
        ),
        None => println!("nothing to backfill"),
    }
    if summary.pushed {
        println!("{}", "Changes pushed successfully.".green());
    }
}

fn run(cli: Cli) -> Result<()> {
    let global = GlobalOpts {
        dir: cli.dir,
        config: cli.config,
    };
    let cmd = cli.cmd.unwrap_or(Cmd::Run {
        dry_run: false,
        no_push: false,
    });

    match cmd {
        Cmd::Run { dry_run, no_push } => {
            let summary = cmd_run(&global, &RunOptions { dry_run, no_push })?;
            print_summary(&summary);
            Ok(())
        }
        Cmd::Status => cmd_status(&global),
        Cmd::Init { start, date, force } => {
            cmd_init(&global, &InitOptions { start, date, force })
        }
        Cmd::Paths => {
            let (p, _) = resolve(&global)?;
            println!("repo:    {}", p.repo.display());
            println!("config:  {}", p.config.display());
            println!("counter: {}", p.counter.display());
            println!("date:    {}", p.last_date.display());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
