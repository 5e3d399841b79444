//! Command-line interface for tidydesk.
//!
//! Parses arguments, loads configuration, drives the [`Organizer`] and hands
//! its results to [`OutputFormatter`].

use crate::config::{Config, ConfigError};
use crate::file_organizer::{OrganizeError, Organizer, Progress};
use crate::output::OutputFormatter;
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sort the files of a folder into category subfolders by extension.
#[derive(Debug, Clone, Parser)]
#[command(name = "tidydesk", version, about)]
pub struct Cli {
    /// Folder to organize
    pub folder: PathBuf,

    /// Show what would be moved without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration file (defaults to .tidydeskrc.toml, then ~/.config/tidydesk/config.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Failures that stop the command before or instead of a report.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error("Failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a completed command went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every eligible file was handled.
    Clean,
    /// The command completed but some files could not be moved.
    PartialFailure,
}

/// Runs the command described by `cli`.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use tidydesk::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["tidydesk", "/home/me/Downloads", "--dry-run"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<Outcome, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    run_cli_with_config(cli, config)
}

/// Runs the command with an already loaded configuration.
pub fn run_cli_with_config(cli: &Cli, config: Config) -> Result<Outcome, CliError> {
    let mut organizer = config.into_organizer()?;
    if let Some(own_name) = self_exclusion(&cli.folder) {
        organizer = organizer.with_self_exclusion(own_name);
    }

    if cli.dry_run {
        organize_directory_dry_run(&organizer, &cli.folder, cli.json)
    } else {
        organize_directory(&organizer, &cli.folder, cli.json)
    }
}

/// Moves the files of `base_path` and reports the result.
pub fn organize_directory(
    organizer: &Organizer,
    base_path: &Path,
    json: bool,
) -> Result<Outcome, CliError> {
    if !json {
        OutputFormatter::banner("TIDYDESK IS RUNNING...", base_path);
    }

    let spinner = OutputFormatter::create_spinner("Scanning and moving files...", !json);
    let result = organizer.run_with(base_path, |progress| {
        match progress {
            Progress::Moved(plan) => {
                spinner.set_message(format!("{} → {}/", plan.file_name, plan.category));
            }
            Progress::Failed(error) => {
                spinner.set_message(format!("{} ✗", error.file_name));
            }
        }
        ControlFlow::Continue(())
    });
    spinner.finish_and_clear();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        OutputFormatter::organize_report(&report);
    }

    Ok(if report.is_clean() {
        Outcome::Clean
    } else {
        Outcome::PartialFailure
    })
}

/// Shows what [`organize_directory`] would do, without modifying anything.
pub fn organize_directory_dry_run(
    organizer: &Organizer,
    base_path: &Path,
    json: bool,
) -> Result<Outcome, CliError> {
    let report = organizer.plan(base_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        OutputFormatter::dry_run_notice(&format!(
            "Analyzing contents of: {}",
            base_path.display()
        ));
        OutputFormatter::dry_run_report(&report);
    }

    Ok(if report.errors.is_empty() {
        Outcome::Clean
    } else {
        Outcome::PartialFailure
    })
}

/// Name of the running executable if it lives directly inside `folder`.
fn self_exclusion(folder: &Path) -> Option<OsString> {
    let exe = std::env::current_exe().ok()?;
    let exe_dir = exe.parent()?.canonicalize().ok()?;
    let folder = folder.canonicalize().ok()?;
    if exe_dir == folder {
        exe.file_name().map(|name| name.to_os_string())
    } else {
        None
    }
}
