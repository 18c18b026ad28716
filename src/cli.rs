//! Command-line interface module for foldersort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and validation
//! - Configuration loading
//! - Single-run orchestration with verbose progress output
//! - Interval (auto) runs until interrupted

use crate::config::{ConfigDocument, OrganizerConfig};
use crate::file_organizer::{OrganizeError, OrganizeResult, RunOptions, organize_with_progress};
use crate::output::OutputFormatter;
use crate::runner::{self, OrganizeJob, RunEvent};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Longest accepted `--interval`, one year in minutes.
pub const MAX_INTERVAL_MINUTES: u64 = 60 * 24 * 366;

/// Organize files into subfolders by type (configurable via JSON).
#[derive(Debug, Clone, Parser)]
#[command(name = "foldersort", version, about)]
pub struct Args {
    /// Path to the folder you want to organize
    #[arg(required_unless_present = "init_config")]
    pub folder: Option<PathBuf>,

    /// Path to the config file (JSON, or TOML for a .toml path)
    #[arg(long, default_value = "config.json", value_name = "PATH")]
    pub config: PathBuf,

    /// Do NOT search in subfolders
    #[arg(long)]
    pub no_recursive: bool,

    /// Show what would happen, but do not move any files
    #[arg(long)]
    pub dry_run: bool,

    /// Run repeatedly every N minutes (0 = run once)
    #[arg(
        long,
        default_value_t = 0,
        value_name = "MINUTES",
        value_parser = clap::value_parser!(u64).range(0..=MAX_INTERVAL_MINUTES)
    )]
    pub interval: u64,

    /// Write a starter config file to the --config path and exit
    #[arg(long)]
    pub init_config: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            recursive: !self.no_recursive,
            dry_run: self.dry_run,
        }
    }

    /// Interval between auto-runs, or `None` for a single run.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval > 0).then(|| Duration::from_secs(self.interval.saturating_mul(60)))
    }
}

/// Runs the CLI application for already parsed arguments.
///
/// Configuration and folder errors are returned before anything is moved.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use foldersort::cli::{Args, run_cli};
///
/// let args = Args::parse_from(["foldersort", "/path/to/Downloads", "--dry-run"]);
/// if let Err(e) = run_cli(&args) {
///     eprintln!("Error: {e:#}");
/// }
/// ```
pub fn run_cli(args: &Args) -> Result<()> {
    if args.init_config {
        return init_config(&args.config);
    }

    let folder = args
        .folder
        .as_deref()
        .context("A folder to organize is required")?;
    let folder = dunce::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());

    let config = OrganizerConfig::load(&args.config).context("Error loading configuration")?;

    if !folder.is_dir() {
        return Err(OrganizeError::InvalidFolder(folder).into());
    }

    match args.interval() {
        None => {
            run_once_verbose(&folder, &config, args.run_options())?;
            Ok(())
        }
        Some(interval) => run_auto(folder, config, args.run_options(), interval),
    }
}

/// Writes the starter configuration document.
fn init_config(path: &Path) -> Result<()> {
    ConfigDocument::starter()
        .write_new(path)
        .with_context(|| format!("Error writing starter configuration to {}", path.display()))?;
    OutputFormatter::success(&format!("Starter configuration written to {}", path.display()));
    Ok(())
}

/// Organizes a folder once, printing every action and the final summary.
pub fn run_once_verbose(
    folder: &Path,
    config: &OrganizerConfig,
    options: RunOptions,
) -> Result<OrganizeResult> {
    OutputFormatter::run_header(folder, options);

    let result = organize_with_progress(folder, config, options, |outcome| {
        OutputFormatter::outcome(folder, &outcome);
    })?;

    OutputFormatter::summary_table(&result);
    if options.dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    }
    Ok(result)
}

/// Organizes a folder every `interval` until Ctrl+C is pressed.
///
/// A run in progress when Ctrl+C arrives is allowed to finish.
fn run_auto(
    folder: PathBuf,
    config: OrganizerConfig,
    options: RunOptions,
    interval: Duration,
) -> Result<()> {
    OutputFormatter::info(&format!(
        "Auto mode: organizing '{}' every {} minute(s).",
        folder.display(),
        interval.as_secs() / 60
    ));
    OutputFormatter::info("Press Ctrl+C to stop.");

    let job = OrganizeJob {
        folder: folder.clone(),
        config: Arc::new(config),
        options,
        report_progress: true,
    };
    let handle = runner::spawn_auto(job, interval).context("Failed to start auto-run worker")?;

    let token = handle.cancel_token();
    ctrlc::set_handler(move || token.cancel()).context("Failed to install Ctrl+C handler")?;

    let mut spinner: Option<ProgressBar> = None;
    for event in handle.events() {
        if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
        match event {
            RunEvent::Started { at, .. } => {
                OutputFormatter::header(&format!(
                    "=== Run started at {} ===",
                    at.format("%Y-%m-%d %H:%M:%S")
                ));
                OutputFormatter::run_header(&folder, options);
            }
            RunEvent::Progress(outcome) => OutputFormatter::outcome(&folder, &outcome),
            RunEvent::Finished { result, .. } => OutputFormatter::summary_table(&result),
            RunEvent::Failed { error, .. } => OutputFormatter::error(&format!("Error: {error}")),
            RunEvent::Waiting { until } => {
                if !handle.is_cancelled() {
                    spinner = Some(OutputFormatter::wait_spinner(until));
                }
            }
            RunEvent::Stopped => OutputFormatter::warning("Stopped by user."),
        }
    }

    handle.join();
    Ok(())
}
