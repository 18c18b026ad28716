//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored progress
//! lines, the run header, the end-of-run summary table and the spinner shown
//! while an auto-run waits for its next cycle.

use crate::file_organizer::{OrganizeResult, Outcome, RunOptions};
use chrono::{DateTime, Local};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

const RULE_WIDTH: usize = 60;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use foldersort::output::OutputFormatter;
    /// OutputFormatter::error("Failed to organize file");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    fn rule() {
        println!("{}", "-".repeat(RULE_WIDTH));
    }

    /// Prints the banner shown before a run.
    pub fn run_header(folder: &Path, options: RunOptions) {
        Self::header(&format!("Organizing folder: {}", folder.display()));
        println!(
            "Recursive: {} | Dry-run: {}",
            options.recursive, options.dry_run
        );
        Self::rule();
    }

    /// Prints the progress line for a single outcome, if it has one.
    pub fn outcome(root: &Path, outcome: &Outcome) {
        let Some(line) = outcome.describe(root) else {
            return;
        };
        match outcome {
            Outcome::Moved { dry_run: true, .. } => Self::dry_run_notice(&line),
            Outcome::Moved { .. } => Self::success(&line),
            Outcome::Failed { .. } => Self::error(&line),
            _ => println!("{}", line),
        }
    }

    /// Prints a summary table with per-category counts and skip counts.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use foldersort::file_organizer::OrganizeResult;
    /// use foldersort::output::OutputFormatter;
    ///
    /// let mut result = OrganizeResult::default();
    /// result.moved.insert("Images".to_string(), 8);
    /// result.skipped_unmapped = 2;
    /// OutputFormatter::summary_table(&result);
    /// ```
    pub fn summary_table(result: &OrganizeResult) {
        Self::header("Summary");
        Self::rule();

        // Sort categories for consistent output
        let mut categories: Vec<_> = result.moved.iter().collect();
        categories.sort_by_key(|&(name, _)| name);

        let width = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(14);

        for (category, count) in &categories {
            println!(
                "{:<width$} : {} file(s)",
                category,
                count.to_string().green(),
                width = width
            );
        }
        println!(
            "{:<width$} : {} file(s)",
            "Unmapped",
            result.skipped_unmapped.to_string().yellow(),
            width = width
        );
        println!(
            "{:<width$} : {} file(s)",
            "Other skipped",
            result.skipped_other.to_string().yellow(),
            width = width
        );
        Self::rule();
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", message.yellow());
    }

    /// Creates a spinner that ticks until the next auto-run cycle.
    pub fn wait_spinner(until: Option<DateTime<Local>>) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        let message = match until {
            Some(until) => format!(
                "Next run at {} (Ctrl+C to stop)",
                until.format("%Y-%m-%d %H:%M:%S")
            ),
            None => "Waiting for the next run (Ctrl+C to stop)".to_string(),
        };
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}
