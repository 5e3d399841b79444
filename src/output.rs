//! Console rendering for the command-line front end.
//!
//! The organizer itself never prints; everything a user sees goes through
//! [`OutputFormatter`] so the look can change in one place.

use crate::file_organizer::{DryRunReport, OrganizeReport, PerFileError, SkippedEntry, Tally};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Timestamp format of the closing "Log time" line.
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BANNER_ICON: &str = "🧹";
const BANNER_ICON_WIDTH: usize = 2;

/// Manages all CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message.green().bold());
    }

    /// Prints an error message in red with an X mark.
    ///
    /// ```no_run
    /// use tidydesk::output::OutputFormatter;
    /// OutputFormatter::error("Path '/nowhere' does not exist");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message.red().bold());
    }

    /// Prints a warning message in yellow.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints the boxed banner shown before a run.
    pub fn banner(title: &str, target: &Path) {
        let [top, heading, target_line, bottom] = Self::banner_lines(title, target);
        println!("{}", top);
        println!("{}", heading.cyan().bold());
        println!("{}", target_line);
        println!("{}", bottom);
    }

    /// The four uncoloured lines of the banner box.
    fn banner_lines(title: &str, target: &Path) -> [String; 4] {
        // The icon occupies two terminal columns.
        let heading = format!("{} {}", BANNER_ICON, title);
        let heading_width = title.chars().count() + 1 + BANNER_ICON_WIDTH;
        let target_line = format!("Target: {}", target.display());
        let target_width = target_line.chars().count();
        let width = heading_width.max(target_width) + 2;

        [
            format!("╭{}╮", "─".repeat(width)),
            format!("│ {}{} │", heading, " ".repeat(width - 2 - heading_width)),
            format!("│ {}{} │", target_line, " ".repeat(width - 2 - target_width)),
            format!("╰{}╯", "─".repeat(width)),
        ]
    }

    /// Creates the spinner shown while files are being moved.
    ///
    /// Returns a hidden bar when `visible` is false so callers can drive it
    /// unconditionally.
    pub fn create_spinner(message: &str, visible: bool) -> ProgressBar {
        if !visible {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.yellow} {msg}") {
            pb.set_style(style.tick_strings(&["▁", "▃", "▄", "▅", "▆", "▇", "▆", "▅", "▄", "▃", "▁"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Prints the per-category report for a finished run.
    ///
    /// Only categories that received files are listed.
    pub fn report_table(tally: &Tally) {
        Self::header("📊 Organization Report");

        let rows: Vec<(&str, usize)> = tally.non_zero().collect();
        let width = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Category".len());

        println!(
            "{:<width$} | {}",
            "Category".cyan().bold(),
            "Files Moved".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 14));
        for (category, count) in &rows {
            println!(
                "{:<width$} | {:>11}",
                category.cyan(),
                count.to_string().white().bold(),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 14));
        println!(
            "{:<width$} | {:>11}",
            "Total".bold(),
            tally.total().to_string().green().bold(),
            width = width
        );
    }

    /// Lists files that could not be moved.
    pub fn file_errors(errors: &[PerFileError]) {
        if errors.is_empty() {
            return;
        }
        Self::header(&format!("{} file(s) could not be moved", errors.len()));
        for error in errors {
            eprintln!("  {} {}", "✗".red(), error.to_string().red());
        }
    }

    /// Lists entries left in place on purpose.
    pub fn skipped(skipped: &[SkippedEntry]) {
        for entry in skipped {
            println!(
                "  {} {} ({:?})",
                "•".dimmed(),
                entry.file_name.dimmed(),
                entry.reason
            );
        }
    }

    /// Renders a completed run: report table, failures, closing line.
    pub fn organize_report(report: &OrganizeReport) {
        println!();
        Self::report_table(&report.tally);
        Self::file_errors(&report.errors);

        if !report.skipped.is_empty() {
            Self::header("Left in place");
            Self::skipped(&report.skipped);
        }

        if report.cancelled {
            Self::warning("Run stopped before every file was handled.");
        }

        println!();
        Self::success(&format!(
            "DONE! Successfully organized {} files.",
            report.tally.total()
        ));
        Self::log_time();
    }

    /// Renders the plan of a dry run.
    pub fn dry_run_report(report: &DryRunReport) {
        if report.planned.is_empty() && report.errors.is_empty() {
            Self::dry_run_notice("No files found to organize.");
            return;
        }

        Self::header("Files would be organized as follows:");
        let mut per_category: BTreeMap<&str, usize> = BTreeMap::new();
        for plan in &report.planned {
            let source_name = plan
                .source
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            println!(
                " - {} {} {}/{}",
                source_name,
                "→".dimmed(),
                plan.category.cyan(),
                plan.file_name
            );
            *per_category.entry(plan.category.as_str()).or_insert(0) += 1;
        }

        Self::file_errors(&report.errors);

        Self::header("DRY RUN SUMMARY");
        for (category, count) in &per_category {
            println!(
                "  {}: {} {}",
                category,
                count,
                if *count == 1 { "file" } else { "files" }
            );
        }
        println!("  Total: {}", report.planned.len());
        println!();
        Self::dry_run_notice("No files were modified.");
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    fn log_time() {
        let now = chrono::Local::now().format(LOG_TIME_FORMAT);
        println!("{}", format!("Log time: {}", now).dimmed());
    }
}
