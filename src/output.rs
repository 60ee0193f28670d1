//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! a spinner for long runs, and formatted summary tables. The engine never prints;
//! everything a user sees goes through here.

use crate::organizer::{CategorySummary, FileError};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - A spinner while the engine runs
/// - Summary tables with per-category counts and sizes
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidytree::output::OutputFormatter;
    /// OutputFormatter::success("Files organized successfully!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
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

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a ticking spinner with `message`. Call `finish_and_clear` on
    /// the returned bar when the work is done.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidytree::output::OutputFormatter;
    /// let spinner = OutputFormatter::spinner("Scanning...");
    /// // ... long-running work ...
    /// spinner.finish_and_clear();
    /// ```
    pub fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{elapsed}]")
                .expect("Invalid spinner template"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Prints a summary table with file counts and sizes by category.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidytree::organizer::CategorySummary;
    /// use tidytree::output::OutputFormatter;
    ///
    /// let rows = vec![
    ///     CategorySummary { name: "documents".to_string(), count: 15, bytes: 48_000 },
    ///     CategorySummary { name: "images".to_string(), count: 8, bytes: 2_400_000 },
    /// ];
    /// OutputFormatter::summary_table(&rows);
    /// ```
    pub fn summary_table(summaries: &[CategorySummary]) {
        Self::header("SUMMARY");

        let width = summaries
            .iter()
            .map(|summary| summary.name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {:>7} | {}",
            "Category".bold(),
            "Files".bold(),
            "Size".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 24));

        for summary in summaries {
            println!(
                "{:<width$} | {:>7} | {}",
                summary.name,
                summary.count.to_string().green(),
                format_size(summary.bytes),
                width = width
            );
        }

        let total_files: usize = summaries.iter().map(|summary| summary.count).sum();
        let total_bytes: u64 = summaries.iter().map(|summary| summary.bytes).sum();

        println!("{}", "-".repeat(width + 24));
        println!(
            "{:<width$} | {:>7} | {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            format_size(total_bytes).bold(),
            width = width
        );
    }

    /// Prints up to `limit` per-file errors and notes how many were left out.
    pub fn error_list(errors: &[FileError], limit: usize) {
        if errors.is_empty() {
            return;
        }

        Self::header(&format!("ERRORS ({})", errors.len()));
        for error in errors.iter().take(limit) {
            Self::error(&error.to_string());
        }

        if errors.len() > limit {
            Self::warning(&format!(
                "... and {} more (raise --max-errors to see them)",
                errors.len() - limit
            ));
        }
    }
}

/// Formats a byte count with binary units, e.g. `1.5 KiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
