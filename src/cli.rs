//! Command-line interface module for tidytree.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing
//! - Configuration loading
//! - Running the engine for scan, organize, and layout commands
//! - Rendering reports as text or JSON

use crate::config::{LOCAL_CONFIG_FILE, OrganizerConfig};
use crate::organizer::{Organizer, RunReport, ScanReport};
use crate::output::{OutputFormatter, format_size};
use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Sort files into category folders by extension.
#[derive(Debug, Parser)]
#[command(name = "tidytree", version, about)]
pub struct Cli {
    /// Configuration file to use instead of the default lookup.
    #[arg(short, long, global = true, env = "TIDYTREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON instead of a table.
    #[arg(long, global = true)]
    pub json: bool,

    /// How many per-file errors to print.
    #[arg(long, global = true, default_value_t = 20)]
    pub max_errors: usize,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: OrganizeCommand,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Subcommand)]
pub enum OrganizeCommand {
    /// Classify files and report counts and sizes without changing anything.
    Scan {
        /// Directory to scan.
        source: PathBuf,
    },
    /// Move files into category folders under a target directory.
    Organize {
        /// Directory whose files are sorted.
        source: PathBuf,
        /// Directory that receives the category folders.
        target: PathBuf,
        /// Show where files would go without moving anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Create an empty folder for every category.
    Layout {
        /// Directory that receives the category folders.
        target: PathBuf,
        /// List the folders that would be created.
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the default configuration to a file.
    InitConfig {
        /// Where to write it; defaults to `.tidytree.toml`.
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// How reports are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub json: bool,
    pub max_errors: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            json: false,
            max_errors: 20,
        }
    }
}

/// How a command that did not fail outright went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every file was handled.
    Complete,
    /// The run finished but some files failed or it was cancelled.
    Partial,
}

#[derive(Serialize)]
struct JsonReport<'a, T: Serialize> {
    generated_at: DateTime<Utc>,
    command: &'static str,
    report: &'a T,
}

/// Runs the command parsed from the command line.
pub fn run_cli(cli: &Cli) -> anyhow::Result<RunStatus> {
    let options = OutputOptions {
        json: cli.json,
        max_errors: cli.max_errors,
    };
    run_cli_with_config(&cli.command, cli.config.as_deref(), options)
}

/// Runs a command with an optional configuration file.
///
/// # Arguments
///
/// * `command` - The command to execute
/// * `config_path` - Optional path to configuration file
/// * `options` - Output format
///
/// # Examples
///
/// ```no_run
/// use tidytree::cli::{run_cli_with_config, OrganizeCommand, OutputOptions};
/// use std::path::PathBuf;
///
/// let command = OrganizeCommand::Scan { source: PathBuf::from("Downloads") };
/// match run_cli_with_config(&command, None, OutputOptions::default()) {
///     Ok(status) => println!("Finished: {:?}", status),
///     Err(e) => eprintln!("Error: {:#}", e),
/// }
/// ```
pub fn run_cli_with_config(
    command: &OrganizeCommand,
    config_path: Option<&Path>,
    options: OutputOptions,
) -> anyhow::Result<RunStatus> {
    match command {
        OrganizeCommand::InitConfig { path, force } => init_config(path.as_deref(), *force),
        OrganizeCommand::Scan { source } => with_organizer(config_path, |organizer| {
            scan_directory(organizer, source, options)
        }),
        OrganizeCommand::Organize {
            source,
            target,
            dry_run,
        } => with_organizer(config_path, |organizer| {
            organize_directory(organizer, source, target, *dry_run, options)
        }),
        OrganizeCommand::Layout { target, dry_run } => with_organizer(config_path, |organizer| {
            create_layout(organizer, target, *dry_run, options)
        }),
    }
}

/// Loads configuration, builds the engine, and hands it to `run`.
fn with_organizer<F>(config_path: Option<&Path>, run: F) -> anyhow::Result<RunStatus>
where
    F: FnOnce(&Organizer<'_>) -> anyhow::Result<RunStatus>,
{
    let config = OrganizerConfig::load_or_default(config_path);
    let table = config
        .category_table()
        .context("Error in category configuration")?;
    let rules = config
        .walk_rules()
        .context("Error compiling ignore rules")?;
    run(&Organizer::new(&table, &rules))
}

fn scan_directory(
    organizer: &Organizer<'_>,
    source: &Path,
    options: OutputOptions,
) -> anyhow::Result<RunStatus> {
    let spinner = (!options.json).then(|| OutputFormatter::spinner("Scanning..."));
    let result = organizer.scan(source);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = result?;

    if options.json {
        print_json("scan", &report)?;
    } else {
        print_scan(source, &report, options.max_errors);
    }

    Ok(status(report.errors.is_empty() && !report.cancelled))
}

fn organize_directory(
    organizer: &Organizer<'_>,
    source: &Path,
    target: &Path,
    dry_run: bool,
    options: OutputOptions,
) -> anyhow::Result<RunStatus> {
    let message = if dry_run { "Planning..." } else { "Organizing..." };
    let spinner = (!options.json).then(|| OutputFormatter::spinner(message));
    let result = organizer.organize(source, target, dry_run);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = result?;

    if options.json {
        print_json("organize", &report)?;
    } else {
        print_organize(source, target, &report, options.max_errors);
    }

    Ok(status(report.errors.is_empty() && !report.cancelled))
}

fn create_layout(
    organizer: &Organizer<'_>,
    target: &Path,
    dry_run: bool,
    options: OutputOptions,
) -> anyhow::Result<RunStatus> {
    let created = organizer.create_category_layout(target, dry_run)?;

    if options.json {
        print_json("layout", &created)?;
        return Ok(RunStatus::Complete);
    }

    if created.is_empty() {
        OutputFormatter::info("All category folders already exist.");
    }
    for path in &created {
        if dry_run {
            OutputFormatter::dry_run_notice(&format!("Would create {}", path.display()));
        } else {
            OutputFormatter::success(&format!("Created {}", path.display()));
        }
    }

    Ok(RunStatus::Complete)
}

fn init_config(path: Option<&Path>, force: bool) -> anyhow::Result<RunStatus> {
    let path = path.unwrap_or(Path::new(LOCAL_CONFIG_FILE));
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    OrganizerConfig::default()
        .save(path)
        .with_context(|| format!("Error writing {}", path.display()))?;
    OutputFormatter::success(&format!("Wrote default configuration to {}", path.display()));
    Ok(RunStatus::Complete)
}

fn print_scan(source: &Path, report: &ScanReport, max_errors: usize) {
    OutputFormatter::info(&format!("Scanned: {}", source.display()));

    if report.total_files() == 0 && report.errors.is_empty() {
        OutputFormatter::plain("No files found.");
        return;
    }

    OutputFormatter::summary_table(&report.summaries());
    OutputFormatter::error_list(&report.errors, max_errors);

    if report.cancelled {
        OutputFormatter::warning("Scan was cancelled before it finished.");
    }
}

fn print_organize(source: &Path, target: &Path, report: &RunReport, max_errors: usize) {
    if report.dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Files in {} would be organized into {}:",
            source.display(),
            target.display()
        ));
    } else {
        OutputFormatter::info(&format!(
            "Organizing {} into {}:",
            source.display(),
            target.display()
        ));
    }

    if report.total_files() == 0 && report.errors.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return;
    }

    for outcome in report.outcomes() {
        let arrow = if report.dry_run { "→ would move to" } else { "→" };
        OutputFormatter::plain(&format!(
            " - {} {} {} ({})",
            outcome.source.display(),
            arrow,
            outcome.destination.display(),
            format_size(outcome.size)
        ));
    }

    OutputFormatter::summary_table(&report.summaries());

    if report.skipped > 0 {
        OutputFormatter::plain(&format!(
            "Skipped {} already inside the target.",
            plural(report.skipped)
        ));
    }

    OutputFormatter::error_list(&report.errors, max_errors);

    if report.cancelled {
        OutputFormatter::warning("Run was cancelled before it finished.");
    } else if report.dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else if report.errors.is_empty() {
        OutputFormatter::success("Organization complete!");
    } else {
        OutputFormatter::warning("Some files could not be organized. Please review errors above.");
    }
}

fn print_json<T: Serialize>(command: &'static str, report: &T) -> anyhow::Result<()> {
    let document = JsonReport {
        generated_at: Utc::now(),
        command,
        report,
    };
    let json = serde_json::to_string_pretty(&document).context("Error serializing report")?;
    println!("{}", json);
    Ok(())
}

fn status(complete: bool) -> RunStatus {
    if complete {
        RunStatus::Complete
    } else {
        RunStatus::Partial
    }
}

fn plural(count: usize) -> String {
    format!("{} {}", count, if count == 1 { "file" } else { "files" })
}
