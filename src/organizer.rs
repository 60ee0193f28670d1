//! Classification and conflict-safe relocation engine.
//!
//! The [`Organizer`] drives a [`TreeWalker`] over a source tree, resolves a
//! category for every file through a [`CategoryTable`], picks a destination
//! that does not clobber anything, and moves (or, in a dry run, only plans to
//! move) each file. Failures that concern a single file are collected in the
//! report and never stop the run; only problems with the source or target
//! roots are returned as [`OrganizeError`].

use crate::category::CategoryTable;
use crate::path_allocator::{allocate, allocate_with, is_occupied};
use crate::walker::{FileEntry, TreeWalker, WalkError, WalkRules};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Fatal errors that abort a run before or instead of processing files.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// The source directory does not exist or is not a directory.
    #[error("Source directory does not exist: {}", path.display())]
    InvalidSource { path: PathBuf },

    /// The target path could not be turned into an absolute path.
    #[error("Invalid target path {}: {source}", path.display())]
    InvalidTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The target root (or a layout directory) could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for engine operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What went wrong with a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    /// The entry or its metadata could not be read during traversal.
    Unreadable,
    /// The category directory for the file could not be created.
    CategoryDirectory,
    /// The file could not be moved to its destination.
    Move,
}

/// A per-file failure recorded in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: FileErrorKind,
    pub message: String,
}

impl FileError {
    fn new(path: &Path, kind: FileErrorKind, cause: impl std::fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            message: cause.to_string(),
        }
    }
}

impl From<WalkError> for FileError {
    fn from(err: WalkError) -> Self {
        let message = err.source.to_string();
        Self {
            path: err.path,
            kind: FileErrorKind::Unreadable,
            message,
        }
    }
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// The placement of one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizeOutcome {
    pub category: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub size: u64,
}

/// File count and byte total for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
    pub bytes: u64,
}

/// Result of [`Organizer::organize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Outcomes per category, in processing order.
    pub categories: BTreeMap<String, Vec<OrganizeOutcome>>,
    /// Files that failed, in processing order.
    pub errors: Vec<FileError>,
    /// Files left alone because they were already under the target when
    /// the run started.
    pub skipped: usize,
    pub dry_run: bool,
    /// True if the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl RunReport {
    fn record(&mut self, outcome: OrganizeOutcome) {
        self.categories
            .entry(outcome.category.clone())
            .or_default()
            .push(outcome);
    }

    /// Number of files placed (or planned, in a dry run).
    pub fn total_files(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Sum of the sizes of all placed files.
    pub fn total_bytes(&self) -> u64 {
        self.outcomes().map(|outcome| outcome.size).sum()
    }

    /// All outcomes, grouped by category name.
    pub fn outcomes(&self) -> impl Iterator<Item = &OrganizeOutcome> {
        self.categories.values().flatten()
    }

    /// Number of files per category.
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        self.categories
            .iter()
            .map(|(name, outcomes)| (name.as_str(), outcomes.len()))
            .collect()
    }

    pub fn summaries(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|(name, outcomes)| CategorySummary {
                name: name.clone(),
                count: outcomes.len(),
                bytes: outcomes.iter().map(|outcome| outcome.size).sum(),
            })
            .collect()
    }
}

/// Result of [`Organizer::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Discovered files per category, in traversal order.
    pub categories: BTreeMap<String, Vec<FileEntry>>,
    /// Entries that could not be read.
    pub errors: Vec<FileError>,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn total_files(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.categories.values().flatten().map(|entry| entry.size).sum()
    }

    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        self.categories
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect()
    }

    pub fn summaries(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|(name, entries)| CategorySummary {
                name: name.clone(),
                count: entries.len(),
                bytes: entries.iter().map(|entry| entry.size).sum(),
            })
            .collect()
    }
}

/// Sorts files from a source tree into per-category directories.
///
/// The organizer borrows its category table and walk rules; both stay
/// unchanged for the lifetime of a run.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tidytree::category::CategoryTable;
/// use tidytree::organizer::Organizer;
/// use tidytree::walker::WalkRules;
///
/// let table = CategoryTable::default();
/// let rules = WalkRules::default();
/// let report = Organizer::new(&table, &rules)
///     .organize(Path::new("Downloads"), Path::new("Sorted"), true)
///     .expect("source directory missing");
/// println!("{} files would move", report.total_files());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Organizer<'a> {
    table: &'a CategoryTable,
    rules: &'a WalkRules,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Organizer<'a> {
    pub fn new(table: &'a CategoryTable, rules: &'a WalkRules) -> Self {
        Self {
            table,
            rules,
            cancel: None,
        }
    }

    /// Checks `flag` between files and stops the run once it is set.
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Classifies every file under `source` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::InvalidSource`] if `source` is not an
    /// existing directory.
    pub fn scan(&self, source: &Path) -> OrganizeResult<ScanReport> {
        let source = canonical_source(source)?;
        info!(source = %source.display(), "Scanning");

        let mut report = ScanReport::default();
        for item in TreeWalker::new(self.rules).walk(&source) {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match item {
                Ok(entry) => {
                    let category = self.table.resolve(&entry.extension).to_string();
                    debug!(path = %entry.path.display(), %category, "Classified");
                    report.categories.entry(category).or_default().push(entry);
                }
                Err(e) => {
                    warn!("{}", e);
                    report.errors.push(e.into());
                }
            }
        }

        info!(
            files = report.total_files(),
            bytes = report.total_bytes(),
            errors = report.errors.len(),
            "Scan finished"
        );
        Ok(report)
    }

    /// Moves every file under `source` into `target/<category>/`.
    ///
    /// With `dry_run` set nothing is created or moved, but the report lists
    /// the destinations a real run would use. Destinations never overwrite
    /// existing files, nor, in a dry run, each other.
    ///
    /// A target nested inside the source is never descended into, so files
    /// moved there earlier in the run are not seen again. Files that were
    /// already under the target are left alone and counted as skipped.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::InvalidSource`] if `source` is not an existing
    /// directory and [`OrganizeError::DirectoryCreation`] if `target` cannot
    /// be created. Anything that goes wrong with an individual file is
    /// recorded in [`RunReport::errors`] instead.
    pub fn organize(
        &self,
        source: &Path,
        target: &Path,
        dry_run: bool,
    ) -> OrganizeResult<RunReport> {
        let source = canonical_source(source)?;

        if !dry_run {
            fs::create_dir_all(target).map_err(|e| OrganizeError::DirectoryCreation {
                path: target.to_path_buf(),
                source: e,
            })?;
        }
        let target = absolute_path(target).map_err(|e| OrganizeError::InvalidTarget {
            path: target.to_path_buf(),
            source: e,
        })?;

        info!(
            source = %source.display(),
            target = %target.display(),
            dry_run,
            "Organizing"
        );

        let mut report = RunReport {
            dry_run,
            ..Default::default()
        };
        let mut planned: HashSet<PathBuf> = HashSet::new();

        let walker = TreeWalker::new(self.rules);
        report.skipped = walker.count_below(&source, &target);

        for item in walker.walk_pruned(&source, &target) {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("{}", e);
                    report.errors.push(e.into());
                    continue;
                }
            };

            if entry.path.starts_with(&target) {
                debug!(path = %entry.path.display(), "Already under target, skipping");
                report.skipped += 1;
                continue;
            }

            let result = if dry_run {
                self.plan_file(&entry, &target, &mut planned)
            } else {
                self.move_file(&entry, &target)
            };

            match result {
                Ok(outcome) => {
                    debug!(
                        source = %outcome.source.display(),
                        destination = %outcome.destination.display(),
                        category = %outcome.category,
                        "Placed"
                    );
                    report.record(outcome);
                }
                Err(e) => {
                    warn!("{}", e);
                    report.errors.push(e);
                }
            }
        }

        info!(
            files = report.total_files(),
            bytes = report.total_bytes(),
            errors = report.errors.len(),
            skipped = report.skipped,
            "Organize finished"
        );
        Ok(report)
    }

    /// Computes the destination a real run would use for `entry`.
    fn plan_file(
        &self,
        entry: &FileEntry,
        target: &Path,
        planned: &mut HashSet<PathBuf>,
    ) -> Result<OrganizeOutcome, FileError> {
        let (category, desired) = self.desired_destination(entry, target)?;
        let destination = allocate_with(&desired, |candidate| {
            is_occupied(candidate) || planned.contains(candidate)
        });
        planned.insert(destination.clone());

        Ok(OrganizeOutcome {
            category,
            source: entry.path.clone(),
            destination,
            size: entry.size,
        })
    }

    fn move_file(&self, entry: &FileEntry, target: &Path) -> Result<OrganizeOutcome, FileError> {
        let (category, desired) = self.desired_destination(entry, target)?;

        if let Some(category_dir) = desired.parent() {
            fs::create_dir_all(category_dir).map_err(|e| {
                FileError::new(
                    &entry.path,
                    FileErrorKind::CategoryDirectory,
                    format!("cannot create {}: {}", category_dir.display(), e),
                )
            })?;
        }

        let destination = allocate(&desired);
        relocate(&entry.path, &destination).map_err(|e| {
            FileError::new(
                &entry.path,
                FileErrorKind::Move,
                format!("cannot move to {}: {}", destination.display(), e),
            )
        })?;

        Ok(OrganizeOutcome {
            category,
            source: entry.path.clone(),
            destination,
            size: entry.size,
        })
    }

    fn desired_destination(
        &self,
        entry: &FileEntry,
        target: &Path,
    ) -> Result<(String, PathBuf), FileError> {
        let category = self.table.resolve(&entry.extension);
        let file_name = entry.file_name().ok_or_else(|| {
            FileError::new(&entry.path, FileErrorKind::Move, "file has no name component")
        })?;
        let desired = target.join(category).join(file_name);
        Ok((category.to_string(), desired))
    }

    /// Creates one directory per category, plus `other`, under `base`.
    ///
    /// Directories that already exist are left alone and not reported. In a
    /// dry run the returned list names the directories that would be created.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::DirectoryCreation`] on the first directory
    /// that cannot be created.
    pub fn create_category_layout(
        &self,
        base: &Path,
        dry_run: bool,
    ) -> OrganizeResult<Vec<PathBuf>> {
        let mut created = Vec::new();

        for name in self.table.layout_names() {
            let path = base.join(name);
            if path.exists() {
                continue;
            }

            if !dry_run {
                fs::create_dir_all(&path).map_err(|e| OrganizeError::DirectoryCreation {
                    path: path.clone(),
                    source: e,
                })?;
                debug!(path = %path.display(), "Created category directory");
            }
            created.push(path);
        }

        info!(base = %base.display(), created = created.len(), dry_run, "Layout finished");
        Ok(created)
    }
}

fn canonical_source(source: &Path) -> OrganizeResult<PathBuf> {
    match fs::canonicalize(source) {
        Ok(path) if path.is_dir() => Ok(path),
        _ => Err(OrganizeError::InvalidSource {
            path: source.to_path_buf(),
        }),
    }
}

/// Makes `path` absolute and comparable with canonical paths, even when it
/// does not exist yet.
///
/// `.` and `..` are folded lexically, then the longest existing ancestor is
/// canonicalized and the missing components are appended to it.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    let mut absolute = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                absolute.pop();
            }
            other => absolute.push(other),
        }
    }

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(mut resolved) = existing.canonicalize() {
            resolved.extend(missing.iter().rev());
            return Ok(resolved);
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}

/// Renames `from` to `to`, copying and deleting when they are on different
/// filesystems.
fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "Cross-device move, copying");
            if let Err(e) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
