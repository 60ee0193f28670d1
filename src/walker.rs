//! Lazy, filtered directory traversal.
//!
//! [`TreeWalker::walk`] returns an iterator that yields one [`FileEntry`] per
//! regular file, depth-first, with directory contents sorted by name. Ignore
//! rules are applied to every entry below the root; an ignored directory is
//! not descended into. Entries that cannot be read are yielded as
//! [`WalkError`]s and traversal carries on.

use glob::Pattern;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file discovered during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Path to the file, rooted at the path the walk started from.
    pub path: PathBuf,
    /// Size in bytes at discovery time.
    pub size: u64,
    /// Lowercase extension including the leading dot, or empty.
    pub extension: String,
}

impl FileEntry {
    /// Creates an entry, deriving the extension from `path`.
    pub fn new(path: PathBuf, size: u64) -> Self {
        let extension = extension_of(&path);
        Self {
            path,
            size,
            extension,
        }
    }

    /// The final path component.
    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }
}

/// Returns the lowercase extension of `path` with its leading dot.
///
/// Names like `.bashrc` have no extension; `archive.tar.gz` yields `.gz`.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// An entry that could not be read during traversal.
#[derive(Debug, thiserror::Error)]
#[error("cannot read {}: {source}", path.display())]
pub struct WalkError {
    /// The path that failed, or the walk root when walkdir did not report one.
    pub path: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// Which entries a walk skips, and how deep it goes.
#[derive(Debug, Clone, Default)]
pub struct WalkRules {
    /// Skip names that start with `.`.
    pub ignore_hidden: bool,
    /// Names skipped on exact match, for files and directories alike.
    pub ignore_names: HashSet<String>,
    /// Globs matched against the path relative to the walk root.
    pub ignore_globs: Vec<Pattern>,
    /// Regexes matched against the entry name.
    pub ignore_regexes: Vec<Regex>,
    /// Directory levels below the root to descend. `None` is unlimited and
    /// `Some(0)` lists only the root's own files.
    pub max_depth: Option<usize>,
}

impl WalkRules {
    /// Returns true if an entry named `name`, at `relative` below the root,
    /// should be skipped.
    pub fn is_ignored(&self, name: &str, relative: &Path) -> bool {
        if self.ignore_hidden && name.starts_with('.') {
            return true;
        }

        if self.ignore_names.contains(name) {
            return true;
        }

        if self
            .ignore_globs
            .iter()
            .any(|pattern| pattern.matches_path(relative))
        {
            return true;
        }

        self.ignore_regexes.iter().any(|regex| regex.is_match(name))
    }
}

/// Walks directory trees according to a set of [`WalkRules`].
#[derive(Debug, Clone, Copy)]
pub struct TreeWalker<'a> {
    rules: &'a WalkRules,
}

impl<'a> TreeWalker<'a> {
    pub fn new(rules: &'a WalkRules) -> Self {
        Self { rules }
    }

    /// Starts a new traversal of `root`. Each call walks the tree again.
    pub fn walk(&self, root: &Path) -> Walk<'a> {
        self.walk_from(root, root, self.rules.max_depth)
    }

    /// Like [`walk`](Self::walk), but never descends into the directory
    /// `pruned`. Files inside it are not yielded.
    pub fn walk_pruned(&self, root: &Path, pruned: &Path) -> Walk<'a> {
        let mut walk = self.walk(root);
        walk.pruned = Some(pruned.to_path_buf());
        walk
    }

    /// Counts the files a walk of `root` would yield from inside `subtree`.
    ///
    /// Returns 0 when `subtree` is not strictly below `root`, is missing, or
    /// would be skipped by the rules or the depth limit.
    pub fn count_below(&self, root: &Path, subtree: &Path) -> usize {
        let Ok(relative) = subtree.strip_prefix(root) else {
            return 0;
        };
        if relative.as_os_str().is_empty() || !subtree.is_dir() {
            return 0;
        }

        let mut reached = PathBuf::new();
        for component in relative.components() {
            reached.push(component);
            let name = component.as_os_str().to_string_lossy();
            if self.rules.is_ignored(&name, &reached) {
                return 0;
            }
        }

        let depth = relative.components().count();
        let max_depth = match self.rules.max_depth {
            Some(max) if max < depth => return 0,
            Some(max) => Some(max - depth),
            None => None,
        };
        self.walk_from(root, subtree, max_depth)
            .filter(Result::is_ok)
            .count()
    }

    /// Walks `start`, matching globs against paths relative to `root`.
    fn walk_from(&self, root: &Path, start: &Path, max_depth: Option<usize>) -> Walk<'a> {
        let mut walker = WalkDir::new(start).follow_links(false).sort_by_file_name();
        if let Some(depth) = max_depth {
            // walkdir puts the start at depth 0 and its files at depth 1.
            walker = walker.max_depth(depth.saturating_add(1));
        }

        Walk {
            root: root.to_path_buf(),
            inner: walker.into_iter(),
            rules: self.rules,
            pruned: None,
        }
    }
}

/// Iterator returned by [`TreeWalker::walk`].
pub struct Walk<'a> {
    root: PathBuf,
    inner: walkdir::IntoIter,
    rules: &'a WalkRules,
    pruned: Option<PathBuf>,
}

impl Walk<'_> {
    fn error(&self, source: walkdir::Error) -> WalkError {
        let path = source
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        WalkError { path, source }
    }
}

impl Iterator for Walk<'_> {
    type Item = Result<FileEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(self.error(e))),
            };

            if entry.depth() > 0 {
                if entry.file_type().is_dir() && self.pruned.as_deref() == Some(entry.path()) {
                    self.inner.skip_current_dir();
                    continue;
                }

                let name = entry.file_name().to_string_lossy();
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path());
                if self.rules.is_ignored(&name, relative) {
                    if entry.file_type().is_dir() {
                        self.inner.skip_current_dir();
                    }
                    continue;
                }
            }

            if !entry.file_type().is_file() {
                continue;
            }

            return Some(match entry.metadata() {
                Ok(metadata) => Ok(FileEntry::new(entry.into_path(), metadata.len())),
                Err(e) => Err(self.error(e)),
            });
        }
    }
}
