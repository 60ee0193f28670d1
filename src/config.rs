//! Organizer configuration.
//!
//! Configuration is read from a TOML file and turned into the two values the
//! engine consumes: a [`CategoryTable`] and a set of [`WalkRules`]. Every key
//! is optional; anything left out takes its default.
//!
//! # Configuration File Format
//!
//! ```toml
//! ignore_hidden = true
//! ignore_patterns = [".git", ".DS_Store", "Thumbs.db"]
//! ignore_globs = ["node_modules"]
//! ignore_regex = ['^~\$']
//! max_depth = -1
//!
//! [[categories]]
//! name = "images"
//! extensions = [".jpg", ".png"]
//!
//! [[categories]]
//! name = "documents"
//! extensions = [".pdf", ".txt"]
//! ```
//!
//! Categories are matched in the order they appear in the file.

use crate::category::{Category, CategoryTable};
use crate::walker::WalkRules;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".tidytree.toml";

/// Errors that can occur while loading, saving, or compiling configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// IO error while reading or writing configuration.
    #[error("IO error on configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML.
    #[error("Could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid glob pattern in `ignore_globs`.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    /// Invalid regex pattern in `ignore_regex`.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// A category name that cannot be used as a directory name.
    #[error("Invalid category name '{0}': must be a single, non-empty path component")]
    InvalidCategory(String),
}

/// One `[[categories]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Everything a run can be configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Skip files and directories whose name starts with `.`.
    pub ignore_hidden: bool,

    /// Exact file or directory names to skip.
    pub ignore_patterns: Vec<String>,

    /// Glob patterns, matched against paths relative to the scanned root.
    pub ignore_globs: Vec<String>,

    /// Regexes matched against file and directory names.
    pub ignore_regex: Vec<String>,

    /// Directory levels below the root to descend; negative means unlimited.
    pub max_depth: i64,

    /// Categories in lookup order. Kept last so it serializes after the
    /// plain keys.
    pub categories: Vec<CategoryConfig>,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        let categories = CategoryTable::default()
            .categories()
            .map(|category| CategoryConfig {
                name: category.name().to_string(),
                extensions: category.extensions().map(str::to_string).collect(),
            })
            .collect();

        Self {
            ignore_hidden: true,
            ignore_patterns: vec![
                ".git".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
            ],
            ignore_globs: Vec::new(),
            ignore_regex: Vec::new(),
            max_depth: -1,
            categories,
        }
    }
}

impl OrganizerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.tidytree.toml` in the current directory
    /// 3. Look for `~/.config/tidytree/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file does not exist, or if
    /// the file that was found cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(home_config) = Self::user_config_path()
            && home_config.exists()
        {
            return Self::load_from_file(&home_config);
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Like [`load`](Self::load), but never fails: any problem is logged and
    /// the default configuration is used instead.
    pub fn load_or_default(config_path: Option<&Path>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("{}; using default configuration", e);
            Self::default()
        })
    }

    /// The per-user configuration file, if a home directory is known.
    pub fn user_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("tidytree")
                .join("config.toml")
        })
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(toml::from_str(&content)?)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Adds a category, or replaces the extensions of an existing one while
    /// keeping its position in the lookup order.
    pub fn add_category(&mut self, name: &str, extensions: Vec<String>) {
        match self.categories.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.extensions = extensions,
            None => self.categories.push(CategoryConfig {
                name: name.to_string(),
                extensions,
            }),
        }
    }

    /// Builds the category table the engine classifies with.
    ///
    /// Extensions listed under more than one category are logged; the first
    /// category in file order keeps them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCategory`] for names that are empty,
    /// `.` or `..`, or that contain a path separator.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        let categories = self
            .categories
            .iter()
            .map(|category| {
                validate_category_name(&category.name)?;
                Ok(Category::new(category.name.clone(), &category.extensions))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let table = CategoryTable::new(categories);
        for (ext, winner, shadowed) in table.duplicate_extensions() {
            warn!(
                extension = %ext,
                "Extension listed under both '{}' and '{}'; '{}' wins",
                winner,
                shadowed,
                winner
            );
        }
        Ok(table)
    }

    /// Compiles the ignore rules and depth limit for the tree walker.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn walk_rules(&self) -> Result<WalkRules, ConfigError> {
        let ignore_globs = self
            .ignore_globs
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlob {
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ignore_regexes = self
            .ignore_regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WalkRules {
            ignore_hidden: self.ignore_hidden,
            ignore_names: self.ignore_patterns.iter().cloned().collect(),
            ignore_globs,
            ignore_regexes,
            max_depth: usize::try_from(self.max_depth).ok(),
        })
    }
}

fn validate_category_name(name: &str) -> Result<(), ConfigError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(ConfigError::InvalidCategory(name.to_string()));
    }
    Ok(())
}
