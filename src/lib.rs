//! tidytree - sort a directory tree into category folders by file extension
//!
//! This library provides an extension-based category table, a tree walker with
//! ignore rules and a depth limit, a collision-free path allocator, and an
//! engine that scans or organizes a tree while collecting per-file errors
//! instead of stopping on them. Configuration is read from TOML files.

pub mod category;
pub mod cli;
pub mod config;
pub mod organizer;
pub mod output;
pub mod path_allocator;
pub mod walker;

pub use category::{Category, CategoryTable, OTHER_CATEGORY};
pub use config::{ConfigError, OrganizerConfig};
pub use organizer::{
    CategorySummary, FileError, FileErrorKind, OrganizeError, OrganizeOutcome, Organizer,
    RunReport, ScanReport,
};
pub use walker::{FileEntry, TreeWalker, WalkRules};

pub use cli::{Cli, OrganizeCommand, run_cli};
