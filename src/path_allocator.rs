//! Collision-free destination naming.
//!
//! When the desired destination is already taken, the allocator probes
//! `stem_1.ext`, `stem_2.ext`, ... in the same directory and returns the first
//! free candidate. The check is advisory: nothing stops another process from
//! creating the path between allocation and the move.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns `desired` if nothing exists there, otherwise the first numbered
/// variant that does not exist.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tidytree::path_allocator::allocate;
///
/// // With /tmp/out/photo.jpg already present this yields /tmp/out/photo_1.jpg.
/// let path = allocate(Path::new("/tmp/out/photo.jpg"));
/// println!("{}", path.display());
/// ```
pub fn allocate(desired: &Path) -> PathBuf {
    allocate_with(desired, is_occupied)
}

/// Returns true if any directory entry exists at `path`.
///
/// Symlinks are not followed, so a dangling link counts as occupied.
pub fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Same algorithm as [`allocate`], but asks `is_taken` whether a candidate is
/// occupied instead of the filesystem.
pub fn allocate_with<F>(desired: &Path, mut is_taken: F) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    if !is_taken(desired) {
        return desired.to_path_buf();
    }

    let stem = desired.file_stem().map(OsString::from).unwrap_or_default();
    let extension = desired.extension();

    (1u64..)
        .map(|counter| {
            let mut name = stem.clone();
            name.push(format!("_{}", counter));
            if let Some(ext) = extension {
                name.push(".");
                name.push(ext);
            }
            desired.with_file_name(name)
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| desired.to_path_buf())
}
