//! # Scanner
//!
//! Lazily walks a subtree of the archive depth-first and yields every media
//! file in it. Hidden directories (basename starting with `.`) below the scan
//! root are pruned: neither they nor anything beneath them is visited.
//! Symlinks are not followed.

use std::path::{Path, PathBuf};

use log::trace;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, SyncError};

/// Extension of the files the catalog tracks, compared case-insensitively
pub const MEDIA_EXTENSION: &str = "mp3";

pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MEDIA_EXTENSION))
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    // The scan root itself is never pruned
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().as_encoded_bytes().starts_with(b".")
}

/// Media files under `scan_root`, produced on demand. Each call starts a
/// fresh walk.
///
/// # Errors
///
/// Yields [`SyncError::Walk`] for entries that cannot be read, including a
/// missing `scan_root`.
pub fn walk(scan_root: &Path) -> impl Iterator<Item = Result<PathBuf>> {
    WalkDir::new(scan_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let hidden = is_hidden_dir(entry);
            if hidden {
                trace!("Pruning hidden directory {}", entry.path().display());
            }
            !hidden
        })
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) => is_media_file(entry.path()).then(|| Ok(entry.into_path())),
            Err(err) => Some(Err(SyncError::Walk(err))),
        })
}

/// Collect [`walk`] into a list, stopping at the first error.
pub fn list_candidates(scan_root: &Path) -> Result<Vec<PathBuf>> {
    walk(scan_root).collect()
}
