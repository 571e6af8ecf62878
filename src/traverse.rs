//! Flattens dropped files and folders into a list of leaf files.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::media::METADATA_PREFIX;

/// One node of a drop payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropEntry {
    File(PathBuf),
    Directory(PathBuf),
}

impl DropEntry {
    /// Classifies a dropped path. A path that vanished before it could be
    /// inspected is reported as a file and fails later, on its own.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else {
            Self::File(path)
        }
    }
}

/// Walks every entry depth-first and returns the files it contains.
///
/// Directory listings keep whatever order the OS returns them in; the final
/// order is decided later by the archive expander's sort. An entry that
/// cannot be read is logged and skipped without affecting its siblings.
pub fn collect_files(entries: &[DropEntry]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in entries {
        match entry {
            DropEntry::File(path) => files.push(path.clone()),
            DropEntry::Directory(dir) => walk_directory(dir, &mut files),
        }
    }
    debug!("Traversal produced {} files", files.len());
    files
}

fn walk_directory(dir: &Path, files: &mut Vec<PathBuf>) {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_metadata_dir(e));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                let at = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| dir.display().to_string());
                warn!("Skipping unreadable entry {}: {}", at, e);
            }
        }
    }
}

fn is_metadata_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with(METADATA_PREFIX)
}
