use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::DirEntry;

use crate::utils::target_paths;

/// Classification of one directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, devices, sockets, fifos. Never followed, never copied.
    Other,
}

/// A filesystem node discovered during traversal. Transient: classified and
/// dispatched immediately, never retained after the directory listing that
/// produced it.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl SourceEntry {
    /// Classify a directory entry without following symlinks. A symlink to a
    /// directory still comes back as `Other`.
    pub async fn from_dir_entry(entry: &DirEntry) -> io::Result<Self> {
        let file_type = entry.file_type().await?;

        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Ok(Self {
            path: entry.path(),
            kind,
        })
    }
}

/// The (source, target) pairing one transfer executes. The target is always
/// one bucket level below the destination root; the category folder must be
/// materialized before the byte stream opens.
#[derive(Debug, Clone)]
pub struct CopyTask {
    pub source: PathBuf,
    pub category_dir: PathBuf,
    pub target: PathBuf,
}

impl CopyTask {
    pub fn new(destination_root: &Path, source: PathBuf) -> Self {
        let (category_dir, target) = target_paths(destination_root, &source);
        Self {
            source,
            category_dir,
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_task_layout() {
        let task = CopyTask::new(Path::new("/dest"), PathBuf::from("/src/sub/c.md"));
        assert_eq!(task.category_dir, Path::new("/dest/md"));
        assert_eq!(task.target, Path::new("/dest/md/c.md"));
    }
}
