use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::Result;

/// Kind of a filesystem entry after following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Other,
}

/// Per-request snapshot of an entry's basic attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocAttributes {
    pub created: SystemTime,
    pub modified: SystemTime,
    pub accessed: SystemTime,
    pub size: u64,
}

/// Minimal filesystem abstraction used to serve documents
pub trait FileBackend {
    /// Classify a path, following symlinks
    fn kind(&self, path: &Path) -> FileKind;

    /// Read creation, modification and access times plus size
    fn attributes(&self, path: &Path) -> Result<DocAttributes>;

    /// Open a file for reading; dropping the reader closes it
    fn open(&self, path: &Path) -> Result<Box<dyn Read>>;

    /// List the immediate children of a directory in the order the filesystem yields them
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Overwrite the last access time of an entry
    fn set_last_access_time(&self, path: &Path, time: SystemTime) -> Result<()>;

    /// Best-effort content type guess
    fn probe_content_type(&self, path: &Path) -> Option<String>;
}

pub mod native;
