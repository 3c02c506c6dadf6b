use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identifier of a servable document: the textual form of its filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self(unique_id.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    /// Like [`DocId::from_path`] but refuses paths that are not valid UTF-8,
    /// whose lossy form would no longer name the same file.
    pub fn try_from_path(path: &Path) -> Option<Self> {
        path.to_str().map(Self::new)
    }

    pub fn unique_id(&self) -> &str {
        &self.0
    }

    /// Parses the identifier back into a path. No normalization is applied,
    /// so `..` and `.` segments survive as written.
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
