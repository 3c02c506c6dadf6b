use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration key holding the filesystem root to serve.
pub const CONFIG_SRC: &str = "filesystemadaptor.src";

pub const DEFAULT_DOC_ID_BASE: &str = "http://localhost:5678/doc/";

/// Values read from a connector configuration file.
///
/// The file is YAML (JSON also parses) with dotted keys:
///
/// ```yaml
/// filesystemadaptor.src: /srv/docs
/// server.docIdBase: http://localhost:5678/doc/
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    #[serde(rename = "filesystemadaptor.src", default)]
    pub src: Option<String>,

    #[serde(rename = "server.docIdBase", default)]
    pub doc_id_base: Option<String>,
}

impl ConnectorConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&content)
    }
}

/// The configured root of the served subtree. Fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPath(PathBuf);

impl RootPath {
    /// Validates the configured root value and resolves it to an absolute path.
    ///
    /// The path is made absolute against the working directory but is not
    /// canonicalized: symlinks and `..` segments are kept as given.
    pub fn from_config(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::Config(format!(
                "The configuration value {} is empty. Please specify a valid root path.",
                CONFIG_SRC
            )));
        }
        let path = std::path::absolute(source)?;
        if !is_supported_path(&path) {
            return Err(Error::Config(format!(
                "The path {} is not a valid path.",
                path.display()
            )));
        }
        log::debug!("rootPath: {}", path.display());
        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// A path can be served when it is a regular file or a directory.
/// Symlinks are followed; sockets, devices, pipes and dangling links are not servable.
pub fn is_supported_path(path: &Path) -> bool {
    path.is_file() || path.is_dir()
}
