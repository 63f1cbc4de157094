//! Fixed filesystem layout for a host installation.

use std::path::{Path, PathBuf};

/// Immutable description of where the host keeps its files.
///
/// Supplied once at construction; every derived path is computed from the
/// root so relocating an installation is a single-value change.
#[derive(Debug, Clone)]
pub struct ApplicationPaths {
    root: PathBuf,
}

impl ApplicationPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the persisted configuration document.
    pub fn config_file(&self) -> PathBuf {
        self.root.join("server-config.json")
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }
}
