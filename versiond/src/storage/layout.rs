//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Where versiond keeps its files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Service settings (log level, bind address, build rules)
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Operator-editable repository configuration
    pub fn config_file(&self) -> File {
        File::new(self.base_dir.join("config.runtime.json"))
    }

    /// Get the base directory
    pub fn base(&self) -> Dir {
        Dir::new(&self.base_dir)
    }

    /// Create the base directory
    pub async fn setup(&self) -> Result<(), crate::errors::VersiondError> {
        self.base().create().await
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".versiond");

        Self::new(base_dir)
    }
}
