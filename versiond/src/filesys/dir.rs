//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::VersiondError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// True when the directory holds a `.git` directory
    pub async fn is_working_copy(&self) -> bool {
        self.subdir(".git").exists().await
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), VersiondError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Names of the regular files in the directory, in enumeration order
    pub async fn file_names(&self) -> Result<Vec<String>, VersiondError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        Ok(names)
    }

    /// Names of the subdirectories, sorted
    pub async fn dir_names(&self) -> Result<Vec<String>, VersiondError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }
}
