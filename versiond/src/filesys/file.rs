//! File operations

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::VersiondError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, VersiondError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, VersiondError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Write JSON to file, replacing it atomically
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), VersiondError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_atomic(contents.as_bytes()).await
    }

    /// Atomic write using a temporary file
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), VersiondError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Copy this file into `dir`, keeping its file name
    pub async fn copy_into(&self, dir: &Path) -> Result<File, VersiondError> {
        let name = self.path.file_name().ok_or_else(|| {
            VersiondError::StorageError(format!("No file name: {}", self.path.display()))
        })?;
        let dest = dir.join(name);
        fs::copy(&self.path, &dest).await?;
        Ok(File::new(dest))
    }

    /// Move the file aside to `<name>.bak`, replacing any earlier backup
    pub async fn backup(&self) -> Result<File, VersiondError> {
        let name = self.path.file_name().ok_or_else(|| {
            VersiondError::StorageError(format!("No file name: {}", self.path.display()))
        })?;
        let mut backup_name = name.to_os_string();
        backup_name.push(".bak");
        let dest = self.path.with_file_name(backup_name);
        fs::rename(&self.path, &dest).await?;
        Ok(File::new(dest))
    }

    /// Delete the file
    pub async fn delete(&self) -> Result<(), VersiondError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}
