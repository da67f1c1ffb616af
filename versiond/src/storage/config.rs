//! Repository configuration store
//!
//! Holds the base directories that contain working copies and the per-base
//! ignore lists. The store is an explicit value handed to whoever needs it;
//! readers take a [`RepoConfig`] snapshot, writers replace the whole document
//! and persist it before the new value becomes visible.

use openapi_server::models::{RepoConfig, RepoConfigPatch};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::VersiondError;
use crate::filesys::file::File;

pub struct ConfigStore {
    file: File,
    current: RwLock<RepoConfig>,
}

impl ConfigStore {
    /// Load the store, merging the on-disk overrides (if any) over `defaults`.
    ///
    /// A file that does not parse is moved to `<name>.bak` so the next
    /// persist cannot overwrite what the operator wrote.
    pub async fn load(file: File, defaults: RepoConfig) -> Self {
        let current = if file.exists().await {
            match file.read_json::<RepoConfigPatch>().await {
                Ok(patch) => defaults.merged(patch),
                Err(e) => {
                    warn!("Failed to load runtime config {}: {}", file.path().display(), e);
                    if let VersiondError::JsonError(_) = e {
                        match file.backup().await {
                            Ok(backup) => warn!("Kept unreadable runtime config as {}", backup.path().display()),
                            Err(e) => warn!("Failed to back up runtime config: {}", e),
                        }
                    }
                    defaults
                }
            }
        } else {
            defaults
        };

        info!(
            "Runtime config path: {} ({} base paths)",
            file.path().display(),
            current.base_paths.len()
        );

        Self {
            file,
            current: RwLock::new(current),
        }
    }

    /// A consistent copy of the current configuration
    pub async fn snapshot(&self) -> RepoConfig {
        self.current.read().await.clone()
    }

    /// Replace the configuration and persist it
    pub async fn update(&self, next: RepoConfig) -> Result<RepoConfig, VersiondError> {
        let mut current = self.current.write().await;
        self.file.write_json(&next).await?;
        *current = next;
        Ok(current.clone())
    }

    /// Write the current configuration to disk
    pub async fn persist(&self) -> Result<(), VersiondError> {
        let current = self.current.read().await;
        self.file.write_json(&*current).await
    }
}
