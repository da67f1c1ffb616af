//! Replacing deployed artifacts

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::deploy::artifact::ArtifactName;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// What a deployment pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOutcome {
    /// Paths of the copied artifacts inside the deployment directory
    pub deployed: Vec<PathBuf>,
    /// File names removed from the deployment directory
    pub removed: Vec<String>,
    pub errors: Vec<String>,
    pub attempted: usize,
}

impl DeployOutcome {
    /// Every artifact was copied
    pub fn ok(&self) -> bool {
        self.attempted > 0 && self.deployed.len() == self.attempted
    }

    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("; "))
        }
    }
}

/// Deploy `artifacts` into `deploy_dir`, replacing older files of the same component.
///
/// Artifacts are processed independently; a failure is recorded and the
/// remaining artifacts are still attempted.
pub async fn deploy_artifacts(artifacts: &[PathBuf], deploy_dir: &Path) -> DeployOutcome {
    let mut outcome = DeployOutcome {
        attempted: artifacts.len(),
        ..Default::default()
    };

    let dir = Dir::new(deploy_dir);
    if !dir.exists().await {
        outcome
            .errors
            .push(format!("Deployment folder not found: {}", deploy_dir.display()));
        return outcome;
    }

    for artifact in artifacts {
        match deploy_one(artifact, &dir, &mut outcome.removed).await {
            Ok(path) => {
                info!("Deployed {} to {}", artifact.display(), deploy_dir.display());
                outcome.deployed.push(path);
            }
            Err(e) => {
                warn!("Failed to deploy {}: {}", artifact.display(), e);
                outcome.errors.push(e);
            }
        }
    }

    outcome
}

async fn deploy_one(artifact: &Path, dir: &Dir, removed: &mut Vec<String>) -> Result<PathBuf, String> {
    let source = File::new(artifact);
    if !source.exists().await {
        return Err(format!("Artifact not found: {}", artifact.display()));
    }

    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Not a file path: {}", artifact.display()))?;
    let name = ArtifactName::parse(&file_name)
        .ok_or_else(|| format!("Not a versioned artifact: {}", file_name))?;

    let existing = dir
        .file_names()
        .await
        .map_err(|e| format!("Failed to list {}: {}", dir.path().display(), e))?;

    for old in existing {
        let same = ArtifactName::parse(&old).is_some_and(|o| o.same_component(&name));
        if !same {
            continue;
        }
        dir.file(&old)
            .delete()
            .await
            .map_err(|e| format!("Failed to remove {}: {}", old, e))?;
        removed.push(old);
    }

    let copied = source
        .copy_into(dir.path())
        .await
        .map_err(|e| format!("Failed to copy {}: {}", file_name, e))?;

    Ok(copied.path().to_path_buf())
}
