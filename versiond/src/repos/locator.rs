//! Resolving component names to working copies

use std::path::PathBuf;

use async_trait::async_trait;
use openapi_server::models::RepoConfig;
use tracing::debug;

use crate::filesys::dir::Dir;
use crate::storage::settings::BuildSettings;

/// Decides which build command and working directory apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Standard,
    MultiModule,
}

/// A resolved source component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub kind: ComponentKind,
}

#[async_trait]
pub trait ComponentLocator: Send + Sync {
    /// Resolve `name` to a working copy, if there is one
    async fn resolve(&self, name: &str) -> Option<ComponentDescriptor>;
}

/// Looks for `<base>/<name>` under each configured base path, in order
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    base_paths: Vec<PathBuf>,
    multi_module: Vec<String>,
}

impl ConfigLocator {
    pub fn new(config: &RepoConfig, build: &BuildSettings) -> Self {
        Self {
            base_paths: config.base_paths.iter().map(PathBuf::from).collect(),
            multi_module: build.multi_module_components.clone(),
        }
    }

    pub fn kind_of(&self, name: &str) -> ComponentKind {
        if self.multi_module.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            ComponentKind::MultiModule
        } else {
            ComponentKind::Standard
        }
    }
}

#[async_trait]
impl ComponentLocator for ConfigLocator {
    async fn resolve(&self, name: &str) -> Option<ComponentDescriptor> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return None;
        }

        for base in &self.base_paths {
            let candidate = Dir::new(base.join(name));
            if candidate.is_working_copy().await {
                debug!("Resolved {} to {}", name, candidate.path().display());
                return Some(ComponentDescriptor {
                    name: name.to_string(),
                    path: candidate.path().to_path_buf(),
                    kind: self.kind_of(name),
                });
            }
        }

        None
    }
}
