//! Listing the components available under the configured base paths

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use openapi_server::models::{FolderEntry, FoldersResponse, RepoConfig, ReposResponse};
use regex::Regex;
use tracing::debug;

use crate::errors::VersiondError;
use crate::filesys::dir::Dir;
use crate::storage::settings::BuildSettings;

static POM_PARENT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<parent>.*?<version>([^<]+)</version>.*?</parent>")
        .expect("constant regex pattern is valid")
});

/// Which optional parts of the listing to compute
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryOptions {
    /// Skip the ignore list
    pub raw: bool,
    /// Report which base paths provide each component
    pub sources: bool,
    /// Detect each component's declared version
    pub versions: bool,
}

/// Working copies directly under `base`, sorted
pub async fn working_copies_under(base: &Dir) -> Vec<String> {
    let Ok(names) = base.dir_names().await else {
        return Vec::new();
    };

    let mut repos = Vec::new();
    for name in names {
        if base.subdir(&name).is_working_copy().await {
            repos.push(name);
        }
    }
    repos
}

/// Version declared by a component: the `<parent>` version of the module
/// POM for multi-module components, else `package.json`.
pub async fn detect_version(path: &Path, name: &str, build: &BuildSettings) -> Option<String> {
    let dir = Dir::new(path);

    if build.is_multi_module(name) {
        let pom = dir.subdir(&build.module_dir).file("pom.xml");
        if let Ok(xml) = pom.read_string().await {
            if let Some(version) = POM_PARENT_VERSION
                .captures(&xml)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|v| !v.is_empty())
            {
                return Some(version);
            }
        }
    }

    let package = dir.file("package.json");
    let value: serde_json::Value = package.read_json().await.ok()?;
    value.get("version")?.as_str().map(str::to_string)
}

#[derive(Default)]
struct Listing {
    repos: BTreeSet<String>,
    ignored: Vec<String>,
    sources: BTreeMap<String, BTreeSet<String>>,
    versions: BTreeMap<String, BTreeSet<String>>,
}

impl Listing {
    async fn add(
        &mut self,
        name: &str,
        path: &Path,
        base: &str,
        options: DiscoveryOptions,
        build: &BuildSettings,
    ) {
        self.repos.insert(name.to_string());
        if options.sources {
            self.sources
                .entry(name.to_string())
                .or_default()
                .insert(base.to_string());
        }
        if options.versions {
            if let Some(version) = detect_version(path, name, build).await {
                self.versions.entry(name.to_string()).or_default().insert(version);
            }
        }
    }
}

/// List components across all base paths.
///
/// The ignore list only applies to the first base path, and is skipped
/// entirely in raw mode. A base path that is itself a working copy is listed
/// under its own folder name.
pub async fn list_components(
    config: &RepoConfig,
    build: &BuildSettings,
    options: DiscoveryOptions,
) -> ReposResponse {
    let mut listing = Listing::default();
    let first_base = config.base_paths.first();

    for base in &config.base_paths {
        let dir = Dir::new(base);
        if !dir.exists().await {
            debug!("Skipping missing base path {}", base);
            continue;
        }

        let ignore: Vec<String> = if options.raw || Some(base) != first_base {
            Vec::new()
        } else {
            config
                .ignore
                .get(base)
                .map(|names| names.iter().map(|n| n.to_lowercase()).collect())
                .unwrap_or_default()
        };

        let mut candidates: Vec<(String, std::path::PathBuf)> = working_copies_under(&dir)
            .await
            .into_iter()
            .map(|name| {
                let path = dir.path().join(&name);
                (name, path)
            })
            .collect();

        if dir.is_working_copy().await {
            if let Some(name) = dir.path().file_name().map(|n| n.to_string_lossy().into_owned()) {
                candidates.push((name, dir.path().to_path_buf()));
            }
        }

        for (name, path) in candidates {
            if ignore.contains(&name.to_lowercase()) {
                debug!("Ignoring {} under {}", name, base);
                listing.ignored.push(name);
                continue;
            }
            listing.add(&name, &path, base, options, build).await;
        }
    }

    debug!("Discovered components: {:?}", listing.repos);

    ReposResponse {
        repos: listing.repos.into_iter().collect(),
        raw: options.raw,
        ignored: listing.ignored,
        sources: options.sources.then(|| {
            listing
                .sources
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect()
        }),
        versions: options.versions.then(|| {
            listing
                .versions
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect::<Vec<_>>().join(" | ")))
                .collect()
        }),
    }
}

/// Raw listing of one configured base path, ignore list included but not applied
pub async fn list_folders(
    config: &RepoConfig,
    build: &BuildSettings,
    base: &str,
) -> Result<FoldersResponse, VersiondError> {
    if base.is_empty() || !config.base_paths.iter().any(|b| b == base) {
        return Err(VersiondError::ValidationError("Invalid base path".to_string()));
    }

    let dir = Dir::new(base);
    let folders = working_copies_under(&dir).await;

    let mut repos = Vec::with_capacity(folders.len() + 1);
    for name in &folders {
        repos.push(FolderEntry {
            name: name.clone(),
            version: detect_version(&dir.path().join(name), name, build).await,
        });
    }
    if dir.is_working_copy().await {
        if let Some(name) = dir.path().file_name().map(|n| n.to_string_lossy().into_owned()) {
            if !repos.iter().any(|r| r.name == name) {
                let version = detect_version(dir.path(), &name, build).await;
                repos.push(FolderEntry { name, version });
            }
        }
    }

    Ok(FoldersResponse {
        base: base.to_string(),
        folders,
        repos,
        ignore: config.ignore.get(base).cloned().unwrap_or_default(),
    })
}
