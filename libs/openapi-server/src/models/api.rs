//! Request and response bodies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::run::RunResult;

/// Start versioning request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub repos: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_folder_path: Option<String>,
}

/// Start versioning response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub results: Vec<RunResult>,
}

/// Deployed versions query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployedVersionsQuery {
    pub path: Option<String>,
}

/// Deployed versions response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedVersionsResponse {
    pub path: String,
    /// Number of files carrying the artifact extension
    pub count: usize,
    pub versions: BTreeMap<String, String>,
}

/// Debug log query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugLogQuery {
    pub since: Option<i64>,
}

/// Debug log response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugLogResponse {
    pub lines: Vec<String>,
    pub total: usize,
    pub since: i64,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub pid: u32,
    pub time: String,
    pub base_paths: Vec<String>,
    pub version: String,
}

/// Component listing query; each flag is enabled by its presence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReposQuery {
    pub raw: Option<String>,
    pub sources: Option<String>,
    pub versions: Option<String>,
}

/// Component listing response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReposResponse {
    pub repos: Vec<String>,
    pub raw: bool,
    pub ignored: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeMap<String, Vec<String>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<BTreeMap<String, String>>,
}

/// Repository configuration: where working copies live and which to hide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    #[serde(default)]
    pub base_paths: Vec<String>,

    /// Base path -> folder names to ignore (case-insensitive)
    #[serde(default)]
    pub ignore: BTreeMap<String, Vec<String>>,
}

impl RepoConfig {
    /// Replace the fields present in `patch`
    pub fn merged(mut self, patch: RepoConfigPatch) -> Self {
        if let Some(base_paths) = patch.base_paths {
            self.base_paths = base_paths;
        }
        if let Some(ignore) = patch.ignore {
            self.ignore = ignore;
        }
        self
    }
}

/// Partial repository configuration, used for updates and on-disk overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_paths: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<BTreeMap<String, Vec<String>>>,
}

/// Folder listing query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldersQuery {
    pub base: Option<String>,
}

/// A working copy under a base path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Unfiltered listing of one base path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldersResponse {
    pub base: String,
    pub folders: Vec<String>,
    pub repos: Vec<FolderEntry>,
    /// Configured ignore list for this base, not applied
    pub ignore: Vec<String>,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
