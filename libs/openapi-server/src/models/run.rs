//! Run result models

use serde::{Deserialize, Serialize};

use crate::models::progress::{Phase, PhaseStatus};

/// Failure taxonomy for a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseErrorKind {
    /// Component name does not resolve to a working copy
    NotFound,
    /// Branch resolution, checkout or update failed
    SyncFailure,
    /// Build command could not be started
    ProcessLaunchFailure,
    /// A command ran and returned a nonzero status
    NonZeroExit,
    /// Build produced nothing matching the artifact pattern
    NoArtifact,
    /// Delete or copy failed during deployment
    #[serde(rename = "DeployIOFailure")]
    DeployIoFailure,
}

/// A recorded phase failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseError {
    pub kind: PhaseErrorKind,
    pub message: String,
}

impl PhaseError {
    pub fn new(kind: PhaseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PhaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Outcome of one external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub cmd: String,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandRecord {
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// One orchestration phase of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStep {
    pub phase: Phase,
    pub status: PhaseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Output accumulated while the phase ran
    #[serde(default)]
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PhaseError>,
}

impl PhaseStep {
    pub fn pending(phase: Phase) -> Self {
        Self {
            phase,
            status: PhaseStatus::Pending,
            detail: None,
            output: String::new(),
            artifact_path: None,
            branch: None,
            error: None,
        }
    }
}

/// Final outcome for one requested component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub repo: String,
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default)]
    pub steps: Vec<CommandRecord>,

    #[serde(default)]
    pub phases: Vec<PhaseStep>,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,

    #[serde(default)]
    pub build_ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub war_path: Option<String>,

    #[serde(default)]
    pub deploy_ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PhaseError>,
}

impl RunResult {
    pub fn empty(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ok: false,
            branch: None,
            steps: Vec::new(),
            phases: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            build_ok: false,
            war_path: None,
            deploy_ok: false,
            deploy_error: None,
            error: None,
        }
    }

    /// Find the recorded step for a phase
    pub fn phase(&self, phase: Phase) -> Option<&PhaseStep> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}
