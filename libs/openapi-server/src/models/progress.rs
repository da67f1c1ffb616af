//! Progress feed models

use serde::{Deserialize, Serialize};

/// Orchestration phase applied to every component, in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Sync,
    Build,
    Deploy,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Sync, Phase::Build, Phase::Deploy];

    /// Step label shown by progress views
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Sync => "Checkout master",
            Phase::Build => "Build",
            Phase::Deploy => "Deploy WAR",
        }
    }
}

/// Status of a single phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Success,
    Error,
}

impl PhaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PhaseStatus::Success | PhaseStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Running => "running",
            PhaseStatus::Success => "success",
            PhaseStatus::Error => "error",
        }
    }
}

/// A transient notification published to every attached observer.
///
/// `stdout`/`stderr` carry either the cumulative output of the running
/// process or a single newly appended line; both are sent as separate events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub repo: String,
    pub step: String,
    pub phase: Phase,
    pub status: PhaseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub war_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ProgressEvent {
    pub fn new(repo: impl Into<String>, phase: Phase, status: PhaseStatus) -> Self {
        Self {
            repo: repo.into(),
            step: phase.label().to_string(),
            phase,
            status,
            detail: None,
            stdout: None,
            stderr: None,
            war_path: None,
            branch: None,
        }
    }

    /// True when the event only carries process output
    pub fn is_output(&self) -> bool {
        self.stdout.is_some() || self.stderr.is_some()
    }
}
