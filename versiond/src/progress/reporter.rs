//! Per-phase progress reporting
//!
//! A [`PhaseReporter`] owns the phase's state machine, so every event it
//! publishes corresponds to an accepted transition: zero or more `running`
//! events, then exactly one terminal event when it is consumed.

use openapi_server::models::{Phase, PhaseError, PhaseStatus, PhaseStep, ProgressEvent};
use tracing::warn;

use crate::deploy::fsm::{PhaseEvent, PhaseFsm};
use crate::progress::hub::ProgressHub;

/// Optional event payload
#[derive(Debug, Clone, Default)]
pub struct PhaseUpdate {
    pub detail: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub war_path: Option<String>,
    pub branch: Option<String>,
}

impl PhaseUpdate {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: Some(stdout.into()),
            ..Default::default()
        }
    }

    pub fn stderr(stderr: impl Into<String>) -> Self {
        Self {
            stderr: Some(stderr.into()),
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_war_path(mut self, war_path: impl Into<String>) -> Self {
        self.war_path = Some(war_path.into());
        self
    }

    /// Attach output, skipping empty text
    pub fn with_output(mut self, stdout: &str, stderr: &str) -> Self {
        self.stdout = non_empty(stdout);
        self.stderr = non_empty(stderr);
        self
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub struct PhaseReporter<'a> {
    hub: &'a ProgressHub,
    repo: &'a str,
    fsm: PhaseFsm,
}

impl<'a> PhaseReporter<'a> {
    /// Start `phase` and announce it
    pub fn begin(hub: &'a ProgressHub, repo: &'a str, phase: Phase, update: PhaseUpdate) -> Self {
        let mut reporter = Self {
            hub,
            repo,
            fsm: PhaseFsm::new(phase),
        };
        reporter.transition(PhaseEvent::Start, update);
        reporter
    }

    pub fn phase(&self) -> Phase {
        self.fsm.phase()
    }

    pub fn repo(&self) -> &str {
        self.repo
    }

    /// Publish a `running` event
    pub fn progress(&mut self, update: PhaseUpdate) {
        self.transition(PhaseEvent::Progress, update);
    }

    /// Append text to the phase's accumulated output
    pub fn append_output(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let output = &mut self.fsm.step_mut().output;
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(text);
    }

    /// Finish the phase successfully
    pub fn succeed(mut self, update: PhaseUpdate) -> PhaseStep {
        self.record(&update);
        self.transition(PhaseEvent::Succeed, update);
        self.fsm.into_step()
    }

    /// Finish the phase with an error
    pub fn fail(mut self, error: PhaseError, mut update: PhaseUpdate) -> PhaseStep {
        if update.detail.is_none() {
            update.detail = Some(error.message.clone());
        }
        self.record(&update);
        self.transition(PhaseEvent::Fail(error), update);
        self.fsm.into_step()
    }

    fn record(&mut self, update: &PhaseUpdate) {
        let step = self.fsm.step_mut();
        if update.detail.is_some() {
            step.detail = update.detail.clone();
        }
        if update.branch.is_some() {
            step.branch = update.branch.clone();
        }
        if update.war_path.is_some() {
            step.artifact_path = update.war_path.clone();
        }
    }

    fn transition(&mut self, event: PhaseEvent, update: PhaseUpdate) {
        if let Err(e) = self.fsm.process(event) {
            warn!("{}: {}", self.repo, e);
            return;
        }

        self.hub.publish(&self.event(self.fsm.status(), update));
    }

    fn event(&self, status: PhaseStatus, update: PhaseUpdate) -> ProgressEvent {
        let mut event = ProgressEvent::new(self.repo, self.fsm.phase(), status);
        event.detail = update.detail;
        event.stdout = update.stdout;
        event.stderr = update.stderr;
        event.war_path = update.war_path;
        event.branch = update.branch;
        event
    }
}
