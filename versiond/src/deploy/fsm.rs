//! Finite state machine for a single orchestration phase
//!
//! A phase moves `pending -> running -> (success | error)`. Progress updates
//! are only accepted while running, and a terminal phase never moves again.

use openapi_server::models::{Phase, PhaseError, PhaseStatus, PhaseStep};

/// Phase event
#[derive(Debug, Clone)]
pub enum PhaseEvent {
    /// Phase begins
    Start,

    /// More work happened while running
    Progress,

    /// Phase completed successfully
    Succeed,

    /// Phase failed
    Fail(PhaseError),
}

/// Phase FSM
#[derive(Debug, Clone)]
pub struct PhaseFsm {
    step: PhaseStep,
}

impl PhaseFsm {
    /// Create a new FSM in pending state
    pub fn new(phase: Phase) -> Self {
        Self {
            step: PhaseStep::pending(phase),
        }
    }

    pub fn phase(&self) -> Phase {
        self.step.phase
    }

    /// Get current status
    pub fn status(&self) -> PhaseStatus {
        self.step.status
    }

    /// Get the recorded error, if any
    pub fn error(&self) -> Option<&PhaseError> {
        self.step.error.as_ref()
    }

    pub fn step(&self) -> &PhaseStep {
        &self.step
    }

    /// Mutable access to the step's data fields
    pub fn step_mut(&mut self) -> &mut PhaseStep {
        &mut self.step
    }

    pub fn into_step(self) -> PhaseStep {
        self.step
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: PhaseEvent) -> Result<(), String> {
        let new_status = match (&self.step.status, &event) {
            (PhaseStatus::Pending, PhaseEvent::Start) => PhaseStatus::Running,

            (PhaseStatus::Running, PhaseEvent::Progress) => PhaseStatus::Running,
            (PhaseStatus::Running, PhaseEvent::Succeed) => PhaseStatus::Success,
            (PhaseStatus::Running, PhaseEvent::Fail(err)) => {
                self.step.error = Some(err.clone());
                PhaseStatus::Error
            }

            (status, event) => {
                return Err(format!(
                    "Invalid transition for {:?} phase: {:?} -> {:?}",
                    self.step.phase, status, event
                ));
            }
        };

        self.step.status = new_status;
        Ok(())
    }
}
