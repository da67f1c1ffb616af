//! Phase FSM tests

use openapi_server::models::{Phase, PhaseError, PhaseErrorKind, PhaseStatus};
use versiond::deploy::fsm::{PhaseEvent, PhaseFsm};

#[test]
fn test_fsm_initial_state() {
    let fsm = PhaseFsm::new(Phase::Sync);
    assert_eq!(fsm.status(), PhaseStatus::Pending);
    assert_eq!(fsm.phase(), Phase::Sync);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = PhaseFsm::new(Phase::Build);

    // Pending -> Running
    fsm.process(PhaseEvent::Start).unwrap();
    assert_eq!(fsm.status(), PhaseStatus::Running);

    // Running -> Running
    fsm.process(PhaseEvent::Progress).unwrap();
    assert_eq!(fsm.status(), PhaseStatus::Running);

    // Running -> Success
    fsm.process(PhaseEvent::Succeed).unwrap();
    assert_eq!(fsm.status(), PhaseStatus::Success);
    assert!(fsm.status().is_terminal());
}

#[test]
fn test_fsm_failure_flow() {
    let mut fsm = PhaseFsm::new(Phase::Sync);

    fsm.process(PhaseEvent::Start).unwrap();
    fsm.process(PhaseEvent::Fail(PhaseError::new(
        PhaseErrorKind::SyncFailure,
        "checkout failed",
    )))
    .unwrap();

    assert_eq!(fsm.status(), PhaseStatus::Error);
    assert_eq!(fsm.error().map(|e| e.message.as_str()), Some("checkout failed"));
    assert_eq!(fsm.step().error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::SyncFailure));
}

#[test]
fn test_fsm_cannot_skip_running() {
    let mut fsm = PhaseFsm::new(Phase::Deploy);

    assert!(fsm.process(PhaseEvent::Succeed).is_err());
    assert!(fsm.process(PhaseEvent::Progress).is_err());
    assert_eq!(fsm.status(), PhaseStatus::Pending);
}

#[test]
fn test_fsm_terminal_is_final() {
    let mut fsm = PhaseFsm::new(Phase::Deploy);
    fsm.process(PhaseEvent::Start).unwrap();
    fsm.process(PhaseEvent::Succeed).unwrap();

    // No regressions once terminal
    assert!(fsm.process(PhaseEvent::Start).is_err());
    assert!(fsm.process(PhaseEvent::Progress).is_err());
    assert!(fsm
        .process(PhaseEvent::Fail(PhaseError::new(PhaseErrorKind::DeployIoFailure, "late")))
        .is_err());
    assert_eq!(fsm.status(), PhaseStatus::Success);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_into_step() {
    let mut fsm = PhaseFsm::new(Phase::Build);
    fsm.process(PhaseEvent::Start).unwrap();
    fsm.step_mut().detail = Some("compiling".to_string());

    let step = fsm.into_step();
    assert_eq!(step.phase, Phase::Build);
    assert_eq!(step.status, PhaseStatus::Running);
    assert_eq!(step.detail.as_deref(), Some("compiling"));
}
