//! Integration tests for versiond

mod test_fsm;
mod test_orchestrator;
mod test_server;
