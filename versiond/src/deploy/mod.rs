//! Versioning and deployment pipeline

pub mod artifact;
pub mod build;
pub mod fsm;
pub mod git;
pub mod orchestrator;
pub mod process;
pub mod stream;
pub mod writer;
