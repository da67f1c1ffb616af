//! versiond Library
//!
//! Trunk synchronization, builds and artifact deployment for local working copies.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod progress;
pub mod repos;
pub mod server;
pub mod storage;
pub mod utils;
