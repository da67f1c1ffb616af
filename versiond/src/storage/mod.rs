//! Persistent settings and configuration

pub mod config;
pub mod layout;
pub mod settings;
