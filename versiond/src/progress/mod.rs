//! Live progress feed and debug log

pub mod debug_log;
pub mod hub;
pub mod registry;
pub mod reporter;
