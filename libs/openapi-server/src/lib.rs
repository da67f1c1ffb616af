//! Request, response and event models exposed by the versiond HTTP API.

pub mod models;
