//! Component lookup and discovery

pub mod discovery;
pub mod locator;
