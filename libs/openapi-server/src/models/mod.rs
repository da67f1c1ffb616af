//! versiond API models

mod api;
mod progress;
mod run;

pub use api::*;
pub use progress::*;
pub use run::*;
