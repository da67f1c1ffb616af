//! Server state

use std::sync::Arc;

use crate::deploy::orchestrator::Orchestrator;
use crate::progress::hub::ProgressHub;
use crate::storage::config::ConfigStore;
use crate::storage::settings::Settings;

/// Server state shared across handlers
pub struct ServerState {
    pub settings: Arc<Settings>,
    pub config: Arc<ConfigStore>,
    pub hub: Arc<ProgressHub>,
    pub orchestrator: Arc<Orchestrator>,
}

impl ServerState {
    pub fn new(
        settings: Arc<Settings>,
        config: Arc<ConfigStore>,
        hub: Arc<ProgressHub>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            settings,
            config,
            hub,
            orchestrator,
        }
    }
}
