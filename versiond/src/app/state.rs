//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::deploy::orchestrator::Orchestrator;
use crate::errors::VersiondError;
use crate::progress::debug_log::DebugLog;
use crate::progress::hub::ProgressHub;
use crate::progress::registry::ObserverRegistry;
use crate::server::state::ServerState;
use crate::storage::config::ConfigStore;
use crate::storage::settings::Settings;

/// Main application state
pub struct AppState {
    /// Service settings, fixed for the lifetime of the process
    pub settings: Arc<Settings>,

    /// Repository configuration
    pub config: Arc<ConfigStore>,

    /// Progress observers and debug log
    pub hub: Arc<ProgressHub>,

    /// Versioning runs
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub async fn init(options: &AppOptions, settings: Settings) -> Result<Self, VersiondError> {
        let layout = &options.storage.layout;
        layout.setup().await?;

        let config = ConfigStore::load(layout.config_file(), options.default_repo_config.clone()).await;
        if config.snapshot().await.base_paths.is_empty() {
            warn!("No base paths configured; set them with PUT /api/settings");
        }

        let hub = Arc::new(ProgressHub::new(
            Arc::new(ObserverRegistry::with_queue_capacity(options.observer_queue_capacity)),
            Arc::new(DebugLog::new(options.debug_buffer_capacity)),
        ));
        let orchestrator = Arc::new(Orchestrator::new(hub.clone(), settings.build.clone()));

        info!("Storage at {}", layout.base_dir.display());

        Ok(Self {
            settings: Arc::new(settings),
            config: Arc::new(config),
            hub,
            orchestrator,
        })
    }

    pub fn server_state(&self) -> ServerState {
        ServerState::new(
            self.settings.clone(),
            self.config.clone(),
            self.hub.clone(),
            self.orchestrator.clone(),
        )
    }

    /// Flush state that must survive a restart
    pub async fn shutdown(&self) -> Result<(), VersiondError> {
        if self.orchestrator.is_running() {
            warn!("Shutting down while a versioning run is in progress");
        }
        self.config.persist().await
    }
}
