//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::VersiondError;
use crate::server::handlers::{
    debug_log_handler, deployed_versions_handler, folders_handler, get_settings_handler,
    health_handler, progress_handler, put_settings_handler, repos_handler, start_handler,
    version_handler,
};
use crate::server::state::ServerState;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/api/health", get(health_handler))
        .route("/api/version", get(version_handler))
        // Versioning
        .route("/api/versioning/start", post(start_handler))
        .route("/api/versioning/progress", get(progress_handler))
        .route("/api/deploy/versions", get(deployed_versions_handler))
        // Components and settings
        .route("/api/repos", get(repos_handler))
        .route("/api/folders", get(folders_handler))
        .route(
            "/api/settings",
            get(get_settings_handler).put(put_settings_handler),
        )
        // Debug
        .route("/api/debug/log", get(debug_log_handler))
        // State and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), VersiondError>>, VersiondError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| VersiondError::ServerError(format!("Failed to bind {}: {}", addr, e)))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| VersiondError::ServerError(e.to_string()))
    });

    Ok(handle)
}
