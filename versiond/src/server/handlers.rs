//! HTTP request handlers

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use openapi_server::models::{
    DebugLogQuery, DebugLogResponse, DeployedVersionsQuery, DeployedVersionsResponse, FoldersQuery,
    FoldersResponse, HealthResponse, RepoConfig, RepoConfigPatch, ReposQuery, ReposResponse,
    StartRequest, StartResponse,
};
use tracing::info;

use crate::deploy::artifact::scan_deployed;
use crate::deploy::orchestrator::RunRequest;
use crate::errors::VersiondError;
use crate::repos::discovery::{list_components, list_folders, DiscoveryOptions};
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Suggested reconnect delay for progress clients
pub const PROGRESS_RETRY: Duration = Duration::from_millis(2000);

/// Start a versioning run and wait for its results
pub async fn start_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<StartRequest>,
) -> Result<Json<StartResponse>, VersiondError> {
    let deploy_dir = body
        .deployment_folder_path
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&state.settings.deployment_folder));
    let request = RunRequest::new(body.repos, deploy_dir);

    let config = state.config.snapshot().await;
    let results = state.orchestrator.start(&config, request).await?;

    Ok(Json(StartResponse { results }))
}

/// Live progress feed
pub async fn progress_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.observers().subscribe();
    info!("Progress observer {} attached", subscription.id());

    let retry = stream::once(async { Ok(Event::default().retry(PROGRESS_RETRY)) });
    let events = stream::unfold(subscription, |mut subscription| async move {
        let payload = subscription.recv().await?;
        Some((Ok(Event::default().data(&*payload)), subscription))
    });

    Sse::new(retry.chain(events)).keep_alive(KeepAlive::default())
}

/// Highest deployed version per component in a directory
pub async fn deployed_versions_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DeployedVersionsQuery>,
) -> Result<Json<DeployedVersionsResponse>, VersiondError> {
    let path = query.path.filter(|p| !p.trim().is_empty()).ok_or_else(|| {
        VersiondError::ValidationError("Missing ?path=".to_string())
    })?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| VersiondError::NotFound(format!("Path not found: {}", path)))?;
    if !metadata.is_dir() {
        return Err(VersiondError::ValidationError(format!("Not a directory: {}", path)));
    }

    let extension = &state.settings.build.artifact_extension;
    let index = scan_deployed(PathBuf::from(&path).as_path(), extension).await?;
    state.hub.debug_log().push(format!(
        "[deploy] scanned {} {} files in {}; extracted {} versions",
        index.count,
        extension,
        path,
        index.versions.len()
    ));

    Ok(Json(DeployedVersionsResponse {
        path,
        count: index.count,
        versions: index.version_strings(),
    }))
}

/// Debug lines recorded since a timestamp
pub async fn debug_log_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DebugLogQuery>,
) -> Json<DebugLogResponse> {
    let since = query.since.unwrap_or(0);
    let log = state.hub.debug_log();

    Json(DebugLogResponse {
        lines: log.since(since),
        total: log.len(),
        since,
    })
}

pub async fn health_handler(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let config = state.config.snapshot().await;

    Json(HealthResponse {
        ok: true,
        pid: std::process::id(),
        time: chrono::Utc::now().to_rfc3339(),
        base_paths: config.base_paths,
        version: version_info().version,
    })
}

pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Components available under the configured base paths
pub async fn repos_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ReposQuery>,
) -> Json<ReposResponse> {
    let options = DiscoveryOptions {
        raw: query.raw.is_some(),
        sources: query.sources.is_some(),
        versions: query.versions.is_some(),
    };
    let config = state.config.snapshot().await;
    let listing = list_components(&config, &state.settings.build, options).await;

    state
        .hub
        .debug_log()
        .push(format!("[repos] final repos: {}", listing.repos.join(", ")));
    Json(listing)
}

/// Unfiltered listing of one base path
pub async fn folders_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<FoldersQuery>,
) -> Result<Json<FoldersResponse>, VersiondError> {
    let config = state.config.snapshot().await;
    let base = query.base.unwrap_or_default();
    let listing = list_folders(&config, &state.settings.build, &base).await?;
    Ok(Json(listing))
}

pub async fn get_settings_handler(State(state): State<Arc<ServerState>>) -> Json<RepoConfig> {
    Json(state.config.snapshot().await)
}

/// Replace the fields present in the body and persist
pub async fn put_settings_handler(
    State(state): State<Arc<ServerState>>,
    Json(mut patch): Json<RepoConfigPatch>,
) -> Result<Json<RepoConfig>, VersiondError> {
    if let Some(base_paths) = patch.base_paths.take() {
        patch.base_paths = Some(
            base_paths
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect(),
        );
    }

    let next = state.config.snapshot().await.merged(patch);
    let updated = state.config.update(next).await?;
    info!("Repository settings updated: {:?}", updated.base_paths);

    Ok(Json(updated))
}
