//! HTTP router tests

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use openapi_server::models::{
    DebugLogResponse, DeployedVersionsResponse, ErrorResponse, HealthResponse, RepoConfig,
    ReposResponse,
};
use serde::de::DeserializeOwned;
use tokio_test::assert_ok;
use tower::ServiceExt;
use versiond::deploy::orchestrator::Orchestrator;
use versiond::filesys::file::File;
use versiond::progress::debug_log::DebugLog;
use versiond::progress::hub::ProgressHub;
use versiond::progress::registry::ObserverRegistry;
use versiond::server::serve::router;
use versiond::server::state::ServerState;
use versiond::storage::config::ConfigStore;
use versiond::storage::settings::{CommandSpec, Settings};

async fn test_router(data_dir: &Path) -> Router {
    router(test_state(data_dir, Settings::default(), RepoConfig::default()).await)
}

async fn test_state(data_dir: &Path, settings: Settings, defaults: RepoConfig) -> Arc<ServerState> {
    let config = ConfigStore::load(File::new(data_dir.join("config.runtime.json")), defaults).await;
    let hub = Arc::new(ProgressHub::new(
        Arc::new(ObserverRegistry::new()),
        Arc::new(DebugLog::new(100)),
    ));
    let orchestrator = Arc::new(Orchestrator::new(hub.clone(), settings.build.clone()));

    Arc::new(ServerState::new(
        Arc::new(settings),
        Arc::new(config),
        hub,
        orchestrator,
    ))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path()).await;

    let (status, body) = send(&router, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthResponse = parse(&body);
    assert!(health.ok);
    assert_eq!(health.pid, std::process::id());
    assert!(health.base_paths.is_empty());
}

#[tokio::test]
async fn test_start_without_repos_is_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path()).await;

    let (status, body) = send(
        &router,
        json_request("POST", "/api/versioning/start", r#"{"repos":["", "  "]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "No repos provided");
}

#[tokio::test]
async fn test_start_reports_unknown_component() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path()).await;

    let body = format!(
        r#"{{"repos":["ghost"],"deploymentFolderPath":"{}"}}"#,
        tmp.path().display()
    );
    let (status, body) = send(&router, json_request("POST", "/api/versioning/start", &body)).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = parse(&body);
    let result = &json["results"][0];
    assert_eq!(result["repo"], "ghost");
    assert_eq!(result["ok"], false);
    assert_eq!(result["error"]["kind"], "NotFound");
    assert_eq!(result["steps"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_run_completes_after_client_disconnects() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().join("work");
    for name in ["a", "b"] {
        std::fs::create_dir_all(base.join(name).join(".git")).unwrap();
    }
    let deployments = tmp.path().join("deployments");
    std::fs::create_dir(&deployments).unwrap();

    let mut settings = Settings::default();
    settings.build.multi_module_components = vec![];
    settings.build.standard_command = CommandSpec::new(
        "sh",
        &["-c", r#"sleep 1; mkdir -p target && touch "target/$(basename "$PWD")-1.0.0.war""#],
    );
    let config = RepoConfig {
        base_paths: vec![base.display().to_string()],
        ..Default::default()
    };
    let state = test_state(tmp.path(), settings, config).await;
    let router = router(state.clone());

    // The client gives up while the first build is still running
    let body = format!(
        r#"{{"repos":["a","b"],"deploymentFolderPath":"{}"}}"#,
        deployments.display()
    );
    let request = send(&router, json_request("POST", "/api/versioning/start", &body));
    let dropped = tokio::time::timeout(Duration::from_millis(300), request).await;
    assert!(dropped.is_err());
    assert!(state.orchestrator.is_running());

    let mut deployed = Vec::new();
    for _ in 0..150 {
        deployed = std::fs::read_dir(&deployments)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        deployed.sort();
        if deployed.len() == 2 && !state.orchestrator.is_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(deployed, vec!["a-1.0.0.war", "b-1.0.0.war"]);
    assert!(!state.orchestrator.is_running());
}

#[tokio::test]
async fn test_deployed_versions() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path()).await;

    let deployments = tmp.path().join("deployments");
    std::fs::create_dir(&deployments).unwrap();
    for name in ["svc-1.2.0.war", "svc-1.10.0.war", "gui-2.0.0-SNAPSHOT.war", "notes.txt"] {
        std::fs::write(deployments.join(name), b"").unwrap();
    }

    let uri = format!("/api/deploy/versions?path={}", deployments.display());
    let (status, body) = send(&router, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);

    let response: DeployedVersionsResponse = parse(&body);
    assert_eq!(response.count, 3);
    assert_eq!(response.versions["svc"], "1.10.0");
    assert_eq!(response.versions["gui"], "2.0.0");

    // The scan is recorded in the debug log
    let (_, body) = send(&router, get("/api/debug/log?since=0")).await;
    let log: DebugLogResponse = parse(&body);
    assert!(log.lines.iter().any(|l| l.starts_with("[deploy] scanned 3")));
}

#[tokio::test]
async fn test_deployed_versions_rejects_bad_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path()).await;

    let (status, _) = send(&router, get("/api/deploy/versions")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = format!("/api/deploy/versions?path={}/nope", tmp.path().display());
    let (status, _) = send(&router, get(&missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let file = tmp.path().join("plain.war");
    std::fs::write(&file, b"").unwrap();
    let not_dir = format!("/api/deploy/versions?path={}", file.display());
    let (status, _) = send(&router, get(&not_dir)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_update_persists() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path()).await;

    let work = tmp.path().join("work");
    std::fs::create_dir_all(work.join("svc").join(".git")).unwrap();
    std::fs::create_dir_all(work.join("docs")).unwrap();

    let body = format!(r#"{{"basePaths":["", "{}"]}}"#, work.display());
    let (status, body) = send(&router, json_request("PUT", "/api/settings", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let updated: RepoConfig = parse(&body);
    assert_eq!(updated.base_paths, vec![work.display().to_string()]);

    let (_, body) = send(&router, get("/api/settings")).await;
    assert_eq!(parse::<RepoConfig>(&body), updated);

    let on_disk = assert_ok!(std::fs::read_to_string(tmp.path().join("config.runtime.json")));
    assert_eq!(assert_ok!(serde_json::from_str::<RepoConfig>(&on_disk)), updated);

    // Discovery now sees the working copy under the new base
    let (status, body) = send(&router, get("/api/repos")).await;
    assert_eq!(status, StatusCode::OK);
    let repos: ReposResponse = parse(&body);
    assert_eq!(repos.repos, vec!["svc"]);
}

#[tokio::test]
async fn test_folders_rejects_unknown_base() {
    let tmp = tempfile::tempdir().unwrap();
    let router = test_router(tmp.path()).await;

    let (status, body) = send(&router, get("/api/folders?base=/not/configured")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "Invalid base path");
}
