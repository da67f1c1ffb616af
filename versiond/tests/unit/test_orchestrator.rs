//! Versioning run tests against scripted builds and real git repositories

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use openapi_server::models::{
    Phase, PhaseErrorKind, PhaseStatus, ProgressEvent, RepoConfig, RunResult,
};
use versiond::deploy::orchestrator::{Orchestrator, RunRequest, NOT_FOUND_MESSAGE};
use versiond::progress::debug_log::DebugLog;
use versiond::progress::hub::ProgressHub;
use versiond::progress::registry::ObserverRegistry;
use versiond::repos::locator::{ComponentDescriptor, ComponentKind, ComponentLocator};
use versiond::storage::settings::{BuildSettings, CommandSpec};

// Builds named `bad` fail; every other build drops `<name>-1.0.0.war` into target/
const SCRIPTED_BUILD: &str = r#"name=$(basename "$PWD")
case "$name" in
  bad) echo "compiling $name"; echo "boom" >&2; exit 3 ;;
  *) echo "compiling $name"; mkdir -p target && touch "target/$name-1.0.0.war" ;;
esac"#;

struct FakeLocator {
    components: HashMap<String, (PathBuf, ComponentKind)>,
}

impl FakeLocator {
    fn new(root: &Path, names: &[&str]) -> Self {
        let mut locator = Self {
            components: HashMap::new(),
        };
        for name in names {
            locator = locator.with_component(root, name, ComponentKind::Standard);
        }
        locator
    }

    fn with_component(mut self, root: &Path, name: &str, kind: ComponentKind) -> Self {
        let path = root.join(name);
        std::fs::create_dir_all(&path).unwrap();
        self.components.insert(name.to_string(), (path, kind));
        self
    }
}

#[async_trait]
impl ComponentLocator for FakeLocator {
    async fn resolve(&self, name: &str) -> Option<ComponentDescriptor> {
        self.components.get(name).map(|(path, kind)| ComponentDescriptor {
            name: name.to_string(),
            path: path.clone(),
            kind: *kind,
        })
    }
}

fn scripted_build(script: &str) -> BuildSettings {
    BuildSettings {
        standard_command: CommandSpec::new("sh", &["-c", script]),
        multi_module_components: vec![],
        ..Default::default()
    }
}

fn orchestrator(build: BuildSettings) -> Arc<Orchestrator> {
    let hub = ProgressHub::new(Arc::new(ObserverRegistry::new()), Arc::new(DebugLog::new(1000)));
    Arc::new(Orchestrator::new(Arc::new(hub), build))
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn names(repos: &[&str]) -> Vec<String> {
    repos.iter().map(|r| r.to_string()).collect()
}

fn phase_status(result: &RunResult, phase: Phase) -> Option<PhaseStatus> {
    result.phase(phase).map(|p| p.status)
}

// ================================ ISOLATION ==================================== //

#[tokio::test]
async fn test_build_failure_does_not_block_next_component() {
    let tmp = tempfile::tempdir().unwrap();
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();
    let locator = FakeLocator::new(&tmp.path().join("src"), &["bad", "good"]);

    let orchestrator = orchestrator(scripted_build(SCRIPTED_BUILD));
    let results = orchestrator
        .run(&locator, &names(&["bad", "good"]), &deploy_dir)
        .await;

    assert_eq!(results.len(), 2);

    let bad = &results[0];
    assert_eq!(bad.repo, "bad");
    assert!(!bad.ok);
    assert!(!bad.build_ok);
    assert!(!bad.deploy_ok);
    let build = bad.phase(Phase::Build).unwrap();
    assert_eq!(build.status, PhaseStatus::Error);
    assert_eq!(build.error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::NonZeroExit));
    assert!(bad.stderr.contains("boom"));
    let deploy = bad.phase(Phase::Deploy).unwrap();
    assert_eq!(deploy.error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::NoArtifact));
    assert_eq!(bad.deploy_error.as_deref(), Some("No WARs to deploy"));

    let good = &results[1];
    assert_eq!(good.repo, "good");
    assert!(good.build_ok);
    assert!(good.deploy_ok);
    assert_eq!(good.phases.len(), 3);
    assert!(good.war_path.as_deref().unwrap().ends_with("good-1.0.0.war"));
    assert!(good.stdout.contains("compiling good"));
    assert_eq!(file_names(&deploy_dir), vec!["good-1.0.0.war"]);
}

#[tokio::test]
async fn test_build_without_artifact_fails_deploy_only() {
    let tmp = tempfile::tempdir().unwrap();
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();
    let locator = FakeLocator::new(&tmp.path().join("src"), &["svc"]);

    let orchestrator = orchestrator(scripted_build("echo nothing to package"));
    let results = orchestrator.run(&locator, &names(&["svc"]), &deploy_dir).await;

    let result = &results[0];
    assert!(result.build_ok);
    assert!(result.war_path.is_none());
    assert_eq!(
        result.phase(Phase::Build).and_then(|p| p.detail.as_deref()),
        Some("build succeeded, no artifact")
    );
    assert_eq!(phase_status(result, Phase::Deploy), Some(PhaseStatus::Error));
    assert!(!result.deploy_ok);
    assert!(!result.ok);
}

#[tokio::test]
async fn test_unresolved_component_spawns_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let locator = FakeLocator::new(tmp.path(), &[]);

    let orchestrator = orchestrator(scripted_build(SCRIPTED_BUILD));
    let results = orchestrator
        .run(&locator, &names(&["ghost"]), tmp.path())
        .await;

    let result = &results[0];
    assert!(!result.ok);
    assert!(result.steps.is_empty());
    assert!(result.branch.is_none());
    assert_eq!(result.phases.len(), 1);
    let error = result.error.as_ref().unwrap();
    assert_eq!(error.kind, PhaseErrorKind::NotFound);
    assert_eq!(error.message, NOT_FOUND_MESSAGE);

    let log = orchestrator.hub().debug_log().since(0);
    assert!(log.iter().any(|l| l.contains("ghost") && l.contains(NOT_FOUND_MESSAGE)));
}

// ============================== BUILD FAILURES ================================= //

#[tokio::test]
async fn test_missing_module_dir_skips_build() {
    let tmp = tempfile::tempdir().unwrap();
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();
    let locator = FakeLocator::new(tmp.path(), &[]).with_component(
        &tmp.path().join("src"),
        "opt-soa",
        ComponentKind::MultiModule,
    );

    let build = BuildSettings {
        multi_module_command: CommandSpec::new("sh", &["-c", "touch ran"]),
        ..scripted_build("exit 9")
    };
    let orchestrator = orchestrator(build);
    let results = orchestrator
        .run(&locator, &names(&["opt-soa"]), &deploy_dir)
        .await;

    let result = &results[0];
    let build = result.phase(Phase::Build).unwrap();
    assert_eq!(build.status, PhaseStatus::Error);
    assert_eq!(build.error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::ProcessLaunchFailure));
    assert!(build.detail.as_deref().unwrap().starts_with("Build directory not found"));

    let skipped = result.steps.last().unwrap();
    assert_eq!(skipped.cmd, "skip build");
    assert_eq!(skipped.code, -1);
    assert!(!result.steps.iter().any(|s| s.cmd.starts_with("sh ")));
    assert!(!tmp.path().join("src/opt-soa/ran").exists());
    assert_eq!(phase_status(result, Phase::Deploy), Some(PhaseStatus::Error));
}

#[tokio::test]
async fn test_unstartable_build_tool_is_launch_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();
    let locator = FakeLocator::new(&tmp.path().join("src"), &["svc"]);

    let build = BuildSettings {
        standard_command: CommandSpec::new("versiond-no-such-build-tool", &["package"]),
        ..Default::default()
    };
    let orchestrator = orchestrator(build);
    let results = orchestrator.run(&locator, &names(&["svc"]), &deploy_dir).await;

    let result = &results[0];
    assert!(!result.build_ok);
    let build = result.phase(Phase::Build).unwrap();
    assert_eq!(build.error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::ProcessLaunchFailure));

    let record = result
        .steps
        .iter()
        .find(|s| s.cmd == "versiond-no-such-build-tool package")
        .unwrap();
    assert_eq!(record.code, -1);
    assert!(record.stderr.contains("Failed to start versiond-no-such-build-tool"));
    assert_eq!(phase_status(result, Phase::Deploy), Some(PhaseStatus::Error));
}

#[tokio::test]
async fn test_multi_module_builds_from_module_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();
    let locator = FakeLocator::new(tmp.path(), &[]).with_component(
        &tmp.path().join("src"),
        "opt-soa",
        ComponentKind::MultiModule,
    );
    std::fs::create_dir(tmp.path().join("src/opt-soa/SOA")).unwrap();

    let build = BuildSettings {
        multi_module_command: CommandSpec::new(
            "sh",
            &["-c", "mkdir -p target && touch target/soa-3.1.0.war target/soa-3.0.9.war"],
        ),
        ..scripted_build("exit 9")
    };
    let orchestrator = orchestrator(build);
    let results = orchestrator
        .run(&locator, &names(&["opt-soa"]), &deploy_dir)
        .await;

    let result = &results[0];
    assert!(result.build_ok, "build failed: {:?}", result.phase(Phase::Build));
    assert!(result.deploy_ok);
    let war_path = result.war_path.as_deref().unwrap();
    assert!(war_path.ends_with("SOA/target/soa-3.1.0.war"), "{}", war_path);
    assert_eq!(file_names(&deploy_dir), vec!["soa-3.1.0.war"]);
}

// ============================== EVENT ORDERING ================================= //

#[tokio::test]
async fn test_each_phase_ends_with_one_terminal_event() {
    let tmp = tempfile::tempdir().unwrap();
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();
    let locator = FakeLocator::new(&tmp.path().join("src"), &["bad", "good"]);

    let orchestrator = orchestrator(scripted_build(SCRIPTED_BUILD));
    let (_, mut rx) = orchestrator.hub().observers().add();

    orchestrator
        .run(&locator, &names(&["bad", "ghost", "good"]), &deploy_dir)
        .await;

    let mut events = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        events.push(serde_json::from_str::<ProgressEvent>(&payload).unwrap());
    }
    assert!(!events.is_empty());

    for repo in ["bad", "ghost", "good"] {
        let repo_events: Vec<&ProgressEvent> = events.iter().filter(|e| e.repo == repo).collect();

        // Phases appear in order and never interleave
        let mut order: Vec<Phase> = Vec::new();
        for event in &repo_events {
            if order.last() != Some(&event.phase) {
                assert!(!order.contains(&event.phase), "{} phase {:?} resumed", repo, event.phase);
                order.push(event.phase);
            }
        }
        let expected: &[Phase] = if repo == "ghost" { &[Phase::Sync] } else { &Phase::ALL };
        assert_eq!(order, expected, "phase order for {}", repo);

        for phase in order {
            let statuses: Vec<PhaseStatus> = repo_events
                .iter()
                .filter(|e| e.phase == phase)
                .map(|e| e.status)
                .collect();
            let (last, running) = statuses.split_last().unwrap();
            assert!(last.is_terminal(), "{} {:?} ended with {:?}", repo, phase, last);
            assert!(!running.is_empty(), "{} {:?} had no running event", repo, phase);
            assert!(running.iter().all(|s| *s == PhaseStatus::Running));
        }
    }

    // Build output is streamed line by line
    assert!(events
        .iter()
        .any(|e| e.repo == "good" && e.stdout.as_deref() == Some("compiling good")));
}

// ================================= GIT REPOS =================================== //

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(cwd: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(["-c", "user.name=versiond", "-c", "user.email=versiond@example.com"])
        .args(args)
        .current_dir(cwd)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// An origin repository whose only branch is `main`, cloned under `<root>/base/<name>`
fn clone_main_only(root: &Path, name: &str) -> PathBuf {
    clone_single_branch(root, name, "main")
}

fn clone_single_branch(root: &Path, name: &str, branch: &str) -> PathBuf {
    let origin = root.join("origin").join(name);
    std::fs::create_dir_all(&origin).unwrap();
    git(&origin, &["init", "-q"]);
    let head = format!("refs/heads/{}", branch);
    git(&origin, &["symbolic-ref", "HEAD", &head]);
    std::fs::write(origin.join("README"), "hello\n").unwrap();
    git(&origin, &["add", "README"]);
    git(&origin, &["commit", "-q", "-m", "initial"]);

    let base = root.join("base");
    std::fs::create_dir_all(&base).unwrap();
    git(&base, &["clone", "-q", origin.to_str().unwrap(), name]);
    base
}

#[tokio::test]
async fn test_main_only_remote_resolves_to_main_and_replaces_deployment() {
    if !git_available() {
        eprintln!("git not found on PATH, skipping");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let base = clone_main_only(tmp.path(), "svc");

    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();
    std::fs::write(deploy_dir.join("svc-1.0.0.war"), b"old").unwrap();
    std::fs::write(deploy_dir.join("other-3.0.0.war"), b"other").unwrap();

    let config = RepoConfig {
        base_paths: vec![base.to_string_lossy().into_owned()],
        ..Default::default()
    };
    let orchestrator = orchestrator(scripted_build(
        "mkdir -p target && touch target/svc-1.2.0.war target/svc-1.10.0.war",
    ));

    let results = orchestrator
        .start(&config, RunRequest::new(names(&["svc", "missing"]), &deploy_dir))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let svc = &results[0];
    assert_eq!(svc.branch.as_deref(), Some("main"));
    assert_eq!(phase_status(svc, Phase::Sync), Some(PhaseStatus::Success));
    assert_eq!(
        svc.phase(Phase::Sync).and_then(|p| p.branch.as_deref()),
        Some("main")
    );
    assert!(svc.ok, "unexpected failure: {:?}", svc.error);
    assert!(svc.war_path.as_deref().unwrap().ends_with("svc-1.10.0.war"));
    assert!(svc.steps.iter().any(|s| s.cmd == "git checkout main"));
    assert_eq!(file_names(&deploy_dir), vec!["other-3.0.0.war", "svc-1.10.0.war"]);

    let missing = &results[1];
    assert!(!missing.ok);
    assert_eq!(missing.error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::NotFound));

    // Guard released once the run returns
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_redeploying_same_artifact_is_idempotent() {
    if !git_available() {
        eprintln!("git not found on PATH, skipping");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let base = clone_main_only(tmp.path(), "svc");
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();

    let config = RepoConfig {
        base_paths: vec![base.to_string_lossy().into_owned()],
        ..Default::default()
    };
    let orchestrator = orchestrator(scripted_build(
        "mkdir -p target && echo built > target/svc-2.0.0.war",
    ));

    for _ in 0..2 {
        let results = orchestrator
            .start(&config, RunRequest::new(names(&["svc"]), &deploy_dir))
            .await
            .unwrap();
        assert!(results[0].deploy_ok);
        assert_eq!(file_names(&deploy_dir), vec!["svc-2.0.0.war"]);
    }
    assert_eq!(
        std::fs::read_to_string(deploy_dir.join("svc-2.0.0.war")).unwrap(),
        "built\n"
    );
}

#[tokio::test]
async fn test_no_trunk_branch_attempts_master_and_fails_sync() {
    if !git_available() {
        eprintln!("git not found on PATH, skipping");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let base = clone_single_branch(tmp.path(), "svc", "develop");
    let deploy_dir = tmp.path().join("deployments");
    std::fs::create_dir(&deploy_dir).unwrap();

    let config = RepoConfig {
        base_paths: vec![base.to_string_lossy().into_owned()],
        ..Default::default()
    };
    let orchestrator = orchestrator(scripted_build("mkdir -p target && touch target/svc-1.0.0.war"));
    let results = orchestrator
        .start(&config, RunRequest::new(names(&["svc"]), &deploy_dir))
        .await
        .unwrap();

    let svc = &results[0];
    assert_eq!(svc.branch.as_deref(), Some("master"));
    assert!(svc.steps.iter().any(|s| s.cmd == "git checkout master" && s.code != 0));

    let sync = svc.phase(Phase::Sync).unwrap();
    assert_eq!(sync.status, PhaseStatus::Error);
    assert_eq!(sync.error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::SyncFailure));
    assert!(sync
        .detail
        .as_deref()
        .unwrap()
        .contains("neither master nor main resolved; trying master"));
    assert_eq!(svc.error.as_ref().map(|e| e.kind), Some(PhaseErrorKind::SyncFailure));
    assert!(!svc.ok);

    // Build and deploy still run after a failed sync
    assert!(svc.build_ok);
    assert!(svc.deploy_ok);
    assert_eq!(file_names(&deploy_dir), vec!["svc-1.0.0.war"]);
}
