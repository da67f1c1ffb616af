//! Versioning runs: sync, build and deploy each requested component in turn
//!
//! Components are processed strictly one after another and one component's
//! failure never stops the others. Each phase is reported through its own
//! [`PhaseReporter`], so observers see `running` events followed by exactly
//! one terminal event per phase, in phase order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use openapi_server::models::{
    CommandRecord, Phase, PhaseError, PhaseErrorKind, PhaseStep, RepoConfig, RunResult,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::deploy::build::{plan_build, run_build, BuildOutcome};
use crate::deploy::git::sync_trunk;
use crate::deploy::writer::deploy_artifacts;
use crate::errors::VersiondError;
use crate::progress::hub::ProgressHub;
use crate::progress::reporter::{PhaseReporter, PhaseUpdate};
use crate::repos::locator::{ComponentLocator, ConfigLocator};
use crate::storage::settings::BuildSettings;

/// Error message for components without a working copy
pub const NOT_FOUND_MESSAGE: &str = "not found or not a git repo";

/// A validated start command
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub repos: Vec<String>,
    pub deploy_dir: PathBuf,
}

impl RunRequest {
    /// Trims names and drops blank ones
    pub fn new(repos: Vec<String>, deploy_dir: impl Into<PathBuf>) -> Self {
        Self {
            repos: repos
                .into_iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            deploy_dir: deploy_dir.into(),
        }
    }
}

pub struct Orchestrator {
    hub: Arc<ProgressHub>,
    build: BuildSettings,
    run_guard: Arc<Mutex<()>>,
}

impl Orchestrator {
    pub fn new(hub: Arc<ProgressHub>, build: BuildSettings) -> Self {
        Self {
            hub,
            build,
            run_guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn hub(&self) -> &Arc<ProgressHub> {
        &self.hub
    }

    /// True while a run holds the guard
    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Start a run against a configuration snapshot.
    ///
    /// Only one run may be in flight; a second one is rejected, not queued.
    /// The run executes on its own task and completes even if the caller
    /// stops waiting for it.
    pub async fn start(self: &Arc<Self>, config: &RepoConfig, request: RunRequest) -> Result<Vec<RunResult>, VersiondError> {
        if request.repos.is_empty() {
            return Err(VersiondError::ValidationError("No repos provided".to_string()));
        }

        let guard = Arc::clone(&self.run_guard).try_lock_owned().map_err(|_| {
            VersiondError::Conflict("A versioning run is already in progress".to_string())
        })?;

        let locator = ConfigLocator::new(config, &self.build);
        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            orchestrator
                .run(&locator, &request.repos, &request.deploy_dir)
                .await
        });

        handle
            .await
            .map_err(|e| VersiondError::Internal(format!("Versioning run aborted: {}", e)))
    }

    /// Run every component in order and collect their results
    pub async fn run(&self, locator: &dyn ComponentLocator, repos: &[String], deploy_dir: &Path) -> Vec<RunResult> {
        info!("Versioning run for {} component(s)", repos.len());
        self.hub
            .debug_log()
            .push(format!("[versioning] start for repos: {}", repos.join(", ")));

        let mut results = Vec::with_capacity(repos.len());
        for repo in repos {
            let result = self.run_component(locator, repo, deploy_dir).await;
            self.hub.debug_log().push(summary(&result));
            results.push(result);
        }
        results
    }

    async fn run_component(&self, locator: &dyn ComponentLocator, repo: &str, deploy_dir: &Path) -> RunResult {
        let sync = PhaseReporter::begin(&self.hub, repo, Phase::Sync, PhaseUpdate::default());

        let Some(component) = locator.resolve(repo).await else {
            warn!("{}: {}", repo, NOT_FOUND_MESSAGE);
            let error = PhaseError::new(PhaseErrorKind::NotFound, NOT_FOUND_MESSAGE);
            let mut result = RunResult::empty(repo);
            result.phases.push(sync.fail(error.clone(), PhaseUpdate::default()));
            result.error = Some(error);
            return result;
        };

        let synced = sync_trunk(sync, &component.path).await;

        let plan = plan_build(&component, &self.build);
        let build = PhaseReporter::begin(
            &self.hub,
            repo,
            Phase::Build,
            PhaseUpdate::stdout(format!("$ {}", plan.command_line())),
        );
        let built = run_build(build, &plan).await;

        let (deploy_step, deploy_error) = self.deploy_phase(repo, &built, deploy_dir).await;

        let mut commands = synced.commands;
        commands.push(built.command.clone());

        let build_ok = built.ok();
        let deploy_ok = deploy_error.is_none();
        let ok = build_ok && deploy_ok && commands.iter().all(CommandRecord::succeeded);
        let phases = vec![synced.step, built.step.clone(), deploy_step];
        let error = phases.iter().find_map(|p| p.error.clone());

        RunResult {
            repo: repo.to_string(),
            ok,
            branch: Some(synced.branch),
            stdout: combined_stdout(&commands),
            stderr: combined_stderr(&commands),
            steps: commands,
            phases,
            build_ok,
            war_path: built.artifact_list(),
            deploy_ok,
            deploy_error,
            error,
        }
    }

    /// Always runs; fails straight away when the build left nothing to deploy
    async fn deploy_phase(&self, repo: &str, built: &BuildOutcome, deploy_dir: &Path) -> (PhaseStep, Option<String>) {
        let names: Vec<String> = built
            .artifacts
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        let mut reporter = PhaseReporter::begin(
            &self.hub,
            repo,
            Phase::Deploy,
            PhaseUpdate::stdout(format!(
                "Preparing to deploy to {}\n- Removing previously deployed versions with the same base name\n- Artifacts: {}",
                deploy_dir.display(),
                if names.is_empty() { "None found".to_string() } else { names.join(", ") }
            )),
        );

        if built.artifacts.is_empty() {
            let message = format!(
                "No {}s to deploy",
                self.build.artifact_extension.to_ascii_uppercase()
            );
            let step = reporter.fail(
                PhaseError::new(PhaseErrorKind::NoArtifact, message.clone()),
                PhaseUpdate::default(),
            );
            return (step, Some(message));
        }

        let outcome = deploy_artifacts(&built.artifacts, deploy_dir).await;
        for name in &outcome.removed {
            reporter.append_output(&format!("removed {}", name));
        }
        for path in &outcome.deployed {
            reporter.append_output(&format!("deployed {}", path.display()));
        }

        let mut update = PhaseUpdate::default();
        update.war_path = built.artifact_list();

        if outcome.ok() {
            update.detail = Some(format!(
                "deployed {} artifact(s) to {}",
                outcome.deployed.len(),
                deploy_dir.display()
            ));
            (reporter.succeed(update), None)
        } else {
            let message = outcome
                .error_message()
                .unwrap_or_else(|| "deployment incomplete".to_string());
            let step = reporter.fail(
                PhaseError::new(PhaseErrorKind::DeployIoFailure, message.clone()),
                update,
            );
            (step, Some(message))
        }
    }
}

fn combined_stdout(commands: &[CommandRecord]) -> String {
    commands
        .iter()
        .map(|c| format!("# {}\n{}", c.cmd, c.stdout))
        .collect::<Vec<_>>()
        .join("\n")
}

fn combined_stderr(commands: &[CommandRecord]) -> String {
    commands
        .iter()
        .filter(|c| !c.stderr.is_empty())
        .map(|c| format!("# {}\n{}", c.cmd, c.stderr))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary(result: &RunResult) -> String {
    match (&result.branch, &result.error) {
        (None, Some(error)) => format!("[versioning] {}: {}", result.repo, error.message),
        _ => format!(
            "[versioning] {}: branch={} ok={} buildOk={} deployOk={}",
            result.repo,
            result.branch.as_deref().unwrap_or("-"),
            result.ok,
            result.build_ok,
            result.deploy_ok
        ),
    }
}
