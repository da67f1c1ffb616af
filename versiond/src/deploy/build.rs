//! Building a component and collecting its artifacts

use std::path::{Path, PathBuf};

use openapi_server::models::{CommandRecord, PhaseError, PhaseErrorKind, PhaseStatus, PhaseStep};
use tracing::{info, warn};

use crate::deploy::artifact::find_artifacts;
use crate::deploy::process::{ProcessEvent, ProcessSpec, ProcessTask};
use crate::deploy::stream::StreamPublisher;
use crate::filesys::dir::Dir;
use crate::progress::reporter::{PhaseReporter, PhaseUpdate};
use crate::repos::locator::{ComponentDescriptor, ComponentKind};
use crate::storage::settings::BuildSettings;

/// Detail recorded when a build produced nothing deployable
pub const NO_ARTIFACT_DETAIL: &str = "build succeeded, no artifact";

/// Command, working directory and output directory for one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub spec: ProcessSpec,
    pub output_dir: PathBuf,
    pub extension: String,
}

impl BuildPlan {
    pub fn command_line(&self) -> String {
        self.spec.command_line()
    }

    pub fn cwd(&self) -> &Path {
        &self.spec.cwd
    }
}

/// Multi-module components build from their module directory, everything else
/// from the component root.
pub fn plan_build(component: &ComponentDescriptor, settings: &BuildSettings) -> BuildPlan {
    let (command, cwd) = match component.kind {
        ComponentKind::MultiModule => (
            &settings.multi_module_command,
            component.path.join(&settings.module_dir),
        ),
        ComponentKind::Standard => (&settings.standard_command, component.path.clone()),
    };

    BuildPlan {
        output_dir: cwd.join(&settings.output_dir),
        spec: ProcessSpec {
            program: command.program.clone(),
            args: command.args.clone(),
            cwd,
        },
        extension: settings.artifact_extension.clone(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub command: CommandRecord,
    pub step: PhaseStep,
    /// Newest artifact per base name; empty when the build failed
    pub artifacts: Vec<PathBuf>,
}

impl BuildOutcome {
    pub fn ok(&self) -> bool {
        self.step.status == PhaseStatus::Success
    }

    /// Artifact paths as shown to operators
    pub fn artifact_list(&self) -> Option<String> {
        if self.artifacts.is_empty() {
            return None;
        }
        Some(
            self.artifacts
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Run the build, streaming its output, then select artifacts on success.
pub async fn run_build(mut reporter: PhaseReporter<'_>, plan: &BuildPlan) -> BuildOutcome {
    let cmd = plan.command_line();

    if !Dir::new(plan.cwd()).exists().await {
        let message = format!("Build directory not found: {}", plan.cwd().display());
        warn!("{}: {}", reporter.repo(), message);
        let command = CommandRecord {
            cmd: "skip build".to_string(),
            code: -1,
            stdout: String::new(),
            stderr: message.clone(),
        };
        let step = reporter.fail(
            PhaseError::new(PhaseErrorKind::ProcessLaunchFailure, message),
            PhaseUpdate::default(),
        );
        return BuildOutcome {
            command,
            step,
            artifacts: Vec::new(),
        };
    }

    let mut task = ProcessTask::spawn(plan.spec.clone());
    let mut publisher = StreamPublisher::new();
    let mut code = -1;
    let mut launch_error = None;

    while let Some(event) = task.next().await {
        match event {
            ProcessEvent::Stdout(_) | ProcessEvent::Stderr(_) => publisher.publish(&mut reporter, &event),
            ProcessEvent::Exited(c) => code = c,
            ProcessEvent::LaunchFailed(msg) => launch_error = Some(msg),
            ProcessEvent::Cancelled => launch_error = Some(format!("`{}` was cancelled", cmd)),
        }
    }
    publisher.flush(&mut reporter);

    let (stdout, mut stderr) = publisher.into_output();
    if let Some(msg) = &launch_error {
        if !stderr.is_empty() && !stderr.ends_with('\n') {
            stderr.push('\n');
        }
        stderr.push_str(msg);
    }
    reporter.append_output(&stdout);
    reporter.append_output(&stderr);

    let update = PhaseUpdate::default().with_output(&stdout, &stderr);
    let command = CommandRecord {
        cmd: cmd.clone(),
        code,
        stdout: stdout.clone(),
        stderr: stderr.clone(),
    };

    if let Some(msg) = launch_error {
        let step = reporter.fail(PhaseError::new(PhaseErrorKind::ProcessLaunchFailure, msg), update);
        return BuildOutcome {
            command,
            step,
            artifacts: Vec::new(),
        };
    }

    if code != 0 {
        let message = format!("`{}` exited with {}", cmd, code);
        warn!("{}: {}", reporter.repo(), message);
        let step = reporter.fail(PhaseError::new(PhaseErrorKind::NonZeroExit, message), update);
        return BuildOutcome {
            command,
            step,
            artifacts: Vec::new(),
        };
    }

    let artifacts = match find_artifacts(&plan.output_dir, &plan.extension).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            warn!(
                "{}: failed to scan {}: {}",
                reporter.repo(),
                plan.output_dir.display(),
                e
            );
            Vec::new()
        }
    };

    let mut outcome = BuildOutcome {
        command,
        step: PhaseStep::pending(reporter.phase()),
        artifacts,
    };
    outcome.step = match outcome.artifact_list() {
        Some(list) => {
            info!("{}: built {}", reporter.repo(), list);
            reporter.succeed(update.with_war_path(list))
        }
        None => {
            info!("{}: {}", reporter.repo(), NO_ARTIFACT_DETAIL);
            let mut update = update;
            update.detail = Some(NO_ARTIFACT_DETAIL.to_string());
            reporter.succeed(update)
        }
    };
    outcome
}
