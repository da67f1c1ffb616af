//! Bringing a working copy to its trunk branch

use std::path::Path;

use openapi_server::models::{CommandRecord, PhaseError, PhaseErrorKind, PhaseStep};
use tracing::{debug, info, warn};

use crate::deploy::process::{run_command, ProcessSpec};
use crate::progress::reporter::{PhaseReporter, PhaseUpdate};

/// Trunk branch names, in order of preference
pub const TRUNK_BRANCHES: [&str; 2] = ["master", "main"];

/// Result of synchronizing one working copy
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub branch: String,
    pub commands: Vec<CommandRecord>,
    pub step: PhaseStep,
}

fn git(path: &Path, args: &[&str]) -> ProcessSpec {
    ProcessSpec::new("git", args, path)
}

/// Find the preferred trunk branch.
///
/// Each name is tried locally, then as its `origin/` remote branch. Only the
/// successful probe is returned, or the last failed one when nothing resolved.
pub async fn resolve_trunk(path: &Path) -> (Option<String>, Vec<CommandRecord>) {
    let mut last = None;

    for branch in TRUNK_BRANCHES {
        for candidate in [branch.to_string(), format!("origin/{}", branch)] {
            let probe = run_command(git(path, &["rev-parse", "--verify", &candidate])).await;
            if probe.succeeded() {
                debug!("Resolved trunk {} via {}", branch, candidate);
                return (Some(branch.to_string()), vec![probe]);
            }
            last = Some(probe);
        }
    }

    (None, last.into_iter().collect())
}

/// Fetch, check out the trunk branch and fast-forward it.
///
/// Sub-command failures are recorded, never raised. The phase fails only
/// when the checkout or the update fails.
pub async fn sync_trunk(mut reporter: PhaseReporter<'_>, path: &Path) -> SyncOutcome {
    let mut commands = Vec::new();
    let mut notes = Vec::new();

    reporter.progress(PhaseUpdate::stdout(format!(
        "$ cd {}\n$ git fetch --all --prune",
        path.display()
    )));
    let fetch = run_command(git(path, &["fetch", "--all", "--prune"])).await;
    if !fetch.succeeded() {
        notes.push(format!("fetch failed: {}", fetch.stderr));
    }
    commands.push(fetch);

    let (resolved, probes) = resolve_trunk(path).await;
    commands.extend(probes);
    let branch = match resolved {
        Some(branch) => branch,
        None => {
            warn!("{}: neither master nor main resolved, trying master", reporter.repo());
            notes.push("neither master nor main resolved; trying master".to_string());
            TRUNK_BRANCHES[0].to_string()
        }
    };

    reporter.progress(PhaseUpdate::stdout(format!("$ git checkout {}", branch)));
    let checkout = run_command(git(path, &["checkout", &branch])).await;

    reporter.progress(PhaseUpdate::stdout("$ git pull --ff-only"));
    let pull = run_command(git(path, &["pull", "--ff-only"])).await;

    commands.push(checkout.clone());
    commands.push(pull.clone());

    for record in &commands {
        reporter.append_output(&record.stdout);
        reporter.append_output(&record.stderr);
    }

    let stdout = join_non_empty([checkout.stdout.as_str(), pull.stdout.as_str()]);
    let stderr = join_non_empty([checkout.stderr.as_str(), pull.stderr.as_str()]);
    let mut update = PhaseUpdate::default()
        .with_branch(branch.clone())
        .with_output(&stdout, &stderr);

    let failed = [&checkout, &pull].into_iter().find(|r| !r.succeeded());
    let step = match failed {
        None => {
            info!("{}: on {}", reporter.repo(), branch);
            if !notes.is_empty() {
                update.detail = Some(notes.join("; "));
            }
            reporter.succeed(update)
        }
        Some(record) => {
            let message = format!("`{}` exited with {}: {}", record.cmd, record.code, record.stderr);
            notes.push(message.clone());
            update.detail = Some(notes.join("; "));
            reporter.fail(PhaseError::new(PhaseErrorKind::SyncFailure, message), update)
        }
    };

    SyncOutcome {
        branch,
        commands,
        step,
    }
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
