//! The sync run
//!
//! Startup checks (repo dir, sync file) all happen before the repository is
//! opened, so a bad config never touches the working copy.

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::Output;
use crate::config::{Settings, SyncConfiguration};
use crate::git::GitRepo;
use crate::sync::{FailurePolicy, RepositoryState, SyncExecutor, SyncPlan};

use super::version;

/// Logged when a run completes without errors
pub const COMPLETION_MESSAGE: &str = "gitsync has finished processing";

pub fn execute(settings: &Settings, output: &Output) -> Result<()> {
    output.plain(&version::banner());
    info!("config path: {}", settings.config.display());

    let repo_dir = settings
        .repo_dir()
        .context("can't get current working directory")?;
    if !repo_dir.is_dir() {
        bail!("directory to work in does not exist: {}", repo_dir.display());
    }

    let config = SyncConfiguration::load(&settings.config, settings.insecure)?;

    let repo = GitRepo::open(&repo_dir)?;
    let state = RepositoryState::capture(&repo)
        .with_context(|| format!("could not inspect repository {}", repo_dir.display()))?;

    let plan = SyncPlan::build(&config, &state);
    let policy = if settings.keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };

    let report = SyncExecutor::new(&repo, &state)
        .with_policy(policy)
        .execute(&plan)?;
    output.run_summary(&report);

    if !report.is_success() {
        bail!(
            "{} of {} branch syncs failed",
            report.failed_count(),
            report.failed_count() + report.synced_count()
        );
    }

    info!("{COMPLETION_MESSAGE}");
    Ok(())
}
