//! Running a sync plan against a working copy
//!
//! Each branch of a runnable rule is checked out, fast-forwarded from the
//! source remote and pushed under the same reference name to the target
//! remote. Under [`FailurePolicy::Abort`] the first failed operation ends the
//! whole run; under [`FailurePolicy::Continue`] it is recorded in the report
//! and the executor moves on to the next branch.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    BranchOutcome, BranchReport, RepositoryState, RuleOutcome, RuleReport, RunReport, Stage,
    SyncPlan,
};
use crate::config::SyncRule;
use crate::git::{GitError, PullOutcome, VersionControl, mirror_refspec};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run at the first failed operation
    #[default]
    Abort,
    /// Record the failure and carry on with the next branch
    Continue,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{stage} of branch {branch} failed")]
    Operation {
        stage: Stage,
        branch: String,
        #[source]
        source: GitError,
    },

    #[error("branch {0} is not in the repository snapshot")]
    UnknownBranch(String),
}

impl SyncError {
    /// The step that failed. A branch unknown to the snapshot never got past checkout.
    pub fn stage(&self) -> Stage {
        match self {
            SyncError::Operation { stage, .. } => *stage,
            SyncError::UnknownBranch(_) => Stage::Checkout,
        }
    }

    /// The message with every underlying cause appended.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}

fn failed_at(stage: Stage, branch: &str) -> impl FnOnce(GitError) -> SyncError + '_ {
    move |source| SyncError::Operation {
        stage,
        branch: branch.to_string(),
        source,
    }
}

pub struct SyncExecutor<'a, V: VersionControl + ?Sized> {
    vcs: &'a V,
    state: &'a RepositoryState,
    policy: FailurePolicy,
}

impl<'a, V: VersionControl + ?Sized> SyncExecutor<'a, V> {
    pub fn new(vcs: &'a V, state: &'a RepositoryState) -> Self {
        Self {
            vcs,
            state,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run every runnable rule of `plan` in order. Skipped rules are reported, not run.
    pub fn execute(&self, plan: &SyncPlan<'_>) -> Result<RunReport, SyncError> {
        let mut report = RunReport::default();

        for verdict in plan.verdicts() {
            let rule = verdict.rule;
            let outcome = if verdict.is_runnable() {
                info!(
                    "syncing {} from {} to {}",
                    rule.branches.join(", "),
                    rule.source_remote,
                    rule.target_remote
                );
                RuleOutcome::Executed {
                    branches: self.run_rule(rule)?,
                }
            } else {
                RuleOutcome::Skipped {
                    unmet: verdict.unmet.clone(),
                }
            };

            report.rules.push(RuleReport {
                source_remote: rule.source_remote.clone(),
                target_remote: rule.target_remote.clone(),
                outcome,
            });
        }

        Ok(report)
    }

    /// Sync each branch of `rule` in declaration order.
    pub fn run_rule(&self, rule: &SyncRule) -> Result<Vec<BranchReport>, SyncError> {
        let mut reports = Vec::with_capacity(rule.branches.len());

        for branch in &rule.branches {
            let outcome = match self.sync_branch(rule, branch) {
                Ok(pull) => BranchOutcome::Synced { pull },
                Err(err) if self.policy == FailurePolicy::Continue => {
                    let message = err.detail();
                    warn!("{message}");
                    BranchOutcome::Failed {
                        stage: err.stage(),
                        message,
                    }
                }
                Err(err) => return Err(err),
            };

            reports.push(BranchReport {
                branch: branch.clone(),
                outcome,
            });
        }

        Ok(reports)
    }

    fn sync_branch(&self, rule: &SyncRule, branch: &str) -> Result<PullOutcome, SyncError> {
        let canonical = self
            .state
            .canonical(branch)
            .ok_or_else(|| SyncError::UnknownBranch(branch.to_string()))?;

        debug!("checking out {} as {}", branch, canonical);
        self.vcs
            .checkout(canonical)
            .map_err(failed_at(Stage::Checkout, branch))?;

        debug!("pulling changes on {} from {}", branch, rule.source_remote);
        let pull = self
            .vcs
            .pull(&rule.source_remote, canonical)
            .map_err(failed_at(Stage::Pull, branch))?;
        match pull {
            PullOutcome::UpToDate => debug!("{} already up to date", branch),
            PullOutcome::FastForwarded { from, to } => {
                debug!("{} fast-forwarded {} -> {}", branch, from, to)
            }
        }

        let refspec = mirror_refspec(canonical);
        debug!("pushing changes on {} to {} ({})", branch, rule.target_remote, refspec);
        self.vcs
            .push(&rule.target_remote, &refspec)
            .map_err(failed_at(Stage::Push, branch))?;

        Ok(pull)
    }
}
