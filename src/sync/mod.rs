//! Branch mirroring between remotes
//!
//! A run is a single sequential pass:
//!
//! 1. [`RepositoryState::capture`] snapshots the working copy's branches and remotes.
//! 2. [`SyncPlan::build`] decides which configured rules can run against that snapshot.
//! 3. [`SyncExecutor::execute`] checks out, pulls and pushes every branch of every
//!    runnable rule, in declaration order.
//!
//! The snapshot is never refreshed while the executor runs, even though
//! checkout and pull change the repository underneath it.

pub mod executor;
pub mod plan;
pub mod report;

pub use executor::{FailurePolicy, SyncError, SyncExecutor};
pub use plan::{RuleVerdict, SyncPlan, Unmet};
pub use report::{BranchOutcome, BranchReport, RuleOutcome, RuleReport, RunReport, Stage};

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::git::{BranchRef, GitError, VersionControl};

/// Branches and remotes of a working copy at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryState {
    branches: BTreeMap<String, String>,
    remotes: BTreeSet<String>,
}

impl RepositoryState {
    pub fn new<B, R>(branches: B, remotes: R) -> Self
    where
        B: IntoIterator<Item = BranchRef>,
        R: IntoIterator<Item = String>,
    {
        Self {
            branches: branches
                .into_iter()
                .map(|branch| (branch.short, branch.canonical))
                .collect(),
            remotes: remotes.into_iter().collect(),
        }
    }

    /// Read the current branches and remotes from `vcs`.
    pub fn capture<V: VersionControl + ?Sized>(vcs: &V) -> Result<Self, GitError> {
        let state = Self::new(vcs.branches()?, vcs.remotes()?);
        debug!("repository branches: {:?}", state.branches);
        debug!("repository remotes: {:?}", state.remotes);
        Ok(state)
    }

    pub fn has_remote(&self, name: &str) -> bool {
        self.remotes.contains(name)
    }

    pub fn has_branch(&self, short: &str) -> bool {
        self.branches.contains_key(short)
    }

    /// Canonical reference name of a local branch.
    pub fn canonical(&self, short: &str) -> Option<&str> {
        self.branches.get(short).map(String::as_str)
    }

    pub fn branches(&self) -> &BTreeMap<String, String> {
        &self.branches
    }

    pub fn remotes(&self) -> &BTreeSet<String> {
        &self.remotes
    }
}
