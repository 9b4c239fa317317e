use std::fmt;

use crate::git::PullOutcome;

use super::Unmet;

/// Step of a branch sync. A branch moves checkout → pull → push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Checkout,
    Pull,
    Push,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Checkout => "checkout",
            Stage::Pull => "pull",
            Stage::Push => "push",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    Synced { pull: PullOutcome },
    Failed { stage: Stage, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchReport {
    pub branch: String,
    pub outcome: BranchOutcome,
}

impl BranchReport {
    pub fn is_synced(&self) -> bool {
        matches!(self.outcome, BranchOutcome::Synced { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Skipped { unmet: Vec<Unmet> },
    Executed { branches: Vec<BranchReport> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub source_remote: String,
    pub target_remote: String,
    pub outcome: RuleOutcome,
}

/// Outcome of every rule of a run, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rules: Vec<RuleReport>,
}

impl RunReport {
    pub fn branches(&self) -> impl Iterator<Item = &BranchReport> {
        self.rules.iter().flat_map(|rule| match &rule.outcome {
            RuleOutcome::Executed { branches } => branches.as_slice(),
            RuleOutcome::Skipped { .. } => [].as_slice(),
        })
    }

    pub fn synced_count(&self) -> usize {
        self.branches().filter(|branch| branch.is_synced()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.branches().filter(|branch| !branch.is_synced()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rules
            .iter()
            .filter(|rule| matches!(rule.outcome, RuleOutcome::Skipped { .. }))
            .count()
    }

    /// True when no branch failed. Skipped rules do not count as failures.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}
