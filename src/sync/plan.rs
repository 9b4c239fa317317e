//! Deciding which sync rules can run
//!
//! A rule is runnable when both of its remotes and every one of its branches
//! exist in the repository snapshot. Rules that are not runnable are skipped;
//! they never fail the run.

use std::fmt;
use tracing::debug;

use super::RepositoryState;
use crate::config::{SyncConfiguration, SyncRule};

/// A prerequisite of a rule that the repository does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmet {
    MissingSourceRemote(String),
    MissingTargetRemote(String),
    MissingBranch(String),
}

impl fmt::Display for Unmet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unmet::MissingSourceRemote(name) => write!(f, "{name} source remote doesn't exist"),
            Unmet::MissingTargetRemote(name) => write!(f, "{name} target remote doesn't exist"),
            Unmet::MissingBranch(name) => write!(f, "{name} branch doesn't exist"),
        }
    }
}

/// Every prerequisite of `rule` missing from `state`, source remote first,
/// then target remote, then branches in declaration order.
pub fn check_rule(rule: &SyncRule, state: &RepositoryState) -> Vec<Unmet> {
    let mut unmet = Vec::new();

    if !state.has_remote(&rule.source_remote) {
        unmet.push(Unmet::MissingSourceRemote(rule.source_remote.clone()));
    }
    if !state.has_remote(&rule.target_remote) {
        unmet.push(Unmet::MissingTargetRemote(rule.target_remote.clone()));
    }
    for branch in &rule.branches {
        if !state.has_branch(branch) {
            unmet.push(Unmet::MissingBranch(branch.clone()));
        }
    }

    unmet
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict<'a> {
    pub rule: &'a SyncRule,
    pub unmet: Vec<Unmet>,
}

impl RuleVerdict<'_> {
    pub fn is_runnable(&self) -> bool {
        self.unmet.is_empty()
    }
}

/// One verdict per configured rule, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan<'a> {
    verdicts: Vec<RuleVerdict<'a>>,
}

impl<'a> SyncPlan<'a> {
    pub fn build(config: &'a SyncConfiguration, state: &RepositoryState) -> Self {
        let verdicts = config
            .rules()
            .iter()
            .map(|rule| {
                debug!(
                    "syncing {} branches between {} and {}",
                    rule.branches.len(),
                    rule.source_remote,
                    rule.target_remote
                );
                let unmet = check_rule(rule, state);
                for reason in &unmet {
                    debug!("{reason}");
                }
                if !unmet.is_empty() {
                    debug!("attempting this sync would fail, skipping");
                }
                RuleVerdict { rule, unmet }
            })
            .collect();

        Self { verdicts }
    }

    pub fn verdicts(&self) -> &[RuleVerdict<'a>] {
        &self.verdicts
    }

    pub fn runnable(&self) -> impl Iterator<Item = &SyncRule> + '_ {
        self.verdicts
            .iter()
            .filter(|verdict| verdict.is_runnable())
            .map(|verdict| verdict.rule)
    }

    pub fn runnable_count(&self) -> usize {
        self.runnable().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::BranchRef;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn state(branches: &[&str], remotes: &[&str]) -> RepositoryState {
        RepositoryState::new(
            branches.iter().map(|b| BranchRef::new(*b)),
            remotes.iter().map(|r| r.to_string()),
        )
    }

    #[test]
    fn test_runnable_rule() {
        let state = state(&["main"], &["origin", "internal"]);
        let rule = SyncRule::new("origin", "internal", ["main"]);
        assert!(check_rule(&rule, &state).is_empty());
    }

    #[test]
    fn test_missing_target_remote() {
        let state = state(&["main"], &["origin"]);
        let rule = SyncRule::new("origin", "internal", ["main"]);
        assert_eq!(
            check_rule(&rule, &state),
            vec![Unmet::MissingTargetRemote("internal".to_string())]
        );
    }

    #[test]
    fn test_reports_every_unmet_prerequisite() {
        let state = state(&["main"], &[]);
        let rule = SyncRule::new("origin", "internal", ["main", "dev", "release"]);
        assert_eq!(
            check_rule(&rule, &state),
            vec![
                Unmet::MissingSourceRemote("origin".to_string()),
                Unmet::MissingTargetRemote("internal".to_string()),
                Unmet::MissingBranch("dev".to_string()),
                Unmet::MissingBranch("release".to_string()),
            ]
        );
    }

    #[test]
    fn test_unmet_messages() {
        assert_eq!(
            Unmet::MissingTargetRemote("internal".to_string()).to_string(),
            "internal target remote doesn't exist"
        );
        assert_eq!(
            Unmet::MissingBranch("dev".to_string()).to_string(),
            "dev branch doesn't exist"
        );
    }

    #[test]
    fn test_plan_keeps_declaration_order() {
        let config = SyncConfiguration::new(vec![
            SyncRule::new("origin", "internal", ["main"]),
            SyncRule::new("origin", "missing", ["main"]),
            SyncRule::new("origin", "backup", ["main"]),
        ]);
        let state = state(&["main"], &["origin", "internal", "backup"]);

        let plan = SyncPlan::build(&config, &state);
        let runnable: Vec<_> = plan.verdicts().iter().map(|v| v.is_runnable()).collect();
        assert_eq!(runnable, vec![true, false, true]);

        let targets: Vec<_> = plan.runnable().map(|r| r.target_remote.as_str()).collect();
        assert_eq!(targets, vec!["internal", "backup"]);
        assert_eq!(plan.runnable_count(), 2);
    }

    #[test]
    fn test_empty_config_plans_nothing() {
        let config = SyncConfiguration::default();
        let plan = SyncPlan::build(&config, &state(&["main"], &["origin"]));
        assert!(plan.verdicts().is_empty());
        assert_eq!(plan.runnable_count(), 0);
    }

    const NAMES: &[&str] = &["origin", "internal", "main", "dev", "ci", "backup"];

    fn names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(NAMES).prop_map(str::to_string), 0..5)
    }

    proptest! {
        #[test]
        fn test_runnable_iff_all_prerequisites_exist(
            branches in names(),
            remotes in names(),
            source in prop::sample::select(NAMES),
            target in prop::sample::select(NAMES),
            wanted in prop::collection::vec(prop::sample::select(NAMES), 1..4),
        ) {
            let state = RepositoryState::new(
                branches.iter().map(|b| BranchRef::new(b.as_str())),
                remotes.iter().cloned(),
            );
            let rule = SyncRule::new(source, target, wanted.iter().copied());

            let remote_set: BTreeSet<&str> = remotes.iter().map(String::as_str).collect();
            let branch_set: BTreeSet<&str> = branches.iter().map(String::as_str).collect();
            let expected = remote_set.contains(source)
                && remote_set.contains(target)
                && wanted.iter().all(|b| branch_set.contains(b));

            let config = SyncConfiguration::new(vec![rule]);
            let plan = SyncPlan::build(&config, &state);
            prop_assert_eq!(plan.verdicts()[0].is_runnable(), expected);
        }
    }
}
