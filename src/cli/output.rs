//! Terminal output for gitsync
//!
//! Log lines go through `tracing`. This handler covers what is printed
//! directly: the version banner and the end-of-run summary.

use console::style;

use crate::git::PullOutcome;
use crate::sync::{BranchOutcome, RuleOutcome, RunReport};

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
}

impl Output {
    /// Create a new output handler
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an unstyled line, used for the banner
    pub fn plain(&self, message: &str) {
        println!("{message}");
    }

    /// Print a header/title
    pub fn header(&self, title: &str) {
        println!("\n{}", style(title).bold().underlined());
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    /// Print an action result with consistent styling
    pub fn action_result(&self, action: &str, result: &str, success: bool) {
        let icon = if success { "✓" } else { "✗" };
        let styled_icon = if success {
            style(icon).green().bold()
        } else {
            style(icon).red().bold()
        };
        println!(
            "{} {} {}",
            styled_icon,
            style(action).bold(),
            style(result).dim()
        );
    }

    /// Print summary statistics with enhanced styling
    pub fn summary_stats(&self, label: &str, value: usize) {
        println!("  {} {}", style(label).dim(), style(value.to_string()).bold());
    }

    /// Per-rule, per-branch summary of a run.
    ///
    /// Only printed in verbose mode, or when at least one branch failed.
    pub fn run_summary(&self, report: &RunReport) {
        if !self.verbose && report.is_success() {
            return;
        }

        self.header("Sync summary");
        for rule in &report.rules {
            let pair = format!("{} -> {}", rule.source_remote, rule.target_remote);
            match &rule.outcome {
                RuleOutcome::Skipped { unmet } => {
                    let reasons: Vec<String> = unmet.iter().map(ToString::to_string).collect();
                    self.warning(&format!("{pair} skipped: {}", reasons.join("; ")));
                }
                RuleOutcome::Executed { branches } => {
                    for branch in branches {
                        match &branch.outcome {
                            BranchOutcome::Synced { pull } => self.action_result(
                                &branch.branch,
                                &format!("{pair} ({})", describe_pull(pull)),
                                true,
                            ),
                            BranchOutcome::Failed { message, .. } => {
                                self.action_result(&branch.branch, message, false)
                            }
                        }
                    }
                }
            }
        }

        self.summary_stats("synced:", report.synced_count());
        self.summary_stats("failed:", report.failed_count());
        self.summary_stats("rules skipped:", report.skipped_count());
    }
}

fn describe_pull(pull: &PullOutcome) -> String {
    match pull {
        PullOutcome::UpToDate => "up to date".to_string(),
        PullOutcome::FastForwarded { from, to } => {
            let (from, to) = (from.to_string(), to.to_string());
            format!("{}..{}", &from[..7], &to[..7])
        }
    }
}
