//! Governed single run, meant to be fired by cron or CI.
//!
//! Preconditions are checked in a fixed order and the first failure wins:
//! 1. every governance document parsed, `autonomy.json` present and valid
//! 2. required environment values match
//! 3. `enabled` is true
//! 4. the approver is a known role (skipped without `roles.json`)
//! 5. the guard allows autonomy
//!
//! A run that fails step 5 still yields a proposal for a human to review.

use crate::collaborators::Collaborators;
use crate::guard::AutonomyGuard;
use crate::proposal::{Proposal, ProposalEngine};
use crate::scheduler::{CycleScheduler, RunSummary, SchedulerConfig};
use crate::status::StatusReport;
use crate::wait::CycleWait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use weaver_core::Governance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidConfig,
    EnvMismatch,
    Disabled,
    ApprovalMissing,
    AutonomyDisallowed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidConfig => "invalid_config",
            Self::EnvMismatch => "env_mismatch",
            Self::Disabled => "disabled",
            Self::ApprovalMissing => "approval_missing",
            Self::AutonomyDisallowed => "autonomy_disallowed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledOptions {
    pub initial_task: String,
    /// Used when `autonomy.json` has no `run_depth`.
    pub default_depth: u32,
    pub interval: Duration,
}

impl Default for ScheduledOptions {
    fn default() -> Self {
        Self {
            initial_task: "autonomous scheduled run".to_string(),
            default_depth: 1,
            interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduledOutcome {
    pub ran: bool,
    pub reason: Option<SkipReason>,
    /// Human-readable detail for `reason`.
    pub detail: Option<String>,
    pub proposal: Option<Proposal>,
    pub commits: Vec<String>,
    pub commit_count: usize,
    /// More commits landed than `max_commits_per_run` allows.
    pub flagged_for_review: bool,
    pub summary: Option<RunSummary>,
    pub status: Option<StatusReport>,
}

impl ScheduledOutcome {
    fn skipped(reason: SkipReason, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        warn!("Scheduled run skipped ({}): {}", reason, detail);
        Self {
            reason: Some(reason),
            detail: Some(detail),
            ..Default::default()
        }
    }
}

pub async fn run_scheduled_once(
    governance: &Governance,
    collaborators: Collaborators,
    wait: Arc<dyn CycleWait>,
    options: &ScheduledOptions,
    env: impl Fn(&str) -> Option<String>,
) -> ScheduledOutcome {
    if let Some(detail) = governance.load_error() {
        return ScheduledOutcome::skipped(SkipReason::InvalidConfig, detail);
    }
    let Some(autonomy) = governance.autonomy.as_ref() else {
        return ScheduledOutcome::skipped(SkipReason::InvalidConfig, "autonomy.json not found");
    };
    if let Err(e) = autonomy.validate() {
        return ScheduledOutcome::skipped(SkipReason::InvalidConfig, e.to_string());
    }

    let mismatched = autonomy.env_mismatches(&env);
    if !mismatched.is_empty() {
        return ScheduledOutcome::skipped(
            SkipReason::EnvMismatch,
            format!("required environment not satisfied: {}", mismatched.join(", ")),
        );
    }

    if !autonomy.enabled {
        return ScheduledOutcome::skipped(SkipReason::Disabled, "autonomy disabled");
    }

    if let Some(roles) = &governance.roles {
        if !roles.contains(&autonomy.approved_by) {
            return ScheduledOutcome::skipped(
                SkipReason::ApprovalMissing,
                format!("approver '{}' is not a registered role", autonomy.approved_by),
            );
        }
    }

    let guard = AutonomyGuard::new(autonomy.guard.clone());
    if !guard.allowed() {
        let mut outcome = ScheduledOutcome::skipped(
            SkipReason::AutonomyDisallowed,
            "guard policy disallows autonomy",
        );
        outcome.proposal = Some(ProposalEngine::new().propose(&options.initial_task));
        return outcome;
    }

    let config = SchedulerConfig {
        enabled: true,
        depth: autonomy.run_depth.unwrap_or(options.default_depth),
        interval: options.interval,
        initial_task: options.initial_task.clone(),
    };
    info!(
        "Scheduled run approved by {}: depth={}",
        autonomy.approved_by, config.depth
    );
    let mut scheduler = CycleScheduler::new(config, collaborators.with_guard(guard), wait);
    let summary = scheduler.start().await;
    let status = scheduler.report(governance).await;

    let commit_count = summary.commits.len();
    let max = autonomy.max_commits_per_run as usize;
    let flagged_for_review = max > 0 && commit_count > max;
    if flagged_for_review {
        warn!(
            "Scheduled run made {} commits, above the limit of {}; flagged for review",
            commit_count, max
        );
    }

    ScheduledOutcome {
        ran: true,
        reason: None,
        detail: None,
        proposal: None,
        commits: summary.commits.clone(),
        commit_count,
        flagged_for_review,
        summary: Some(summary),
        status: Some(status),
    }
}
