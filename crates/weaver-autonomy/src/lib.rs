//! Weaver Autonomy - governed generate → write → commit cycles
//!
//! - guard: fail-safe policy gate over the governance guard config
//! - proposal: read-only counterpart used when autonomy is disallowed
//! - wait: cancellable pause between cycles
//! - collaborators: explicit context holding generator, workspace and VCS
//! - scheduler: the bounded cycle loop and its run state
//! - status: derived status report and atomic export
//! - scheduled: the governed single-run entry point

pub mod collaborators;
pub mod guard;
pub mod proposal;
pub mod scheduled;
pub mod scheduler;
pub mod status;
pub mod wait;

pub use collaborators::{CollaboratorStatus, Collaborators};
pub use guard::{AutonomyGuard, BatchVerdict, ConditionReport, Decision};
pub use proposal::{ChangeProposal, Proposal, ProposalEngine, Risk};
pub use scheduled::{run_scheduled_once, ScheduledOptions, ScheduledOutcome, SkipReason};
pub use scheduler::{CycleMetrics, CycleScheduler, RunSummary, SchedulerConfig};
pub use status::{export_status, StatusReport, SystemPhase};
pub use tokio_util::sync::CancellationToken;
pub use wait::{CycleWait, ImmediateWait, SleepWait, WaitOutcome};
