//! Cycle scheduler: bounded generate → write → commit loop.
//!
//! Cycles run strictly one after another. A run stops when:
//! - `depth` cycles have run
//! - a cycle produced zero updates and zero errors (converged)
//! - the cancel token fired
//!
//! A failing cycle, including one whose reply tried to write outside the
//! repository root, is recorded against that cycle and the run moves on.

use crate::collaborators::{CollaboratorStatus, Collaborators};
use crate::guard::Decision;
use crate::status::{StatusReport, SystemPhase, NO_ACTIVITY, SUMMARY_MAX_CHARS};
use crate::wait::{CycleWait, WaitOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use weaver_core::config::EngineConfig;
use weaver_core::{sanitize, Error, Governance};
use weaver_llm::{build_prompt, parse_file_blocks};

/// How many commit messages the report pulls from history when the run
/// itself committed nothing.
const HISTORY_COMMITS: usize = 3;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub depth: u32,
    pub interval: Duration,
    pub initial_task: String,
}

impl From<&EngineConfig> for SchedulerConfig {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            enabled: engine.enabled,
            depth: engine.depth,
            interval: Duration::from_millis(engine.interval_ms),
            initial_task: engine.initial_task.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleMetrics {
    pub cycle: u32,
    pub duration_ms: u64,
    /// Paths whose content actually changed.
    pub updated: Vec<String>,
    /// Commit message, when a commit landed.
    pub committed: Option<String>,
    /// Paths the guard kept from being written.
    pub denied: Vec<String>,
    /// Sanitized single-line error.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub cycles_run: u32,
    pub updates: Vec<String>,
    pub commits: Vec<String>,
    pub errors: Vec<String>,
    /// Set when the run could not start (missing collaborators).
    pub halted: Option<String>,
    pub cancelled: bool,
}

pub struct CycleScheduler {
    config: SchedulerConfig,
    collaborators: Collaborators,
    wait: Arc<dyn CycleWait>,
    cancel: CancellationToken,

    current_cycle: u32,
    total_cycles: u64,
    updates: Vec<String>,
    commits: Vec<String>,
    errors: Vec<String>,
    metrics: Vec<CycleMetrics>,
}

impl CycleScheduler {
    pub fn new(config: SchedulerConfig, collaborators: Collaborators, wait: Arc<dyn CycleWait>) -> Self {
        Self {
            config,
            collaborators,
            wait,
            cancel: CancellationToken::new(),
            current_cycle: 0,
            total_cycles: 0,
            updates: Vec::new(),
            commits: Vec::new(),
            errors: Vec::new(),
            metrics: Vec::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn set_depth(&mut self, depth: u32) {
        info!("Setting scheduler depth: {}", depth);
        self.config.depth = depth;
    }

    /// Token that stops the run between cycles. Once cancelled the scheduler
    /// stays stopped.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stop(&self) {
        info!("Stopping scheduler");
        self.cancel.cancel();
    }

    pub fn ready(&self) -> bool {
        self.config.enabled && self.collaborators.missing().is_empty()
    }

    pub async fn validate(&self) -> BTreeMap<&'static str, CollaboratorStatus> {
        self.collaborators.validate().await
    }

    pub fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    /// Cycles run across every `start` of this scheduler.
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn metrics(&self) -> &[CycleMetrics] {
        &self.metrics
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub async fn start(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        if !self.config.enabled {
            warn!("Scheduler not enabled; skipping start");
            return summary;
        }

        self.current_cycle = 0;
        self.updates.clear();
        self.commits.clear();
        self.errors.clear();
        self.metrics.clear();

        let missing = self.collaborators.missing();
        if !missing.is_empty() {
            let reason = format!("missing collaborators: {}", missing.join(", "));
            warn!("Scheduler not ready: {}", reason);
            self.errors.push(reason.clone());
            summary.errors = self.errors.clone();
            summary.halted = Some(reason);
            return summary;
        }

        info!(
            "Starting scheduler: depth={} interval={:?}",
            self.config.depth, self.config.interval
        );
        for cycle in 1..=self.config.depth {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            self.current_cycle = cycle;
            let metrics = self.run_cycle(cycle).await;
            let converged = metrics.updated.is_empty() && metrics.error.is_none();
            self.total_cycles += 1;
            summary.cycles_run += 1;
            self.metrics.push(metrics);

            if converged {
                info!("No updates in cycle {}; stopping early", cycle);
                break;
            }
            if cycle < self.config.depth
                && self.wait.wait(self.config.interval, &self.cancel).await == WaitOutcome::Cancelled
            {
                info!("Run cancelled after cycle {}", cycle);
                summary.cancelled = true;
                break;
            }
        }

        info!("Scheduler completed {} cycles", summary.cycles_run);
        summary.updates = self.updates.clone();
        summary.commits = self.commits.clone();
        summary.errors = self.errors.clone();
        summary
    }

    async fn run_cycle(&mut self, cycle: u32) -> CycleMetrics {
        let started = Instant::now();
        let task = format!("{} [cycle {}]", self.config.initial_task, cycle);
        info!("Running cycle {}: {}", cycle, task);

        let mut metrics = CycleMetrics {
            cycle,
            ..Default::default()
        };
        if let Err(e) = self.cycle_body(cycle, &task, &mut metrics).await {
            let line = sanitize::error_line(&e.to_string());
            if e.is_boundary_breach() {
                error!("Cycle {} refused a write: {}", cycle, line);
            } else {
                warn!("Cycle {} failed: {}", cycle, line);
            }
            self.errors.push(line.clone());
            metrics.error = Some(line);
        }

        self.updates.extend(metrics.updated.iter().cloned());
        if let Some(message) = &metrics.committed {
            self.commits.push(message.clone());
        }
        metrics.duration_ms = started.elapsed().as_millis() as u64;
        info!("Cycle {} completed in {}ms", cycle, metrics.duration_ms);
        metrics
    }

    async fn cycle_body(
        &self,
        cycle: u32,
        task: &str,
        metrics: &mut CycleMetrics,
    ) -> weaver_core::Result<()> {
        let c = &self.collaborators;
        let (Some(generator), Some(workspace), Some(vcs)) = (&c.generator, &c.workspace, &c.vcs)
        else {
            return Err(Error::config("collaborator missing"));
        };

        let snapshot = workspace.snapshot().await?;
        let prompt = build_prompt(task, &snapshot);
        let reply = generator
            .generate(&prompt)
            .await
            .map_err(|e| Error::generation(generator.name(), e.to_string()))?;

        let mut blocks = parse_file_blocks(&reply);
        if blocks.is_empty() {
            info!("No file blocks in reply for cycle {}", cycle);
            return Ok(());
        }

        if let Some(guard) = &c.guard {
            let verdict = guard.evaluate(&blocks);
            for path in &verdict.forbidden {
                warn!("Guard denied write to forbidden path {}", path);
            }
            metrics.denied.extend(verdict.forbidden);
            match verdict.decision {
                Decision::Allow => blocks = verdict.allowed,
                Decision::Deny(reason) => {
                    warn!("Guard denied batch in cycle {}: {}", cycle, reason);
                    metrics
                        .denied
                        .extend(verdict.allowed.into_iter().map(|b| b.path));
                    return Ok(());
                }
            }
        }

        // A single escaping path rejects the whole batch before any write.
        for block in &blocks {
            workspace.resolve(&block.path)?;
        }
        for block in &blocks {
            if workspace.write_file(&block.path, &block.content).await? {
                metrics.updated.push(block.path.clone());
            }
        }

        if metrics.updated.is_empty() {
            return Ok(());
        }
        let message = format!("weaver: auto update - {}", task);
        let mut meta = BTreeMap::new();
        meta.insert("engine_cycle".to_string(), cycle.to_string());
        if vcs.commit_and_push(&message, &metrics.updated, &meta).await? {
            info!("Committed changes: {}", message);
            metrics.committed = Some(message);
        } else {
            warn!("Commit refused or failed for cycle {}", cycle);
        }
        Ok(())
    }

    /// Derived status snapshot. Commits fall back to recent history when
    /// this run made none.
    pub async fn report(&self, governance: &Governance) -> StatusReport {
        let mut commits = self.commits.clone();
        if commits.is_empty() {
            if let Some(vcs) = &self.collaborators.vcs {
                commits = vcs
                    .recent_messages(HISTORY_COMMITS)
                    .await
                    .supported()
                    .unwrap_or_default();
            }
        }

        let uptime_cycles = self.metrics.len();
        let summary = if uptime_cycles > 0 {
            format!(
                "Cycle {}: {} commits, {} updates",
                self.current_cycle,
                self.commits.len(),
                self.updates.len()
            )
        } else {
            NO_ACTIVITY.to_string()
        };

        StatusReport {
            cycle: self.current_cycle,
            depth: self.config.depth,
            ready: self.ready(),
            system_phase: SystemPhase::from_cycles(self.total_cycles),
            governance_mode: governance.mode(),
            autonomy_enabled: governance.autonomy_enabled(),
            last_cycle_summary: sanitize::single_line(&summary, SUMMARY_MAX_CHARS),
            uptime_cycles,
            commits: commits.iter().map(|c| sanitize::redact_secrets(c)).collect(),
            errors: self.errors.iter().map(|e| sanitize::error_line(e)).collect(),
            governance_version: governance.governance_version().map(String::from),
        }
    }
}
