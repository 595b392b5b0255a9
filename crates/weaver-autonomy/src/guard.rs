//! Autonomy guard: stateless policy gate.
//!
//! Autonomy is off unless the policy says `status: "enabled"` AND the
//! kill-switch default is explicitly `false`. Nothing here returns an error.

use serde::Serialize;
use std::path::{Component, Path};
use weaver_core::governance::{Conditions, GuardConfig};
use weaver_llm::FileBlock;

/// Declared gating flags and volume maxima, surfaced for the caller to
/// enforce. The guard itself only enforces the volume maxima.
pub type ConditionReport = Conditions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Decision::Allow => f.write_str("ALLOW"),
            Decision::Deny(reason) => write!(f, "DENY ({})", reason),
        }
    }
}

/// Outcome of checking one batch of file blocks.
#[derive(Debug, Clone)]
pub struct BatchVerdict {
    /// Blocks on permitted paths, in input order.
    pub allowed: Vec<FileBlock>,
    /// Paths skipped because they fall under a forbidden prefix.
    pub forbidden: Vec<String>,
    /// Volume decision over `allowed`. On `Deny` nothing should be written.
    pub decision: Decision,
}

/// `a/./b/../c` → `a/c`; leading `./` dropped.
fn normalize_rel(path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(p) => parts.push(p.to_string_lossy().to_string()),
            Component::RootDir | Component::Prefix(_) => parts.clear(),
        }
    }
    let mut out = parts.join("/");
    if path.ends_with('/') && !out.is_empty() {
        out.push('/');
    }
    out
}

#[derive(Debug, Clone)]
pub struct AutonomyGuard {
    config: GuardConfig,
}

impl AutonomyGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn allowed(&self) -> bool {
        self.config.status.as_deref() == Some("enabled")
            && self.config.kill_switch.default == Some(false)
    }

    /// False iff `path` starts with a forbidden prefix.
    pub fn path_allowed(&self, path: &str) -> bool {
        let path = normalize_rel(path);
        !self
            .config
            .forbidden_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Equal to a maximum passes; strictly above fails.
    pub fn can_write_files(&self, files: usize, lines: usize) -> bool {
        let c = &self.config.conditions;
        files <= c.max_files_changed && lines <= c.max_lines_changed
    }

    pub fn check_conditions(&self) -> ConditionReport {
        self.config.conditions.clone()
    }

    /// Drop blocks on forbidden paths, then apply the volume limits to the
    /// rest as a whole.
    pub fn evaluate(&self, blocks: &[FileBlock]) -> BatchVerdict {
        let (allowed, forbidden): (Vec<&FileBlock>, Vec<&FileBlock>) =
            blocks.iter().partition(|b| self.path_allowed(&b.path));
        let lines: usize = allowed.iter().map(|b| b.content.lines().count()).sum();
        let decision = if self.can_write_files(allowed.len(), lines) {
            Decision::Allow
        } else {
            Decision::Deny(format!(
                "change volume {} files / {} lines exceeds {} / {}",
                allowed.len(),
                lines,
                self.config.conditions.max_files_changed,
                self.config.conditions.max_lines_changed
            ))
        };
        BatchVerdict {
            allowed: allowed.into_iter().cloned().collect(),
            forbidden: forbidden.into_iter().map(|b| b.path.clone()).collect(),
            decision,
        }
    }
}
