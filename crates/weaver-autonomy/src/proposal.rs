//! Proposal engine: the non-mutating default.
//!
//! Proposals describe intended changes and are never applied here. Every
//! proposal requires a human.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeProposal {
    ProposeFileChange {
        path: String,
        reason: String,
        applied: bool,
        requires_human: bool,
    },
    ProposeCodeGeneration {
        module: String,
        purpose: String,
        generated: bool,
        requires_human: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub task: String,
    pub changes: Vec<ChangeProposal>,
    pub risk: Risk,
    pub requires_human: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProposalEngine;

impl ProposalEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn propose(&self, task: &str) -> Proposal {
        tracing::debug!("Proposal for task: {}", task);
        Proposal {
            task: task.to_string(),
            changes: Vec::new(),
            risk: Risk::Low,
            requires_human: true,
        }
    }

    pub fn propose_file_change(&self, path: &str, reason: &str) -> ChangeProposal {
        ChangeProposal::ProposeFileChange {
            path: path.to_string(),
            reason: reason.to_string(),
            applied: false,
            requires_human: true,
        }
    }

    pub fn propose_code_generation(&self, module: &str, purpose: &str) -> ChangeProposal {
        ChangeProposal::ProposeCodeGeneration {
            module: module.to_string(),
            purpose: purpose.to_string(),
            generated: false,
            requires_human: true,
        }
    }
}
