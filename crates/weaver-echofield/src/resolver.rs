//! Conflict resolution between two competing nodes.
//!
//! Rules apply in order, first match wins:
//! 1. anchor (by state or by the `ANCHOR` node type) beats non-anchor
//! 2. higher directive wins when the gap exceeds 0.1
//! 3. fewer glyphs wins
//! 4. otherwise suspend output and ask for clarity

use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Operators whose disagreement is a hard conflict.
pub const CRITICAL_OPERATORS: [&str; 2] = ["DEFINE", "ANCHOR"];

/// Directive gap a node must exceed to win on rule 2.
pub const DIRECTIVE_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictRule {
    AnchorBeatsNonAnchor,
    HigherDirectiveWins,
    LowerEntropyWins,
    SuspendOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// `None` means unresolved: defer to a human.
    pub winner: Option<String>,
    pub rule: ConflictRule,
}

impl Resolution {
    fn won(node: &Node, rule: ConflictRule) -> Self {
        Self {
            winner: Some(node.node_id().to_string()),
            rule,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }
}

/// Node type label that marks an anchor independent of state.
pub const ANCHOR_NODE_TYPE: &str = "ANCHOR";

fn anchored(node: &Node) -> bool {
    node.is_anchor() || node.node_type() == ANCHOR_NODE_TYPE
}

pub struct ConflictResolver;

impl ConflictResolver {
    pub fn resolve(a: &Node, b: &Node) -> Resolution {
        match (anchored(a), anchored(b)) {
            (true, false) => return Resolution::won(a, ConflictRule::AnchorBeatsNonAnchor),
            (false, true) => return Resolution::won(b, ConflictRule::AnchorBeatsNonAnchor),
            _ => {}
        }

        let da = a.vector_stack().directive();
        let db = b.vector_stack().directive();
        if da > db + DIRECTIVE_MARGIN {
            return Resolution::won(a, ConflictRule::HigherDirectiveWins);
        }
        if db > da + DIRECTIVE_MARGIN {
            return Resolution::won(b, ConflictRule::HigherDirectiveWins);
        }

        let ea = a.symbolic_payload().entropy();
        let eb = b.symbolic_payload().entropy();
        if ea < eb {
            return Resolution::won(a, ConflictRule::LowerEntropyWins);
        }
        if eb < ea {
            return Resolution::won(b, ConflictRule::LowerEntropyWins);
        }

        tracing::debug!(a = a.node_id(), b = b.node_id(), "conflict unresolved");
        Resolution {
            winner: None,
            rule: ConflictRule::SuspendOutput,
        }
    }

    /// Both operator sets touch a critical operator and the sets differ.
    pub fn contradicts(a: &Node, b: &Node) -> bool {
        let ops_a: BTreeSet<&str> = a.symbolic_payload().operators.iter().map(String::as_str).collect();
        let ops_b: BTreeSet<&str> = b.symbolic_payload().operators.iter().map(String::as_str).collect();
        let critical = |ops: &BTreeSet<&str>| CRITICAL_OPERATORS.iter().any(|c| ops.contains(c));
        critical(&ops_a) && critical(&ops_b) && ops_a != ops_b
    }
}
