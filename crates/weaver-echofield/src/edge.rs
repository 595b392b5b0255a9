//! Edge: non-hierarchical relation between two nodes.
//!
//! Endpoints and relation are fixed at creation. Strength decays with elapsed
//! steps but the stored value never changes; `decayed_strength` computes it.

use crate::vector_stack::unit;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STRONG_THRESHOLD: f64 = 0.7;
pub const DEFAULT_EDGE_DECAY_RATE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    ResonatesWith,
    Refines,
    DivergesFrom,
    Anchors,
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResonatesWith => write!(f, "RESONATES_WITH"),
            Self::Refines => write!(f, "REFINES"),
            Self::DivergesFrom => write!(f, "DIVERGES_FROM"),
            Self::Anchors => write!(f, "ANCHORS"),
        }
    }
}

/// Wire form; deserialized edges are clamped like constructed ones.
#[derive(Deserialize)]
struct EdgeRecord {
    edge_id: String,
    from_node_id: String,
    to_node_id: String,
    relation: RelationType,
    #[serde(default)]
    strength: f64,
    #[serde(default = "default_decay_rate")]
    decay_rate: f64,
}

fn default_decay_rate() -> f64 {
    DEFAULT_EDGE_DECAY_RATE
}

impl From<EdgeRecord> for Edge {
    fn from(r: EdgeRecord) -> Self {
        Edge::new(r.edge_id, r.from_node_id, r.to_node_id, r.relation, r.strength, r.decay_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EdgeRecord")]
pub struct Edge {
    edge_id: String,
    from_node_id: String,
    to_node_id: String,
    relation: RelationType,
    strength: f64,
    decay_rate: f64,
}

impl Edge {
    /// Strength and decay rate are clamped into [0, 1].
    pub fn new(
        edge_id: impl Into<String>,
        from_node_id: impl Into<String>,
        to_node_id: impl Into<String>,
        relation: RelationType,
        strength: f64,
        decay_rate: f64,
    ) -> Self {
        Self {
            edge_id: edge_id.into(),
            from_node_id: from_node_id.into(),
            to_node_id: to_node_id.into(),
            relation,
            strength: unit(strength),
            decay_rate: unit(decay_rate),
        }
    }

    /// Edge with a generated id and the default decay rate.
    pub fn connect(
        from_node_id: impl Into<String>,
        to_node_id: impl Into<String>,
        relation: RelationType,
        strength: f64,
    ) -> Self {
        Self::new(
            format!("edge-{}", uuid::Uuid::new_v4()),
            from_node_id,
            to_node_id,
            relation,
            strength,
            DEFAULT_EDGE_DECAY_RATE,
        )
    }

    pub fn edge_id(&self) -> &str {
        &self.edge_id
    }

    pub fn from_node_id(&self) -> &str {
        &self.from_node_id
    }

    pub fn to_node_id(&self) -> &str {
        &self.to_node_id
    }

    pub fn relation(&self) -> RelationType {
        self.relation
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    /// strength × (1 − decay_rate)^t
    pub fn decayed_strength(&self, time_steps: u32) -> f64 {
        let steps = i32::try_from(time_steps).unwrap_or(i32::MAX);
        self.strength * (1.0 - self.decay_rate).powi(steps)
    }

    pub fn is_strong(&self, threshold: f64) -> bool {
        self.strength >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_strength_and_rate() {
        let e = Edge::new("e1", "a", "b", RelationType::Refines, 4.0, -1.0);
        assert_eq!(e.strength(), 1.0);
        assert_eq!(e.decay_rate(), 0.0);
    }

    #[test]
    fn zero_steps_is_identity() {
        let e = Edge::new("e1", "a", "b", RelationType::Refines, 0.66, 0.3);
        assert_eq!(e.decayed_strength(0), 0.66);
    }

    #[test]
    fn ten_steps_at_ten_percent() {
        let e = Edge::new("e1", "a", "b", RelationType::ResonatesWith, 1.0, 0.1);
        let s = e.decayed_strength(10);
        assert!((s - 0.3486784401).abs() < 1e-9);
        assert!(s < 0.4);
    }

    #[test]
    fn full_decay_rate_zeroes_after_one_step() {
        let e = Edge::new("e1", "a", "b", RelationType::Anchors, 0.9, 1.0);
        assert_eq!(e.decayed_strength(1), 0.0);
    }

    #[test]
    fn strong_threshold_is_inclusive() {
        let e = Edge::new("e1", "a", "b", RelationType::DivergesFrom, 0.7, 0.0);
        assert!(e.is_strong(DEFAULT_STRONG_THRESHOLD));
        assert!(!e.is_strong(0.71));
    }

    #[test]
    fn relation_serializes_screaming() {
        let json = serde_json::to_string(&RelationType::ResonatesWith).unwrap();
        assert_eq!(json, r#""RESONATES_WITH""#);
    }

    #[test]
    fn deserialized_edge_is_clamped() {
        let e: Edge = serde_json::from_str(
            r#"{"edge_id":"e","from_node_id":"a","to_node_id":"b","relation":"REFINES","strength":9}"#,
        )
        .unwrap();
        assert_eq!(e.strength(), 1.0);
        assert_eq!(e.decay_rate(), DEFAULT_EDGE_DECAY_RATE);
    }
}
