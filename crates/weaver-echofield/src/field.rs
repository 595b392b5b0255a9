//! Continuity field: registry of node, edge and anchor ids plus the policies
//! applied to them.
//!
//! Registration is idempotent. The field does not check that an anchor id is
//! also a registered node, and it never purges ids; both are the caller's job.

use crate::decay::{DecayPolicy, SemanticDecay};
use crate::retrieval::{RetrievalEngine, RetrievalPolicy, ScoredNode};
use crate::vector_stack::VectorStack;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Field {
    pub field_id: String,
    nodes: BTreeSet<String>,
    edges: BTreeSet<String>,
    anchors: BTreeSet<String>,
    #[serde(default)]
    pub decay_policy: DecayPolicy,
    #[serde(default)]
    pub retrieval_policy: RetrievalPolicy,
}

impl Field {
    pub fn new(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            ..Default::default()
        }
    }

    pub fn with_policies(mut self, decay: DecayPolicy, retrieval: RetrievalPolicy) -> Self {
        self.decay_policy = decay;
        self.retrieval_policy = retrieval;
        self
    }

    /// Returns true when the id was not already present.
    pub fn add_node(&mut self, node_id: impl Into<String>) -> bool {
        self.nodes.insert(node_id.into())
    }

    pub fn add_edge(&mut self, edge_id: impl Into<String>) -> bool {
        self.edges.insert(edge_id.into())
    }

    pub fn add_anchor(&mut self, anchor_id: impl Into<String>) -> bool {
        self.anchors.insert(anchor_id.into())
    }

    pub fn is_anchor(&self, node_id: &str) -> bool {
        self.anchors.contains(node_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn anchors(&self) -> &BTreeSet<String> {
        &self.anchors
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Decayed weight under the field policy; anchors keep `weight` as is.
    pub fn decay(&self, node_id: &str, weight: f64, divergence: f64, reinforcement: f64) -> f64 {
        if self.anchors.contains(node_id) {
            return weight;
        }
        SemanticDecay::compute_decay(&self.decay_policy, weight, divergence, reinforcement)
    }

    pub fn retrieve(
        &self,
        query: &VectorStack,
        candidates: &BTreeMap<String, VectorStack>,
        weights: &BTreeMap<String, f64>,
    ) -> Vec<String> {
        RetrievalEngine::new(&self.retrieval_policy).retrieve(query, candidates, &self.anchors, weights)
    }

    pub fn retrieve_scored(
        &self,
        query: &VectorStack,
        candidates: &BTreeMap<String, VectorStack>,
        weights: &BTreeMap<String, f64>,
    ) -> Vec<ScoredNode> {
        RetrievalEngine::new(&self.retrieval_policy).retrieve_scored(
            query,
            candidates,
            &self.anchors,
            weights,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        let mut f = Field::new("f1");
        assert!(f.add_node("n1"));
        assert!(!f.add_node("n1"));
        f.add_edge("e1");
        f.add_edge("e1");
        f.add_anchor("a1");
        f.add_anchor("a1");
        assert_eq!((f.node_count(), f.edge_count(), f.anchor_count()), (1, 1, 1));
    }

    #[test]
    fn anchor_need_not_be_registered_node() {
        let mut f = Field::new("f1");
        f.add_anchor("ghost");
        assert!(f.is_anchor("ghost"));
        assert!(!f.contains_node("ghost"));
    }

    #[test]
    fn decay_skips_anchors() {
        let mut f = Field::new("f1");
        f.add_anchor("a");
        assert_eq!(f.decay("a", 0.9, 100.0, 0.0), 0.9);
        assert!(f.decay("b", 0.9, 100.0, 0.0) < 0.9);
    }
}
