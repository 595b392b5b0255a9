//! Distillation-forced retrieval.
//!
//! Candidates below the similarity threshold are dropped, survivors are
//! boosted toward anchors and high-weight nodes, and at most `max_nodes`
//! ids come back even when more clear the threshold.

use crate::vector_stack::VectorStack;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalBias {
    Anchor,
    HighWeight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPolicy {
    /// Boosts only apply when listed here.
    pub bias: Vec<RetrievalBias>,
    pub max_nodes: usize,
    pub similarity_threshold: f64,
    pub anchor_boost: f64,
    pub high_weight_boost: f64,
    /// Weight strictly above this earns the high-weight boost.
    pub high_weight_threshold: f64,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            bias: vec![RetrievalBias::Anchor, RetrievalBias::HighWeight],
            max_nodes: 7,
            similarity_threshold: 0.78,
            anchor_boost: 1.4,
            high_weight_boost: 1.2,
            high_weight_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNode {
    pub node_id: String,
    pub similarity: f64,
    pub score: f64,
}

pub struct RetrievalEngine<'p> {
    policy: &'p RetrievalPolicy,
}

impl<'p> RetrievalEngine<'p> {
    pub fn new(policy: &'p RetrievalPolicy) -> Self {
        Self { policy }
    }

    /// Ids ordered by score descending; equal scores order by ascending id.
    pub fn retrieve(
        &self,
        query: &VectorStack,
        candidates: &BTreeMap<String, VectorStack>,
        anchors: &BTreeSet<String>,
        weights: &BTreeMap<String, f64>,
    ) -> Vec<String> {
        self.retrieve_scored(query, candidates, anchors, weights)
            .into_iter()
            .map(|s| s.node_id)
            .collect()
    }

    pub fn retrieve_scored(
        &self,
        query: &VectorStack,
        candidates: &BTreeMap<String, VectorStack>,
        anchors: &BTreeSet<String>,
        weights: &BTreeMap<String, f64>,
    ) -> Vec<ScoredNode> {
        let policy = self.policy;
        let boost_anchor = policy.bias.contains(&RetrievalBias::Anchor);
        let boost_weight = policy.bias.contains(&RetrievalBias::HighWeight);

        let mut scored: Vec<ScoredNode> = candidates
            .iter()
            .filter_map(|(id, vector)| {
                let similarity = query.cosine_similarity(vector);
                if similarity < policy.similarity_threshold {
                    return None;
                }
                let mut score = similarity;
                if boost_anchor && anchors.contains(id) {
                    score *= policy.anchor_boost;
                }
                let weight = weights.get(id).copied().unwrap_or(0.0);
                if boost_weight && weight > policy.high_weight_threshold {
                    score *= policy.high_weight_boost;
                }
                Some(ScoredNode {
                    node_id: id.clone(),
                    similarity,
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        scored.truncate(policy.max_nodes);
        tracing::debug!(
            candidates = candidates.len(),
            returned = scored.len(),
            "retrieval"
        );
        scored
    }
}
