//! Semantic decay: attenuation driven by divergence and reinforcement, not time.
//!
//! rate       = clamp(base_rate × divergence × divergence_multiplier
//!                    / max(0.1, reinforcement × reinforcement_divisor), 0, 1)
//! new_weight = clamp(weight × (1 − rate), 0, 1)
//!
//! Anchors never decay; callers check membership through `is_anchor_exempt`
//! or go through `Field::decay`, which does it for them.

use crate::vector_stack::unit;
use serde::{Deserialize, Serialize};

/// Floor for the reinforcement denominator.
pub const MIN_REINFORCEMENT: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayPolicy {
    pub base_rate: f64,
    pub divergence_multiplier: f64,
    pub reinforcement_divisor: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            base_rate: 0.01,
            divergence_multiplier: 1.5,
            reinforcement_divisor: 2.0,
        }
    }
}

pub struct SemanticDecay;

impl SemanticDecay {
    pub fn rate(policy: &DecayPolicy, divergence: f64, reinforcement: f64) -> f64 {
        let denominator = (reinforcement * policy.reinforcement_divisor).max(MIN_REINFORCEMENT);
        unit(policy.base_rate * divergence * policy.divergence_multiplier / denominator)
    }

    pub fn compute_decay(
        policy: &DecayPolicy,
        weight: f64,
        divergence: f64,
        reinforcement: f64,
    ) -> f64 {
        let rate = Self::rate(policy, divergence, reinforcement);
        unit(weight * (1.0 - rate))
    }

    pub fn is_anchor_exempt<'a>(
        node_id: &str,
        anchors: impl IntoIterator<Item = &'a String>,
    ) -> bool {
        anchors.into_iter().any(|a| a == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_matches_formula() {
        let p = DecayPolicy::default();
        // 0.01 * 1.0 * 1.5 / max(0.1, 1.0 * 2.0) = 0.0075
        assert!((SemanticDecay::rate(&p, 1.0, 1.0) - 0.0075).abs() < 1e-12);
        let w = SemanticDecay::compute_decay(&p, 0.8, 1.0, 1.0);
        assert!((w - 0.8 * (1.0 - 0.0075)).abs() < 1e-12);
    }

    #[test]
    fn zero_reinforcement_uses_floor() {
        let p = DecayPolicy::default();
        // 0.01 * 2.0 * 1.5 / 0.1 = 0.3
        assert!((SemanticDecay::rate(&p, 2.0, 0.0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn rate_is_clamped_to_one() {
        let p = DecayPolicy {
            base_rate: 1.0,
            ..Default::default()
        };
        assert_eq!(SemanticDecay::rate(&p, 100.0, 0.0), 1.0);
        assert_eq!(SemanticDecay::compute_decay(&p, 0.9, 100.0, 0.0), 0.0);
    }

    #[test]
    fn negative_divergence_cannot_grow_weight() {
        let p = DecayPolicy::default();
        assert_eq!(SemanticDecay::rate(&p, -5.0, 1.0), 0.0);
        assert_eq!(SemanticDecay::compute_decay(&p, 0.5, -5.0, 1.0), 0.5);
    }

    #[test]
    fn output_weight_is_clamped() {
        let p = DecayPolicy::default();
        assert_eq!(SemanticDecay::compute_decay(&p, 3.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn anchor_exemption_is_membership() {
        let anchors = vec!["n1".to_string(), "n2".to_string()];
        assert!(SemanticDecay::is_anchor_exempt("n2", &anchors));
        assert!(!SemanticDecay::is_anchor_exempt("n3", &anchors));
    }
}
