//! Node: atomic semantic event.
//!
//! A node is created by upstream reasoning and afterwards only changes through
//! a state transition or weight decay. Provenance is fixed at creation.

use crate::decay::{DecayPolicy, SemanticDecay};
use crate::vector_stack::{unit, VectorStack};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Anchor,
    Active,
    Dormant,
    Decaying,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anchor => write!(f, "ANCHOR"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Dormant => write!(f, "DORMANT"),
            Self::Decaying => write!(f, "DECAYING"),
        }
    }
}

/// Audit record. No setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    thread_id: String,
    session_id: String,
    checksum: String,
    version: String,
}

impl Provenance {
    pub fn new(
        thread_id: impl Into<String>,
        session_id: impl Into<String>,
        checksum: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            session_id: session_id.into(),
            checksum: checksum.into(),
            version: version.into(),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Ordered token sequences. Glyph count doubles as a coarse entropy measure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolicPayload {
    pub glyphs: Vec<String>,
    pub operators: Vec<String>,
    pub constraints: Vec<String>,
    pub references: Vec<String>,
}

impl SymbolicPayload {
    pub fn entropy(&self) -> usize {
        self.glyphs.len()
    }
}

#[derive(Deserialize)]
struct RawWeights {
    #[serde(default)]
    coherence: f64,
    #[serde(default)]
    recurrence: f64,
    #[serde(default)]
    alignment: f64,
}

impl From<RawWeights> for Weights {
    fn from(raw: RawWeights) -> Self {
        Weights::new(raw.coherence, raw.recurrence, raw.alignment)
    }
}

/// Computed weights, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWeights")]
pub struct Weights {
    coherence: f64,
    recurrence: f64,
    alignment: f64,
}

impl Weights {
    pub fn new(coherence: f64, recurrence: f64, alignment: f64) -> Self {
        Self {
            coherence: unit(coherence),
            recurrence: unit(recurrence),
            alignment: unit(alignment),
        }
    }

    pub fn coherence(&self) -> f64 {
        self.coherence
    }

    pub fn recurrence(&self) -> f64 {
        self.recurrence
    }

    pub fn alignment(&self) -> f64 {
        self.alignment
    }

    /// coherence × recurrence × alignment
    pub fn total(&self) -> f64 {
        self.coherence * self.recurrence * self.alignment
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    node_id: String,
    agent_id: String,
    timestamp: String,
    intent_signature: String,
    vector_stack: VectorStack,
    symbolic_payload: SymbolicPayload,
    weights: Weights,
    state: NodeState,
    provenance: Provenance,
    #[serde(default = "default_node_type")]
    node_type: String,
}

fn default_node_type() -> String {
    "NODE".into()
}

impl Node {
    /// A fresh ACTIVE node stamped with the current UTC time.
    pub fn new(
        node_id: impl Into<String>,
        agent_id: impl Into<String>,
        intent_signature: impl Into<String>,
        vector_stack: VectorStack,
        provenance: Provenance,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            agent_id: agent_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            intent_signature: intent_signature.into(),
            vector_stack,
            symbolic_payload: SymbolicPayload::default(),
            weights: Weights::default(),
            state: NodeState::Active,
            provenance,
            node_type: default_node_type(),
        }
    }

    /// `node-<uuid>`
    pub fn generate_id() -> String {
        format!("node-{}", uuid::Uuid::new_v4())
    }

    pub fn with_payload(mut self, payload: SymbolicPayload) -> Self {
        self.symbolic_payload = payload;
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_state(mut self, state: NodeState) -> Self {
        self.state = state;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn intent_signature(&self) -> &str {
        &self.intent_signature
    }

    pub fn vector_stack(&self) -> &VectorStack {
        &self.vector_stack
    }

    pub fn symbolic_payload(&self) -> &SymbolicPayload {
        &self.symbolic_payload
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn is_anchor(&self) -> bool {
        self.state == NodeState::Anchor
    }

    pub fn decay_eligible(&self) -> bool {
        matches!(self.state, NodeState::Active | NodeState::Dormant)
    }

    pub fn transition(&mut self, state: NodeState) {
        if self.state != state {
            tracing::debug!(node = %self.node_id, from = %self.state, to = %state, "node transition");
            self.state = state;
        }
    }

    /// Attenuate the recurrence weight. Returns false (and changes nothing)
    /// when the node is an anchor by state or listed in `anchors`.
    pub fn apply_decay<'a>(
        &mut self,
        policy: &DecayPolicy,
        anchors: impl IntoIterator<Item = &'a String>,
        divergence: f64,
        reinforcement: f64,
    ) -> bool {
        if self.is_anchor() || SemanticDecay::is_anchor_exempt(&self.node_id, anchors) {
            return false;
        }
        let recurrence = SemanticDecay::compute_decay(
            policy,
            self.weights.recurrence,
            divergence,
            reinforcement,
        );
        self.weights = Weights::new(self.weights.coherence, recurrence, self.weights.alignment);
        true
    }
}
