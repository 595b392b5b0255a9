//! Weaver Echofield - semantic continuity graph
//!
//! Tracks meaning-bearing events across cycles and ranks them:
//! - vector_stack: six-axis quantized meaning vector
//! - node / edge: atomic events and the relations between them
//! - field: registry of node, edge and anchor ids plus policies
//! - decay: semantic (non-temporal) weight attenuation
//! - retrieval: anchor/weight-biased, threshold-filtered top-k
//! - resolver: deterministic precedence between competing nodes
//! - steward: keyword hygiene filter for generated text
//!
//! Everything except `Field` and `Node` state is a pure function of its inputs.

pub mod decay;
pub mod edge;
pub mod field;
pub mod node;
pub mod resolver;
pub mod retrieval;
pub mod steward;
pub mod vector_stack;

pub use decay::{DecayPolicy, SemanticDecay};
pub use edge::{Edge, RelationType, DEFAULT_STRONG_THRESHOLD};
pub use field::Field;
pub use node::{Node, NodeState, Provenance, SymbolicPayload, Weights};
pub use resolver::{
    ConflictResolver, ConflictRule, Resolution, ANCHOR_NODE_TYPE, CRITICAL_OPERATORS,
};
pub use retrieval::{RetrievalBias, RetrievalEngine, RetrievalPolicy, ScoredNode};
pub use steward::{compress_to_choices, is_sustainable, StewardFilter, StewardRule, StewardVerdict};
pub use vector_stack::{cosine_similarity, Axis, VectorStack, DOMINANCE_THRESHOLD};
