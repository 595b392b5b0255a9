//! VectorStack: six orthogonal meaning axes, each quantized into [0, 1].
//!
//! Vectors are supplied by upstream reasoning; nothing here computes
//! embeddings. Construction (including deserialization) always clamps, so an
//! out-of-range axis value cannot exist.

use serde::{Deserialize, Serialize};

/// An axis above this value dominates the stack.
pub const DOMINANCE_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Identity,
    Function,
    Resonance,
    Structure,
    Mythic,
    Directive,
}

impl Axis {
    pub const ALL: [Axis; 6] = [
        Axis::Identity,
        Axis::Function,
        Axis::Resonance,
        Axis::Structure,
        Axis::Mythic,
        Axis::Directive,
    ];

    pub fn index(self) -> usize {
        match self {
            Axis::Identity => 0,
            Axis::Function => 1,
            Axis::Resonance => 2,
            Axis::Structure => 3,
            Axis::Mythic => 4,
            Axis::Directive => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Identity => "identity",
            Axis::Function => "function",
            Axis::Resonance => "resonance",
            Axis::Structure => "structure",
            Axis::Mythic => "mythic",
            Axis::Directive => "directive",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Axis {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Axis::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown axis: {}", s))
    }
}

/// Clamp into [0, 1]; NaN becomes 0.
pub(crate) fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Wire form; every path into `VectorStack` goes through `VectorStack::new`.
#[derive(Deserialize)]
struct RawVectorStack {
    #[serde(default)]
    identity: f64,
    #[serde(default)]
    function: f64,
    #[serde(default)]
    resonance: f64,
    #[serde(default)]
    structure: f64,
    #[serde(default)]
    mythic: f64,
    #[serde(default)]
    directive: f64,
}

impl From<RawVectorStack> for VectorStack {
    fn from(raw: RawVectorStack) -> Self {
        VectorStack::new(
            raw.identity,
            raw.function,
            raw.resonance,
            raw.structure,
            raw.mythic,
            raw.directive,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVectorStack")]
pub struct VectorStack {
    identity: f64,
    function: f64,
    resonance: f64,
    structure: f64,
    mythic: f64,
    directive: f64,
}

impl VectorStack {
    pub fn new(
        identity: f64,
        function: f64,
        resonance: f64,
        structure: f64,
        mythic: f64,
        directive: f64,
    ) -> Self {
        Self {
            identity: unit(identity),
            function: unit(function),
            resonance: unit(resonance),
            structure: unit(structure),
            mythic: unit(mythic),
            directive: unit(directive),
        }
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        let [i, f, r, s, m, d] = values;
        Self::new(i, f, r, s, m, d)
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.identity,
            self.function,
            self.resonance,
            self.structure,
            self.mythic,
            self.directive,
        ]
    }

    pub fn get(&self, axis: Axis) -> f64 {
        self.as_array()[axis.index()]
    }

    pub fn identity(&self) -> f64 {
        self.identity
    }

    pub fn function(&self) -> f64 {
        self.function
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    pub fn structure(&self) -> f64 {
        self.structure
    }

    pub fn mythic(&self) -> f64 {
        self.mythic
    }

    pub fn directive(&self) -> f64 {
        self.directive
    }

    pub fn magnitude(&self) -> f64 {
        self.as_array().iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    pub fn cosine_similarity(&self, other: &VectorStack) -> f64 {
        cosine_similarity(&self.as_array(), &other.as_array())
    }

    /// True iff `axis` exceeds the dominance threshold. Callers decide what a
    /// dominant identity or directive axis means.
    pub fn dominance_check(&self, axis: Axis) -> bool {
        self.get(axis) > DOMINANCE_THRESHOLD
    }
}

/// dot(a, b) / (|a| * |b|), over the common prefix of the two slices.
/// Exactly 0 when either magnitude is 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let (mut dot, mut mag_a, mut mag_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}
