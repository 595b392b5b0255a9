//! Explicit capability results for collaborators.
//!
//! Optional operations return `Capability::Unsupported` instead of being
//! discovered at runtime; readiness probes return `Availability`.

use serde::Serialize;

/// Result of a readiness probe. A degraded collaborator still counts as
/// present; only its calls are expected to fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Availability {
    Available,
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Supported(T),
    Unsupported,
}

impl<T> Capability<T> {
    pub fn supported(self) -> Option<T> {
        match self {
            Self::Supported(value) => Some(value),
            Self::Unsupported => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }
}
