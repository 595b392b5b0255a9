//! Status report: a fixed-shape snapshot for dashboards to poll.
//!
//! Every string that leaves through here is single-line and redacted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use weaver_core::GovernanceMode;

/// `last_cycle_summary` stays under 256 characters.
pub const SUMMARY_MAX_CHARS: usize = 255;

pub const NO_ACTIVITY: &str = "No activity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemPhase {
    Foundation,
    Stabilization,
    Expansion,
}

impl SystemPhase {
    /// 0 → Foundation, 1..=3 → Stabilization, more → Expansion.
    pub fn from_cycles(cycles: u64) -> Self {
        match cycles {
            0 => Self::Foundation,
            1..=3 => Self::Stabilization,
            _ => Self::Expansion,
        }
    }
}

impl std::fmt::Display for SystemPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foundation => write!(f, "Foundation"),
            Self::Stabilization => write!(f, "Stabilization"),
            Self::Expansion => write!(f, "Expansion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub cycle: u32,
    pub depth: u32,
    pub ready: bool,
    pub system_phase: SystemPhase,
    pub governance_mode: GovernanceMode,
    pub autonomy_enabled: bool,
    pub last_cycle_summary: String,
    pub uptime_cycles: usize,
    pub commits: Vec<String>,
    pub errors: Vec<String>,
    pub governance_version: Option<String>,
}

/// Write `report` as pretty JSON via a temp file and rename, so a reader
/// never sees a half-written file.
pub fn export_status(path: &Path, report: &StatusReport) -> weaver_core::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    tracing::info!("Wrote status to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries() {
        assert_eq!(SystemPhase::from_cycles(0), SystemPhase::Foundation);
        assert_eq!(SystemPhase::from_cycles(1), SystemPhase::Stabilization);
        assert_eq!(SystemPhase::from_cycles(3), SystemPhase::Stabilization);
        assert_eq!(SystemPhase::from_cycles(4), SystemPhase::Expansion);
    }

    #[test]
    fn phase_serializes_capitalized() {
        assert_eq!(
            serde_json::to_string(&SystemPhase::Stabilization).unwrap(),
            r#""Stabilization""#
        );
    }
}
