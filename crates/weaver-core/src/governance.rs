//! Governance documents: read-only inputs that decide what autonomy may do.
//!
//! Layout of the governance directory:
//! - `autonomy.json`  guard policy + scheduled-run contract (versioned)
//! - `roles.json`     approver-role registry
//! - `manifest.json`  governance version stamp
//!
//! Nothing here enforces anything. The guard and the scheduled runner consume
//! these values; this module only parses and validates their shape.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const AUTONOMY_FILE: &str = "autonomy.json";
pub const ROLES_FILE: &str = "roles.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Highest `autonomy.json` schema this build understands.
pub const AUTONOMY_SCHEMA_VERSION: u32 = 1;

/// Prefixes autonomy may never write under unless the policy says otherwise.
pub const DEFAULT_FORBIDDEN_PATHS: [&str; 4] = ["governance/", "sanctum/", ".git/", ".github/"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitch {
    /// `None` means unset, which counts as engaged.
    #[serde(default)]
    pub default: Option<bool>,
}

/// Declared gating flags. Surfaced to callers; the guard does not verify them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    pub tests_must_pass: bool,
    pub proposal_reviewed: bool,
    pub human_present: bool,
    pub max_files_changed: usize,
    pub max_lines_changed: usize,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            tests_must_pass: false,
            proposal_reviewed: false,
            human_present: false,
            max_files_changed: 5,
            max_lines_changed: 300,
        }
    }
}

/// Policy evaluated by the autonomy guard. Every field may be absent in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub status: Option<String>,
    pub kill_switch: KillSwitch,
    pub forbidden_paths: Vec<String>,
    pub conditions: Conditions,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            status: None,
            kill_switch: KillSwitch::default(),
            forbidden_paths: DEFAULT_FORBIDDEN_PATHS.iter().map(|p| p.to_string()).collect(),
            conditions: Conditions::default(),
        }
    }
}

impl GuardConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn default_schema_version() -> u32 {
    AUTONOMY_SCHEMA_VERSION
}

/// `autonomy.json`: the guard policy flattened together with the contract a
/// scheduled run must satisfy. The run-contract keys are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub enabled: bool,
    pub approved_by: String,
    pub max_commits_per_run: u32,
    pub allowed_extensions: Vec<String>,
    pub interval_seconds: u64,
    #[serde(default)]
    pub run_depth: Option<u32>,
    /// Environment variables that must hold exactly these values for a run.
    #[serde(default)]
    pub require_env: BTreeMap<String, String>,
    #[serde(flatten)]
    pub guard: GuardConfig,
}

impl AutonomyManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("{}: {}", AUTONOMY_FILE, e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version > AUTONOMY_SCHEMA_VERSION {
            return Err(Error::config(format!(
                "{} schema version {} is newer than supported version {}",
                AUTONOMY_FILE, self.schema_version, AUTONOMY_SCHEMA_VERSION
            )));
        }
        if self.approved_by.trim().is_empty() {
            return Err(Error::config(format!("{}: approved_by is empty", AUTONOMY_FILE)));
        }
        Ok(())
    }

    /// Names of `require_env` entries whose current value differs.
    pub fn env_mismatches(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        self.require_env
            .iter()
            .filter(|(k, v)| lookup(k).as_deref() != Some(v.as_str()))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// `roles.json`: role name → arbitrary role record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleRegistry(pub BTreeMap<String, serde_json::Value>);

impl RoleRegistry {
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains_key(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovernanceManifest {
    #[serde(default)]
    pub governance_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernanceMode {
    Manual,
    Scheduled,
    Autonomous,
}

impl std::fmt::Display for GovernanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Autonomous => write!(f, "autonomous"),
        }
    }
}

/// Loaded governance bundle. Built once per process and passed down.
#[derive(Debug, Clone, Default)]
pub struct Governance {
    pub dir: PathBuf,
    /// `None` when `autonomy.json` does not exist or could not be parsed.
    pub autonomy: Option<AutonomyManifest>,
    /// `None` when `roles.json` does not exist (approval is then not checked).
    pub roles: Option<RoleRegistry>,
    pub manifest: Option<GovernanceManifest>,
    /// Operator asked for unattended operation (`WEAVER_AUTONOMOUS=true`).
    pub autonomous_flag: bool,
    /// Documents that exist but could not be read or parsed. Any entry here
    /// keeps scheduled runs from starting.
    pub load_errors: Vec<String>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        debug!("No governance document at {}", path.display());
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
}

fn read_or_record<T: DeserializeOwned>(path: &Path, errors: &mut Vec<String>) -> Option<T> {
    match read_json(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Ignoring governance document: {}", e);
            errors.push(e.to_string());
            None
        }
    }
}

impl Governance {
    /// Load every governance document under `dir`. Missing files are fine.
    /// Malformed ones are recorded in `load_errors` and treated as absent, so
    /// the bundle degrades to manual mode with the fail-safe guard policy.
    pub fn load(dir: impl AsRef<Path>, autonomous_flag: bool) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let mut load_errors = Vec::new();
        let autonomy = read_or_record::<AutonomyManifest>(&dir.join(AUTONOMY_FILE), &mut load_errors);
        let roles = read_or_record::<RoleRegistry>(&dir.join(ROLES_FILE), &mut load_errors);
        let manifest = read_or_record::<GovernanceManifest>(&dir.join(MANIFEST_FILE), &mut load_errors);
        info!(
            "Loaded governance from {} (autonomy={}, roles={}, manifest={}, errors={})",
            dir.display(),
            autonomy.is_some(),
            roles.is_some(),
            manifest.is_some(),
            load_errors.len()
        );
        Self {
            dir,
            autonomy,
            roles,
            manifest,
            autonomous_flag,
            load_errors,
        }
    }

    /// All load failures on one line, or `None` when every document parsed.
    pub fn load_error(&self) -> Option<String> {
        (!self.load_errors.is_empty()).then(|| self.load_errors.join("; "))
    }

    pub fn autonomy_enabled(&self) -> bool {
        self.autonomy.as_ref().is_some_and(|a| a.enabled)
    }

    pub fn mode(&self) -> GovernanceMode {
        if !self.autonomy_enabled() {
            GovernanceMode::Manual
        } else if self.autonomous_flag {
            GovernanceMode::Autonomous
        } else {
            GovernanceMode::Scheduled
        }
    }

    pub fn governance_version(&self) -> Option<&str> {
        self.manifest
            .as_ref()
            .and_then(|m| m.governance_version.as_deref())
    }

    /// Guard policy in force. Without `autonomy.json` this is the fail-safe
    /// default: no status, kill-switch unset, autonomy disallowed.
    pub fn guard_config(&self) -> GuardConfig {
        self.autonomy
            .as_ref()
            .map(|a| a.guard.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "enabled": true,
        "approved_by": "Flamekeeper",
        "max_commits_per_run": 3,
        "allowed_extensions": [".md", ".txt"],
        "interval_seconds": 3600,
        "status": "enabled",
        "kill_switch": {"default": false}
    }"#;

    #[test]
    fn guard_config_defaults_are_fail_safe() {
        let cfg = GuardConfig::from_json("{}").unwrap();
        assert!(cfg.status.is_none());
        assert!(cfg.kill_switch.default.is_none());
        assert_eq!(cfg.conditions.max_files_changed, 5);
        assert_eq!(cfg.conditions.max_lines_changed, 300);
        assert!(cfg.forbidden_paths.contains(&"governance/".to_string()));
    }

    #[test]
    fn manifest_flattens_guard_fields() {
        let m = AutonomyManifest::from_json(MANIFEST).unwrap();
        assert_eq!(m.schema_version, AUTONOMY_SCHEMA_VERSION);
        assert_eq!(m.guard.status.as_deref(), Some("enabled"));
        assert_eq!(m.guard.kill_switch.default, Some(false));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn manifest_missing_required_key_is_config_error() {
        let err = AutonomyManifest::from_json(r#"{"enabled": true}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("approved_by"));
    }

    #[test]
    fn manifest_newer_schema_rejected() {
        let mut m = AutonomyManifest::from_json(MANIFEST).unwrap();
        m.schema_version = AUTONOMY_SCHEMA_VERSION + 1;
        assert!(m.validate().is_err());
    }

    #[test]
    fn env_mismatches_reports_keys() {
        let mut m = AutonomyManifest::from_json(MANIFEST).unwrap();
        m.require_env.insert("WEAVER_AUTONOMOUS".into(), "true".into());
        let none = m.env_mismatches(|_| Some("true".into()));
        assert!(none.is_empty());
        let some = m.env_mismatches(|_| None);
        assert_eq!(some, vec!["WEAVER_AUTONOMOUS".to_string()]);
    }

    #[test]
    fn mode_follows_enabled_and_flag() {
        let mut gov = Governance::default();
        assert_eq!(gov.mode(), GovernanceMode::Manual);
        gov.autonomy = Some(AutonomyManifest::from_json(MANIFEST).unwrap());
        assert_eq!(gov.mode(), GovernanceMode::Scheduled);
        gov.autonomous_flag = true;
        assert_eq!(gov.mode(), GovernanceMode::Autonomous);
    }

    #[test]
    fn load_error_joins_failures() {
        let mut gov = Governance::default();
        assert!(gov.load_error().is_none());
        gov.load_errors = vec!["a.json: bad".into(), "b.json: worse".into()];
        assert_eq!(gov.load_error().as_deref(), Some("a.json: bad; b.json: worse"));
    }
}
