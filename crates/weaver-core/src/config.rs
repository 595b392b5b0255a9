//! Runtime configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists. Environment overrides
//! are applied once, right after loading, and never consulted again.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level weaver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaverConfig {
    /// Cycle scheduler parameters.
    pub engine: EngineConfig,
    /// Repository root and snapshot/backup limits.
    pub workspace: WorkspaceConfig,
    /// Commit policy.
    pub git: GitConfig,
    /// Status export for external dashboards.
    pub status: StatusConfig,
    /// Where governance documents live.
    pub governance: GovernanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master switch. A disabled engine runs zero cycles.
    pub enabled: bool,
    /// Maximum cycles per run.
    pub depth: u32,
    /// Pause between cycles in milliseconds.
    pub interval_ms: u64,
    /// Task text; each cycle appends its own `[cycle N]` tag.
    pub initial_task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Repository root. Writes resolving outside it are refused.
    pub root: PathBuf,
    /// Glob patterns left out of the content snapshot.
    pub exclude: Vec<String>,
    /// Files larger than this (bytes) are left out of the snapshot.
    pub max_file_size: u64,
    /// Prior content is backed up only when its size is at most this (bytes).
    pub backup_max_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Extensions (with leading dot) allowed in a commit. Empty allows all.
    pub allowed_extensions: Vec<String>,
    /// Ceiling on the total size of staged files (bytes).
    pub max_commit_size: Option<u64>,
    /// Pass `-S` to `git commit`.
    pub sign: bool,
    /// Push after committing.
    pub push: bool,
    /// Remote to push to. `None` uses the branch upstream.
    pub remote: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Fixed-shape JSON status file. Not written when unset.
    pub export_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Directory holding autonomy.json, roles.json, manifest.json.
    pub dir: PathBuf,
}

// ============================================================
// Defaults
// ============================================================

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            depth: 3,
            interval_ms: 1_000,
            initial_task: "weaver scheduled update".into(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            exclude: vec![
                "**/.git/**".into(),
                "**/.venv/**".into(),
                "**/venv/**".into(),
                "**/__pycache__/**".into(),
                "**/target/**".into(),
                "**/*.bak*".into(),
            ],
            max_file_size: 1_000_000,
            backup_max_size: 1_000_000,
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: Vec::new(),
            max_commit_size: None,
            sign: false,
            push: true,
            remote: None,
        }
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("governance"),
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

// ============================================================
// Loading
// ============================================================

impl WeaverConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Strict variant for callers that must not run on defaults.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Apply `WEAVER_*` overrides. `lookup` is `std::env::var(..).ok()` in
    /// production and a map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WEAVER_RECURSIVE_ENABLED") {
            self.engine.enabled = truthy(&v);
        }
        if let Some(v) = lookup("WEAVER_RECURSIVE_DEPTH") {
            match v.trim().parse() {
                Ok(depth) => self.engine.depth = depth,
                Err(_) => tracing::warn!("Ignoring WEAVER_RECURSIVE_DEPTH={}", v),
            }
        }
        if let Some(v) = lookup("WEAVER_RECURSIVE_INTERVAL_MS") {
            match v.trim().parse() {
                Ok(ms) => self.engine.interval_ms = ms,
                Err(_) => tracing::warn!("Ignoring WEAVER_RECURSIVE_INTERVAL_MS={}", v),
            }
        }
        if let Some(v) = lookup("WEAVER_REPO_ROOT") {
            self.workspace.root = PathBuf::from(v);
        }
        if let Some(v) = lookup("WEAVER_MAX_FILE_SIZE") {
            match v.trim().parse() {
                Ok(size) => {
                    self.workspace.max_file_size = size;
                    self.workspace.backup_max_size = size;
                }
                Err(_) => tracing::warn!("Ignoring WEAVER_MAX_FILE_SIZE={}", v),
            }
        }
        if let Some(v) = lookup("WEAVER_COMMIT_EXT_WHITELIST") {
            self.git.allowed_extensions = v
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("WEAVER_MAX_COMMIT_SIZE") {
            self.git.max_commit_size = v.trim().parse().ok();
        }
        if let Some(v) = lookup("WEAVER_GIT_SIGN") {
            self.git.sign = truthy(&v);
        }
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.engine.interval_ms)
    }
}
