//! Version-control collaborator: git commit+push behind policy limits.
//!
//! Policy refusals (nothing staged, disallowed extension, size ceiling, a
//! failed commit or push) return `Ok(false)`. Only a git invocation that
//! cannot run, or a failed `git add`, is an error. A refusal after staging
//! resets the index so the next commit starts clean.

use crate::fs::resolve_in_root;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};
use weaver_core::config::GitConfig;
use weaver_core::{Availability, Capability};

/// Separates commit bodies in `git log` output.
const RECORD_SEPARATOR: char = '\u{1e}';

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("failed to run git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {args} exited with {code:?}: {stderr}")]
    Failed {
        args: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl From<GitError> for weaver_core::Error {
    fn from(e: GitError) -> Self {
        weaver_core::Error::VersionControl(e.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Seam over process execution so commit policy can be tested without git.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, cwd: &Path, args: &[String]) -> Result<CommandOutput, GitError>;
}

/// Runs the real `git` binary.
pub struct ProcessRunner;

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cwd: &Path, args: &[String]) -> Result<CommandOutput, GitError> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|source| GitError::Spawn {
                args: args.join(" "),
                source,
            })?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[async_trait::async_trait]
pub trait VersionControl: Send + Sync {
    /// Stage `paths`, commit with `metadata` appended to `message`, then push.
    /// Returns whether a commit landed (and was pushed, when pushing is on).
    async fn commit_and_push(
        &self,
        message: &str,
        paths: &[String],
        metadata: &BTreeMap<String, String>,
    ) -> Result<bool, GitError>;

    async fn recent_messages(&self, _n: usize) -> Capability<Vec<String>> {
        Capability::Unsupported
    }

    async fn probe(&self) -> Availability {
        Availability::Available
    }
}

/// `message | ts=<unix> | key=value | ...`
pub fn format_commit_message(message: &str, ts: i64, metadata: &BTreeMap<String, String>) -> String {
    let mut out = format!("{} | ts={}", message, ts);
    for (key, value) in metadata {
        out.push_str(&format!(" | {}={}", key, value));
    }
    out
}

fn has_allowed_extension(path: &str, allowed: &[String]) -> bool {
    allowed.is_empty() || allowed.iter().any(|ext| path.ends_with(ext.as_str()))
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub struct GitOps<R: CommandRunner = ProcessRunner> {
    root: PathBuf,
    policy: GitConfig,
    runner: R,
}

impl GitOps<ProcessRunner> {
    pub fn new(root: impl AsRef<Path>, policy: GitConfig) -> Self {
        Self::with_runner(root, policy, ProcessRunner)
    }
}

impl<R: CommandRunner> GitOps<R> {
    pub fn with_runner(root: impl AsRef<Path>, policy: GitConfig, runner: R) -> Self {
        let root = root.as_ref();
        Self {
            root: std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()),
            policy,
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn git(&self, argv: Vec<String>) -> Result<CommandOutput, GitError> {
        self.runner.run(&self.root, &argv).await
    }

    /// Paths inside the root, relative to it, with an allowed extension.
    fn stageable(&self, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| match resolve_in_root(&self.root, p) {
                Ok(abs) => abs
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/")),
                Err(_) => {
                    warn!("Not staging {}: outside repo root", p);
                    None
                }
            })
            .filter(|rel| !rel.is_empty())
            .filter(|rel| has_allowed_extension(rel, &self.policy.allowed_extensions))
            .collect()
    }

    async fn staged_size(&self, staged: &[String]) -> u64 {
        let mut total = 0;
        for file in staged {
            match tokio::fs::metadata(self.root.join(file)).await {
                Ok(m) => total += m.len(),
                Err(e) => warn!("Failed to read size for {}: {}", file, e),
            }
        }
        total
    }

    async fn unstage(&self, files: &[String]) {
        if files.is_empty() {
            return;
        }
        let mut reset = args(&["reset", "-q", "--"]);
        reset.extend(files.iter().cloned());
        match self.git(reset).await {
            Ok(out) if out.success => debug!("Unstaged {} files", files.len()),
            Ok(out) => warn!("git reset failed: {}", out.stderr.trim()),
            Err(e) => warn!("git reset failed: {}", e),
        }
    }
}

#[async_trait::async_trait]
impl<R: CommandRunner> VersionControl for GitOps<R> {
    async fn commit_and_push(
        &self,
        message: &str,
        paths: &[String],
        metadata: &BTreeMap<String, String>,
    ) -> Result<bool, GitError> {
        let mut add = args(&["add", "--"]);
        if paths.is_empty() {
            add.push(".".into());
        } else {
            let stageable = self.stageable(paths);
            if stageable.is_empty() {
                warn!("No stageable files among {} paths; skipping commit", paths.len());
                return Ok(false);
            }
            add.extend(stageable);
        }

        let out = self.git(add.clone()).await?;
        if !out.success {
            return Err(GitError::Failed {
                args: add.join(" "),
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }

        let added: Vec<String> = add[2..].to_vec();
        let diff = self.git(args(&["diff", "--staged", "--name-only"])).await?;
        let staged: Vec<String> = if diff.success {
            let staged: Vec<String> = diff
                .stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
            if staged.is_empty() {
                info!("No staged changes; skipping commit");
                return Ok(false);
            }
            staged
        } else {
            warn!("Failed to list staged files; attempting commit anyway");
            Vec::new()
        };
        let to_reset = if staged.is_empty() { &added } else { &staged };

        let disallowed: Vec<&String> = staged
            .iter()
            .filter(|p| !has_allowed_extension(p, &self.policy.allowed_extensions))
            .collect();
        if !disallowed.is_empty() {
            warn!("Staged files with disallowed extensions, refusing to commit: {:?}", disallowed);
            self.unstage(to_reset).await;
            return Ok(false);
        }

        if let Some(max) = self.policy.max_commit_size {
            let total = self.staged_size(&staged).await;
            if total > max {
                warn!("Staged size {} exceeds max_commit_size {}; refusing to commit", total, max);
                self.unstage(to_reset).await;
                return Ok(false);
            }
        }

        let full = format_commit_message(message, chrono::Utc::now().timestamp(), metadata);
        let mut commit = args(&["commit"]);
        if self.policy.sign {
            commit.push("-S".into());
        }
        commit.push("-m".into());
        commit.push(full.clone());
        let out = self.git(commit).await?;
        if !out.success {
            warn!("git commit failed: {}", out.stderr.trim());
            self.unstage(to_reset).await;
            return Ok(false);
        }
        info!("Committed: {}", full);

        if self.policy.push {
            let mut push = args(&["push"]);
            if let Some(remote) = &self.policy.remote {
                push.push(remote.clone());
            }
            let out = self.git(push).await?;
            if !out.success {
                warn!("git push failed: {}", out.stderr.trim());
                return Ok(false);
            }
            info!("Pushed");
        }
        Ok(true)
    }

    async fn recent_messages(&self, n: usize) -> Capability<Vec<String>> {
        let argv = vec![
            "log".to_string(),
            "-n".to_string(),
            n.to_string(),
            format!("--pretty=format:%B{}", RECORD_SEPARATOR),
        ];
        let messages = match self.git(argv).await {
            Ok(out) if out.success => out
                .stdout
                .split(RECORD_SEPARATOR)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
            Ok(out) => {
                warn!("git log failed: {}", out.stderr.trim());
                Vec::new()
            }
            Err(e) => {
                warn!("git log failed: {}", e);
                Vec::new()
            }
        };
        Capability::Supported(messages)
    }

    async fn probe(&self) -> Availability {
        match self.git(args(&["rev-parse", "--is-inside-work-tree"])).await {
            Ok(out) if out.success => Availability::Available,
            Ok(_) => Availability::Degraded(format!("{} is not a git work tree", self.root.display())),
            Err(e) => Availability::Degraded(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_ts_then_sorted_metadata() {
        let mut meta = BTreeMap::new();
        meta.insert("engine_cycle".to_string(), "2".to_string());
        meta.insert("actor".to_string(), "weaver".to_string());
        assert_eq!(
            format_commit_message("weaver: auto update - x", 1700000000, &meta),
            "weaver: auto update - x | ts=1700000000 | actor=weaver | engine_cycle=2"
        );
    }

    #[test]
    fn empty_allow_list_allows_everything() {
        assert!(has_allowed_extension("a.bin", &[]));
        assert!(has_allowed_extension("a.md", &[".md".into()]));
        assert!(!has_allowed_extension("a.rs", &[".md".into()]));
    }
}
