//! Filesystem collaborator: root-bounded writes with backups, plus the
//! repository snapshot handed to the generator.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use weaver_core::config::WorkspaceConfig;
use weaver_core::Availability;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("refusing to write outside repo root: {path} (root {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

impl FsError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FsError> for weaver_core::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::OutsideRoot { path, root } => weaver_core::Error::write_refused(path, root),
            FsError::Io { source, .. } => weaver_core::Error::Io(source),
            FsError::Pattern { pattern, message } => weaver_core::Error::config(format!(
                "invalid exclude pattern '{}': {}",
                pattern, message
            )),
        }
    }
}

/// Repository working copy as seen by the scheduler.
#[async_trait::async_trait]
pub trait Workspace: Send + Sync {
    fn root(&self) -> &Path;

    /// Relative path → UTF-8 content for every readable, non-excluded file.
    async fn snapshot(&self) -> Result<BTreeMap<String, String>, FsError>;

    /// Write `content` to `path` (relative to root). Returns whether the
    /// content differed from what was there. A path resolving outside the
    /// root fails with `FsError::OutsideRoot` before anything is touched.
    async fn write_file(&self, path: &str, content: &str) -> Result<bool, FsError>;

    /// Absolute target for `path`, or `FsError::OutsideRoot`. Touches nothing,
    /// so a whole batch can be checked before the first write.
    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        resolve_in_root(self.root(), path)
    }

    async fn probe(&self) -> Availability {
        Availability::Available
    }
}

/// Lexical normalization: drops `.`, folds `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and re-attach the rest.
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(canonical) = std::fs::canonicalize(ancestor) {
            return match path.strip_prefix(ancestor) {
                Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
                _ => canonical,
            };
        }
    }
    path.to_path_buf()
}

/// Resolve `path` against a canonical `root` and require the result to stay
/// inside it. Symlinks in the existing part of the path are followed.
pub fn resolve_in_root(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, FsError> {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let resolved = canonicalize_existing_prefix(&normalize(&joined));
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(FsError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}

fn build_exclude(patterns: &[String]) -> Result<GlobSet, FsError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| FsError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| FsError::Pattern {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

fn rel_key(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

pub struct RepoWorkspace {
    root: PathBuf,
    exclude: GlobSet,
    max_file_size: u64,
    backup_max_size: u64,
}

impl RepoWorkspace {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, FsError> {
        Self::from_config(&WorkspaceConfig {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    /// The root need not exist yet; `probe` reports it as degraded.
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self, FsError> {
        let root = match std::fs::canonicalize(&config.root) {
            Ok(root) => root,
            Err(_) => {
                let cwd = std::env::current_dir().map_err(|e| FsError::io(".", e))?;
                normalize(&cwd.join(&config.root))
            }
        };
        Ok(Self {
            root,
            exclude: build_exclude(&config.exclude)?,
            max_file_size: config.max_file_size,
            backup_max_size: config.backup_max_size,
        })
    }

    fn excluded(&self, rel: &Path, is_dir: bool) -> bool {
        if is_dir {
            // Directory patterns are written as `dir/**`
            self.exclude.is_match(rel.join("_"))
        } else {
            self.exclude.is_match(rel)
        }
    }

    fn backup_path(target: &Path) -> PathBuf {
        let ts = chrono::Utc::now().timestamp();
        let base = format!("{}.bak.{}", target.display(), ts);
        let mut candidate = PathBuf::from(&base);
        let mut n = 1;
        while candidate.exists() {
            candidate = PathBuf::from(format!("{}.{}", base, n));
            n += 1;
        }
        candidate
    }
}

#[async_trait::async_trait]
impl Workspace for RepoWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, String>, FsError> {
        let candidates: Vec<(String, PathBuf)> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                let rel = e.path().strip_prefix(&self.root).unwrap_or(e.path());
                rel.as_os_str().is_empty() || !self.excluded(rel, e.file_type().is_dir())
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&self.root).ok()?.to_path_buf();
                let size = e.metadata().map(|m| m.len()).unwrap_or(0);
                if size > self.max_file_size {
                    debug!("Skipping large file {} ({} bytes)", rel.display(), size);
                    return None;
                }
                Some((rel_key(&rel), e.into_path()))
            })
            .collect();

        let mut files = BTreeMap::new();
        for (key, path) in candidates {
            match fs::read_to_string(&path).await {
                Ok(content) => {
                    files.insert(key, content);
                }
                Err(e) => debug!("Skipping unreadable file {}: {}", key, e),
            }
        }
        info!("Read {} files from {}", files.len(), self.root.display());
        Ok(files)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<bool, FsError> {
        let target = self.resolve(path)?;

        let existing = match fs::read(&target).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(FsError::io(&target, e)),
        };
        if existing.as_deref() == Some(content.as_bytes()) {
            debug!("Unchanged: {}", path);
            return Ok(false);
        }

        if let Some(prior) = &existing {
            if prior.len() as u64 <= self.backup_max_size {
                let backup = Self::backup_path(&target);
                match fs::write(&backup, prior).await {
                    Ok(()) => info!("Created backup {} -> {}", path, backup.display()),
                    Err(e) => warn!("Failed to write backup for {}: {}", path, e),
                }
            } else {
                info!(
                    "Skipping backup for {} ({} > {} bytes)",
                    path,
                    prior.len(),
                    self.backup_max_size
                );
            }
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::io(parent, e))?;
        }
        fs::write(&target, content)
            .await
            .map_err(|e| FsError::io(&target, e))?;
        info!("Wrote {} ({} bytes)", path, content.len());
        Ok(true)
    }

    async fn probe(&self) -> Availability {
        match fs::metadata(&self.root).await {
            Ok(m) if m.is_dir() => Availability::Available,
            Ok(_) => Availability::Degraded(format!("{} is not a directory", self.root.display())),
            Err(e) => Availability::Degraded(format!("{}: {}", self.root.display(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_parent_dirs() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/a/../../x")), PathBuf::from("/x"));
    }

    #[test]
    fn resolve_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        assert!(resolve_in_root(&root, "a/b.txt").is_ok());
        assert!(matches!(
            resolve_in_root(&root, "../outside.txt"),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(resolve_in_root(&root, "/etc/passwd").is_err());
        assert!(resolve_in_root(&root, "a/../../b").is_err());
    }

    #[test]
    fn default_excludes_cover_vcs_and_backups() {
        let ws = RepoWorkspace::new(".").unwrap();
        assert!(ws.excluded(Path::new(".git"), true));
        assert!(ws.excluded(Path::new("sub/__pycache__"), true));
        assert!(ws.excluded(Path::new("notes.txt.bak.1700000000"), false));
        assert!(!ws.excluded(Path::new("src/main.rs"), false));
    }

    #[test]
    fn bad_pattern_is_error() {
        let cfg = WorkspaceConfig {
            exclude: vec!["[".into()],
            ..Default::default()
        };
        assert!(matches!(
            RepoWorkspace::from_config(&cfg),
            Err(FsError::Pattern { .. })
        ));
    }
}
