//! Weaver Tools - filesystem and version-control collaborators
//!
//! - fs: root-bounded writes with backups, repository snapshot
//! - git: commit+push behind extension and size limits

pub mod fs;
pub mod git;

pub use fs::{resolve_in_root, FsError, RepoWorkspace, Workspace};
pub use git::{
    format_commit_message, CommandOutput, CommandRunner, GitError, GitOps, ProcessRunner,
    VersionControl,
};
