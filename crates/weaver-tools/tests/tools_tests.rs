//! Tests for weaver-tools: root-bounded writes, snapshot, git commit policy

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use weaver_core::config::{GitConfig, WorkspaceConfig};
use weaver_core::{Availability, Capability};
use weaver_tools::*;

fn workspace(dir: &Path) -> RepoWorkspace {
    RepoWorkspace::new(dir).unwrap()
}

fn backups(dir: &Path, prefix: &str) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with(&format!("{}.bak.", prefix)))
        .collect()
}

// ===========================================================================
// RepoWorkspace::write_file
// ===========================================================================

#[tokio::test]
async fn write_new_file_creates_parents() {
    let dir = tempfile::tempdir().unwrap();
    let ws = workspace(dir.path());
    assert!(ws.write_file("notes/deep/a.txt", "hello").await.unwrap());
    let written = std::fs::read_to_string(dir.path().join("notes/deep/a.txt")).unwrap();
    assert_eq!(written, "hello");
    assert!(backups(&dir.path().join("notes/deep"), "a.txt").is_empty());
}

#[tokio::test]
async fn identical_content_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "same").unwrap();
    let ws = workspace(dir.path());
    assert!(!ws.write_file("a.txt", "same").await.unwrap());
    assert!(backups(dir.path(), "a.txt").is_empty());
}

#[tokio::test]
async fn overwrite_creates_timestamped_backup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "old").unwrap();
    let ws = workspace(dir.path());
    assert!(ws.write_file("a.txt", "new").await.unwrap());
    let baks = backups(dir.path(), "a.txt");
    assert_eq!(baks.len(), 1);
    assert_eq!(std::fs::read_to_string(dir.path().join(&baks[0])).unwrap(), "old");
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
}

#[tokio::test]
async fn large_prior_content_is_not_backed_up() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
    let ws = RepoWorkspace::from_config(&WorkspaceConfig {
        root: dir.path().to_path_buf(),
        backup_max_size: 5,
        ..Default::default()
    })
    .unwrap();
    assert!(ws.write_file("big.txt", "small").await.unwrap());
    assert!(backups(dir.path(), "big.txt").is_empty());
}

#[tokio::test]
async fn write_outside_root_is_refused_and_leaves_fs_untouched() {
    let outer = tempfile::tempdir().unwrap();
    let root = outer.path().join("repo");
    std::fs::create_dir(&root).unwrap();
    let ws = workspace(&root);

    let err = ws.write_file("../escape/evil.txt", "x").await.unwrap_err();
    assert!(matches!(err, FsError::OutsideRoot { .. }));
    assert!(!outer.path().join("escape").exists());

    let abs = outer.path().join("abs.txt");
    let err = ws.write_file(abs.to_str().unwrap(), "x").await.unwrap_err();
    assert!(matches!(err, FsError::OutsideRoot { .. }));
    assert!(!abs.exists());

    let core: weaver_core::Error = err.into();
    assert!(core.is_boundary_breach());
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escape_is_refused() {
    let outer = tempfile::tempdir().unwrap();
    let root = outer.path().join("repo");
    let elsewhere = outer.path().join("elsewhere");
    std::fs::create_dir(&root).unwrap();
    std::fs::create_dir(&elsewhere).unwrap();
    std::os::unix::fs::symlink(&elsewhere, root.join("link")).unwrap();
    let ws = workspace(&root);
    assert!(ws.write_file("link/x.txt", "x").await.is_err());
    assert!(!elsewhere.join("x.txt").exists());
}

// ===========================================================================
// RepoWorkspace::snapshot
// ===========================================================================

#[tokio::test]
async fn snapshot_skips_excluded_large_and_binary() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join(".git")).unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join(".git/config"), "[core]").unwrap();
    std::fs::write(root.join("src/lib.rs"), "pub fn f() {}").unwrap();
    std::fs::write(root.join("README.md"), "# r").unwrap();
    std::fs::write(root.join("README.md.bak.1"), "old").unwrap();
    std::fs::write(root.join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();
    std::fs::write(root.join("huge.txt"), "x".repeat(64)).unwrap();

    let ws = RepoWorkspace::from_config(&WorkspaceConfig {
        root: root.to_path_buf(),
        max_file_size: 32,
        ..Default::default()
    })
    .unwrap();
    let snap = ws.snapshot().await.unwrap();
    let keys: Vec<&str> = snap.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["README.md", "src/lib.rs"]);
    assert_eq!(snap["src/lib.rs"], "pub fn f() {}");
}

#[tokio::test]
async fn probe_reports_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let ws = workspace(&dir.path().join("not-yet"));
    assert!(matches!(ws.probe().await, Availability::Degraded(_)));
    assert_eq!(workspace(dir.path()).probe().await, Availability::Available);
}

// ===========================================================================
// GitOps (scripted runner)
// ===========================================================================

#[derive(Default)]
struct FakeGit {
    staged: String,
    commit_ok: bool,
    push_ok: bool,
    log: String,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeGit {
    fn ok(staged: &str) -> Self {
        Self {
            staged: staged.into(),
            commit_ok: true,
            push_ok: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn verbs(&self) -> Vec<String> {
        self.calls().iter().map(|c| c[0].clone()).collect()
    }
}

#[async_trait::async_trait]
impl CommandRunner for FakeGit {
    async fn run(&self, _cwd: &Path, args: &[String]) -> Result<CommandOutput, GitError> {
        self.calls.lock().unwrap().push(args.to_vec());
        let (success, stdout) = match args[0].as_str() {
            "diff" => (true, self.staged.clone()),
            "commit" => (self.commit_ok, String::new()),
            "push" => (self.push_ok, String::new()),
            "log" => (true, self.log.clone()),
            _ => (true, String::new()),
        };
        Ok(CommandOutput {
            success,
            code: Some(if success { 0 } else { 1 }),
            stdout,
            stderr: String::new(),
        })
    }
}

fn meta(cycle: u32) -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("engine_cycle".to_string(), cycle.to_string());
    m
}

#[tokio::test]
async fn commit_happy_path_adds_commits_and_pushes() {
    let dir = tempfile::tempdir().unwrap();
    let git = GitOps::with_runner(dir.path(), GitConfig::default(), FakeGit::ok("a.txt\n"));
    let ok = git
        .commit_and_push("weaver: auto update - t", &["a.txt".into()], &meta(1))
        .await
        .unwrap();
    assert!(ok);
    let runner = git.runner();
    assert_eq!(runner.verbs(), vec!["add", "diff", "commit", "push"]);
    let commit = &runner.calls()[2];
    let msg = commit.last().unwrap();
    assert!(msg.starts_with("weaver: auto update - t | ts="));
    assert!(msg.ends_with(" | engine_cycle=1"));
}

#[tokio::test]
async fn nothing_staged_is_false_without_commit() {
    let dir = tempfile::tempdir().unwrap();
    let git = GitOps::with_runner(dir.path(), GitConfig::default(), FakeGit::ok(""));
    assert!(!git.commit_and_push("m", &["a.txt".into()], &meta(1)).await.unwrap());
    assert_eq!(git.runner().verbs(), vec!["add", "diff"]);
}

#[tokio::test]
async fn paths_outside_root_are_not_staged() {
    let dir = tempfile::tempdir().unwrap();
    let git = GitOps::with_runner(dir.path(), GitConfig::default(), FakeGit::ok("a.txt\n"));
    assert!(!git.commit_and_push("m", &["../x.txt".into()], &meta(1)).await.unwrap());
    assert!(git.runner().calls().is_empty());
}

#[tokio::test]
async fn extension_allow_list_filters_and_refuses() {
    let dir = tempfile::tempdir().unwrap();
    let policy = GitConfig {
        allowed_extensions: vec![".md".into()],
        ..Default::default()
    };
    // Nothing with an allowed extension: no git calls at all
    let git = GitOps::with_runner(dir.path(), policy.clone(), FakeGit::ok("a.rs\n"));
    assert!(!git.commit_and_push("m", &["a.rs".into()], &meta(1)).await.unwrap());
    assert!(git.runner().calls().is_empty());

    // Something disallowed already staged: refuse before commit and unstage
    let git = GitOps::with_runner(dir.path(), policy, FakeGit::ok("a.md\nother.rs\n"));
    assert!(!git.commit_and_push("m", &["a.md".into()], &meta(1)).await.unwrap());
    assert_eq!(git.runner().verbs(), vec!["add", "diff", "reset"]);
    assert_eq!(git.runner().calls()[2], vec!["reset", "-q", "--", "a.md", "other.rs"]);
}

#[tokio::test]
async fn size_ceiling_refuses_commit() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "x".repeat(100)).unwrap();
    let policy = GitConfig {
        max_commit_size: Some(10),
        ..Default::default()
    };
    let git = GitOps::with_runner(dir.path(), policy, FakeGit::ok("a.txt\n"));
    assert!(!git.commit_and_push("m", &["a.txt".into()], &meta(1)).await.unwrap());
    assert_eq!(git.runner().verbs(), vec!["add", "diff", "reset"]);
    assert_eq!(git.runner().calls()[2], vec!["reset", "-q", "--", "a.txt"]);
}

#[tokio::test]
async fn sign_and_remote_are_passed_through() {
    let dir = tempfile::tempdir().unwrap();
    let policy = GitConfig {
        sign: true,
        remote: Some("origin".into()),
        ..Default::default()
    };
    let git = GitOps::with_runner(dir.path(), policy, FakeGit::ok("a.txt\n"));
    assert!(git.commit_and_push("m", &["a.txt".into()], &meta(1)).await.unwrap());
    let calls = git.runner().calls();
    assert_eq!(&calls[2][..3], &["commit", "-S", "-m"]);
    assert_eq!(calls[3], vec!["push", "origin"]);
}

#[tokio::test]
async fn push_disabled_and_push_failure() {
    let dir = tempfile::tempdir().unwrap();
    let no_push = GitConfig {
        push: false,
        ..Default::default()
    };
    let git = GitOps::with_runner(dir.path(), no_push, FakeGit::ok("a.txt\n"));
    assert!(git.commit_and_push("m", &["a.txt".into()], &meta(1)).await.unwrap());
    assert!(!git.runner().verbs().contains(&"push".to_string()));

    let failing = FakeGit {
        push_ok: false,
        ..FakeGit::ok("a.txt\n")
    };
    let git = GitOps::with_runner(dir.path(), GitConfig::default(), failing);
    assert!(!git.commit_and_push("m", &["a.txt".into()], &meta(1)).await.unwrap());
}

#[tokio::test]
async fn failed_commit_is_false() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeGit {
        commit_ok: false,
        ..FakeGit::ok("a.txt\n")
    };
    let git = GitOps::with_runner(dir.path(), GitConfig::default(), runner);
    assert!(!git.commit_and_push("m", &["a.txt".into()], &meta(1)).await.unwrap());
    assert_eq!(git.runner().verbs(), vec!["add", "diff", "commit", "reset"]);
}

// ===========================================================================
// GitOps (real git)
// ===========================================================================

fn sh_git(dir: &Path, argv: &[&str]) -> std::process::Output {
    std::process::Command::new("git")
        .args(argv)
        .current_dir(dir)
        .output()
        .unwrap()
}

/// A repository with one commit, or `None` when git is not installed.
fn init_repo(dir: &Path) -> Option<()> {
    std::process::Command::new("git").arg("--version").output().ok()?;
    sh_git(dir, &["init", "-q"]);
    sh_git(dir, &["config", "user.email", "weaver@example.com"]);
    sh_git(dir, &["config", "user.name", "weaver"]);
    sh_git(dir, &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.join("seed.txt"), "seed").unwrap();
    sh_git(dir, &["add", "seed.txt"]);
    sh_git(dir, &["commit", "-q", "-m", "seed"]);
    Some(())
}

#[tokio::test]
async fn oversized_commit_does_not_block_the_next_one() {
    let dir = tempfile::tempdir().unwrap();
    if init_repo(dir.path()).is_none() {
        return;
    }
    let policy = GitConfig {
        push: false,
        max_commit_size: Some(50),
        ..Default::default()
    };
    let git = GitOps::new(dir.path(), policy);

    std::fs::write(dir.path().join("big.txt"), "x".repeat(200)).unwrap();
    assert!(!git.commit_and_push("big", &["big.txt".into()], &meta(1)).await.unwrap());
    let staged = sh_git(dir.path(), &["diff", "--staged", "--name-only"]);
    assert!(String::from_utf8_lossy(&staged.stdout).trim().is_empty());

    std::fs::write(dir.path().join("small.txt"), "y").unwrap();
    assert!(git.commit_and_push("small", &["small.txt".into()], &meta(2)).await.unwrap());
    match git.recent_messages(1).await {
        Capability::Supported(msgs) => assert!(msgs[0].starts_with("small | ts=")),
        Capability::Unsupported => panic!("git supports history"),
    }
}

#[tokio::test]
async fn recent_messages_split_on_record_separator() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeGit {
        log: "second\n\nwith body\u{1e}\nfirst\u{1e}".into(),
        ..FakeGit::ok("")
    };
    let git = GitOps::with_runner(dir.path(), GitConfig::default(), runner);
    match git.recent_messages(3).await {
        Capability::Supported(msgs) => assert_eq!(msgs, vec!["second\n\nwith body", "first"]),
        Capability::Unsupported => panic!("git supports history"),
    }
}

#[tokio::test]
async fn default_recent_messages_is_unsupported() {
    struct Silent;
    #[async_trait::async_trait]
    impl VersionControl for Silent {
        async fn commit_and_push(
            &self,
            _message: &str,
            _paths: &[String],
            _metadata: &BTreeMap<String, String>,
        ) -> Result<bool, GitError> {
            Ok(false)
        }
    }
    assert!(!Silent.recent_messages(3).await.is_supported());
}
