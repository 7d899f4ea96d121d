//! Branch resolution and publishing against real git repositories
//!
//! Each test builds a small source history in a temporary directory, clones it
//! through the git client and checks which branch the resolver picks.

use audit_repo_cloner::external::{GitClient, ProcessCommandExecutor};
use audit_repo_cloner::provisioning::{
    BranchResolver, CommitReference, FirstBranchSelector, ProvisioningError,
};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=Audit Test",
            "-c",
            "user.email=audit@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit(dir: &Path, message: &str) -> String {
    git(dir, &["commit", "--allow-empty", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Source history: `main` and `release-1.0` share `base`; `audited` exists
/// only on `release-1.0`.
struct SourceHistory {
    dir: TempDir,
    base: String,
    audited: String,
}

impl SourceHistory {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-b", "main"]);
        let base = commit(dir.path(), "initial");
        git(dir.path(), &["checkout", "-b", "release-1.0"]);
        let audited = commit(dir.path(), "release fix");
        git(dir.path(), &["checkout", "main"]);
        commit(dir.path(), "main moves on");
        Self { dir, base, audited }
    }

    fn path(&self) -> &str {
        self.dir.path().to_str().unwrap()
    }
}

fn git_client() -> GitClient {
    GitClient::new(Arc::new(
        ProcessCommandExecutor::new().with_env("GIT_TERMINAL_PROMPT", "0"),
    ))
}

async fn cloned(source: &SourceHistory) -> (TempDir, std::path::PathBuf) {
    let workspace = tempfile::tempdir().unwrap();
    let checkout = workspace.path().join("checkout");
    git_client().clone_repository(source.path(), &checkout).await.unwrap();
    (workspace, checkout)
}

fn resolver() -> BranchResolver {
    BranchResolver::new(git_client(), "origin", Arc::new(FirstBranchSelector))
}

#[tokio::test]
async fn test_commit_only_on_release_branch_resolves_to_it() {
    let source = SourceHistory::new();
    let (_workspace, checkout) = cloned(&source).await;

    let branch = resolver()
        .resolve(&checkout, &CommitReference::parse(&source.audited).unwrap())
        .await
        .unwrap();

    assert_eq!(branch.name, "release-1.0");
}

#[tokio::test]
async fn test_shared_commit_uses_selector() {
    let source = SourceHistory::new();
    let (_workspace, checkout) = cloned(&source).await;

    let branch = resolver()
        .resolve(&checkout, &CommitReference::parse(&source.base).unwrap())
        .await
        .unwrap();

    // both branches contain it; the first-branch selector picks `main`
    assert_eq!(branch.name, "main");
}

#[tokio::test]
async fn test_unknown_commit_has_no_branch() {
    let source = SourceHistory::new();
    let (_workspace, checkout) = cloned(&source).await;
    let unknown = CommitReference::parse("0000000000000000000000000000000000000001").unwrap();

    let err = resolver().resolve(&checkout, &unknown).await.unwrap_err();

    assert!(matches!(err, ProvisioningError::NoContainingBranch { .. }));
}

#[tokio::test]
async fn test_release_branch_is_published_as_main_with_tag() {
    let source = SourceHistory::new();
    let (workspace, checkout) = cloned(&source).await;
    let target = workspace.path().join("target.git");
    let target_url = target.to_str().unwrap();
    git(workspace.path(), &["init", "--bare", "-b", "main", target_url]);

    let client = git_client();
    client.set_remote_url(&checkout, "origin", target_url).await.unwrap();
    client
        .fetch_branch(&checkout, source.path(), "origin", "release-1.0")
        .await
        .unwrap();
    client
        .checkout_tracking(&checkout, "origin", "release-1.0")
        .await
        .unwrap();
    client
        .push(&checkout, "origin", "refs/heads/release-1.0:refs/heads/main", true)
        .await
        .unwrap();
    client
        .create_tag(&checkout, "kupia-audit", &source.audited)
        .await
        .unwrap();
    client
        .push(&checkout, "origin", "refs/tags/kupia-audit", false)
        .await
        .unwrap();

    assert_eq!(git(&target, &["rev-parse", "refs/heads/main"]), source.audited);
    assert_eq!(
        git(&target, &["rev-parse", "refs/tags/kupia-audit^{commit}"]),
        source.audited
    );
    // the source's own main never reaches the target
    assert_eq!(
        git(&target, &["for-each-ref", "--format=%(refname)", "refs/heads"]),
        "refs/heads/main"
    );
}

#[tokio::test]
async fn test_second_tag_creation_fails() {
    let source = SourceHistory::new();
    let (_workspace, checkout) = cloned(&source).await;
    let client = git_client();

    client.create_tag(&checkout, "kupia-audit", &source.audited).await.unwrap();
    let err = client
        .create_tag(&checkout, "kupia-audit", &source.base)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("kupia-audit"));
}
