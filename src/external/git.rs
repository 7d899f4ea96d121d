//! Git command abstractions
//!
//! Thin wrapper over the `git` binary used by the provisioning pipeline. All
//! workspace operations are issued with `-C <workspace>` so the client never
//! depends on the process working directory.

use super::command::{CommandError, CommandExecutor, CommandOutput};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

pub type BranchName = String;

static CREDENTIALS_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https?://)[^@/\s]+@").expect("static regex"));

/// Replace credentials embedded in URLs with `***`.
pub fn redact_credentials(text: &str) -> String {
    CREDENTIALS_IN_URL.replace_all(text, "${1}***@").into_owned()
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository not found or not a git repository")]
    RepositoryNotFound,
    #[error("Branch not found: {branch}")]
    BranchNotFound { branch: BranchName },
    #[error("Reference already exists: {reference}")]
    ReferenceExists { reference: String },
    #[error("Command execution error: {source}")]
    CommandError {
        #[from]
        source: CommandError,
    },
    #[error("git {command} failed: {message}")]
    GitCommandFailed { command: String, message: String },
}

/// Git client driving the `git` binary through a [`CommandExecutor`].
#[derive(Clone)]
pub struct GitClient {
    executor: Arc<dyn CommandExecutor>,
}

impl GitClient {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        tracing::debug!(command = %redact_credentials(&args.join(" ")), "running git");
        Ok(self.executor.execute("git", args).await?)
    }

    async fn execute_git_command(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args).await?;

        if !output.success() {
            return Err(classify_git_error(&output.stderr, args));
        }

        Ok(output.stdout.trim().to_string())
    }

    /// `git ls-remote -h <url>`; the raw output is returned so callers can
    /// interpret the exit status themselves.
    pub async fn ls_remote_heads(&self, url: &str) -> Result<CommandOutput, GitError> {
        self.run(&["ls-remote", "-h", url]).await
    }

    pub async fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), GitError> {
        let destination = destination.to_string_lossy();
        self.execute_git_command(&["clone", url, &destination]).await?;
        Ok(())
    }

    /// Whether `sha` names a commit object present in the workspace.
    pub async fn commit_exists(&self, workspace: &Path, sha: &str) -> Result<bool, GitError> {
        let dir = workspace.to_string_lossy();
        let object = format!("{sha}^{{commit}}");
        let output = self.run(&["-C", &dir, "cat-file", "-e", &object]).await?;
        Ok(output.success())
    }

    /// Remote-tracking branches of `remote` whose history contains `sha`,
    /// with the remote prefix stripped.
    pub async fn remote_branches_containing(
        &self,
        workspace: &Path,
        remote: &str,
        sha: &str,
    ) -> Result<Vec<BranchName>, GitError> {
        let dir = workspace.to_string_lossy();
        let output = self
            .execute_git_command(&["-C", &dir, "branch", "-r", "--contains", sha])
            .await?;
        Ok(parse_branch_listing(&output, remote))
    }

    /// Fetch `branch` from `url` straight into `refs/remotes/<remote>/<branch>`.
    pub async fn fetch_branch(
        &self,
        workspace: &Path,
        url: &str,
        remote: &str,
        branch: &str,
    ) -> Result<(), GitError> {
        let dir = workspace.to_string_lossy();
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote}/{branch}");
        self.execute_git_command(&["-C", &dir, "fetch", url, &refspec])
            .await?;
        Ok(())
    }

    /// Check out a local `branch` reset to the remote-tracking tip.
    pub async fn checkout_tracking(
        &self,
        workspace: &Path,
        remote: &str,
        branch: &str,
    ) -> Result<(), GitError> {
        let dir = workspace.to_string_lossy();
        let start_point = format!("{remote}/{branch}");
        self.execute_git_command(&["-C", &dir, "checkout", "-B", branch, &start_point])
            .await?;
        Ok(())
    }

    pub async fn set_remote_url(&self, workspace: &Path, remote: &str, url: &str) -> Result<(), GitError> {
        let dir = workspace.to_string_lossy();
        self.execute_git_command(&["-C", &dir, "remote", "set-url", remote, url])
            .await?;
        Ok(())
    }

    pub async fn push(
        &self,
        workspace: &Path,
        remote: &str,
        refspec: &str,
        set_upstream: bool,
    ) -> Result<(), GitError> {
        let dir = workspace.to_string_lossy();
        let mut args = vec!["-C", &*dir, "push"];
        if set_upstream {
            args.push("-u");
        }
        args.extend([remote, refspec]);
        self.execute_git_command(&args).await?;
        Ok(())
    }

    /// Create a lightweight tag `name` at `sha`.
    pub async fn create_tag(&self, workspace: &Path, name: &str, sha: &str) -> Result<(), GitError> {
        let dir = workspace.to_string_lossy();
        self.execute_git_command(&["-C", &dir, "tag", name, sha]).await?;
        Ok(())
    }
}

/// Name of the git subcommand, skipping a leading `-C <dir>`.
fn subcommand<'a>(args: &[&'a str]) -> &'a str {
    match args {
        ["-C", _, sub, ..] => *sub,
        [sub, ..] => *sub,
        [] => "",
    }
}

fn classify_git_error(stderr: &str, args: &[&str]) -> GitError {
    let command = subcommand(args).to_string();
    if stderr.contains("not a git repository") {
        GitError::RepositoryNotFound
    } else if stderr.contains("already exists") && command == "tag" {
        GitError::ReferenceExists {
            reference: args.iter().rev().nth(1).unwrap_or(&"unknown").to_string(),
        }
    } else if command == "checkout" && (stderr.contains("not a commit") || stderr.contains("invalid reference")) {
        GitError::BranchNotFound {
            branch: args.get(4).unwrap_or(&"unknown").to_string(),
        }
    } else {
        GitError::GitCommandFailed {
            command,
            message: redact_credentials(stderr.trim()),
        }
    }
}

/// Parse `git branch -r` output into branch names of `remote`.
///
/// The symbolic `<remote>/HEAD -> <remote>/main` line is not a branch and is
/// dropped. Results are sorted and deduplicated.
pub fn parse_branch_listing(output: &str, remote: &str) -> Vec<BranchName> {
    let prefix = format!("{remote}/");
    let mut branches: Vec<BranchName> = output
        .lines()
        .map(|line| line.trim().trim_start_matches("* ").trim())
        .filter(|line| !line.is_empty() && !line.contains(" -> "))
        .filter_map(|line| line.strip_prefix(&prefix))
        .filter(|name| !name.is_empty() && *name != "HEAD")
        .map(str::to_string)
        .collect();
    branches.sort();
    branches.dedup();
    branches
}
