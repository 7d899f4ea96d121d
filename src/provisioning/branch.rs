use super::errors::ProvisioningError;
use super::types::{Branch, CommitReference};
use crate::external::GitClient;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(test)]
use mockall::automock;

/// Picks one branch when the audited commit is reachable from several.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BranchSelector: Send + Sync {
    /// Name recorded in the selection log line.
    fn name(&self) -> &'static str;

    /// `candidates` is sorted, deduplicated and holds at least two branches.
    async fn select(
        &self,
        commit: &CommitReference,
        candidates: &[Branch],
    ) -> Result<Branch, ProvisioningError>;
}

/// Lexicographically first candidate, for unattended runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstBranchSelector;

#[async_trait]
impl BranchSelector for FirstBranchSelector {
    fn name(&self) -> &'static str {
        "first"
    }

    async fn select(
        &self,
        _commit: &CommitReference,
        candidates: &[Branch],
    ) -> Result<Branch, ProvisioningError> {
        candidates
            .iter()
            .min()
            .cloned()
            .ok_or_else(|| ProvisioningError::AmbiguousBranchUnresolved {
                candidates: Vec::new(),
                reason: "no candidates to choose from".to_string(),
            })
    }
}

/// Asks the operator on stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveBranchSelector;

#[async_trait]
impl BranchSelector for InteractiveBranchSelector {
    fn name(&self) -> &'static str {
        "interactive"
    }

    async fn select(
        &self,
        commit: &CommitReference,
        candidates: &[Branch],
    ) -> Result<Branch, ProvisioningError> {
        let commit = commit.clone();
        let owned = candidates.to_vec();

        // stdin reads block; keep them off the runtime so interrupts still land
        let prompt = tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            prompt_for_branch(&commit, &owned, stdin.lock(), stdout.lock())
        });

        prompt.await.map_err(|e| ProvisioningError::AmbiguousBranchUnresolved {
            candidates: candidates.iter().map(|b| b.name.clone()).collect(),
            reason: format!("prompt task failed: {e}"),
        })?
    }
}

/// Present `candidates` as a numbered list and read a 1-based choice.
///
/// Invalid choices are reported and asked again. End of input resolves to
/// [`ProvisioningError::AmbiguousBranchUnresolved`].
pub fn prompt_for_branch<R: BufRead, W: Write>(
    commit: &CommitReference,
    candidates: &[Branch],
    mut input: R,
    mut output: W,
) -> Result<Branch, ProvisioningError> {
    let unresolved = |reason: String| ProvisioningError::AmbiguousBranchUnresolved {
        candidates: candidates.iter().map(|b| b.name.clone()).collect(),
        reason,
    };
    let io_failure = |e: std::io::Error| unresolved(format!("terminal error: {e}"));

    writeln!(output, "Commit {commit} is contained in multiple branches:").map_err(io_failure)?;
    for (index, branch) in candidates.iter().enumerate() {
        writeln!(output, "  {}. {}", index + 1, branch).map_err(io_failure)?;
    }

    loop {
        write!(output, "Select the branch to publish [1-{}]: ", candidates.len()).map_err(io_failure)?;
        output.flush().map_err(io_failure)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(io_failure)? == 0 {
            return Err(unresolved("input closed before a branch was selected".to_string()));
        }

        match parse_selection(line.trim(), candidates.len()) {
            Ok(index) => return Ok(candidates[index].clone()),
            Err(e) => {
                warn!(error = %e, "Rejected branch selection");
                writeln!(output, "{e}").map_err(io_failure)?;
            }
        }
    }
}

fn parse_selection(input: &str, max: usize) -> Result<usize, ProvisioningError> {
    let invalid = || ProvisioningError::AmbiguousSelectionInvalid {
        input: input.to_string(),
        max,
    };
    let choice: usize = input.parse().map_err(|_| invalid())?;
    if (1..=max).contains(&choice) {
        Ok(choice - 1)
    } else {
        Err(invalid())
    }
}

/// Finds the single branch to publish for the audited commit.
pub struct BranchResolver {
    git: GitClient,
    remote: String,
    selector: Arc<dyn BranchSelector>,
}

impl BranchResolver {
    pub fn new(git: GitClient, remote: impl Into<String>, selector: Arc<dyn BranchSelector>) -> Self {
        Self {
            git,
            remote: remote.into(),
            selector,
        }
    }

    pub async fn resolve(
        &self,
        workspace: &Path,
        commit: &CommitReference,
    ) -> Result<Branch, ProvisioningError> {
        let lookup = |source| ProvisioningError::BranchLookup { source };

        if !self
            .git
            .commit_exists(workspace, commit.as_str())
            .await
            .map_err(lookup)?
        {
            return Err(ProvisioningError::NoContainingBranch {
                commit: commit.to_string(),
            });
        }

        let candidates: Vec<Branch> = self
            .git
            .remote_branches_containing(workspace, &self.remote, commit.as_str())
            .await
            .map_err(lookup)?
            .into_iter()
            .map(Branch::new)
            .collect();

        let (branch, selector) = match candidates.as_slice() {
            [] => {
                return Err(ProvisioningError::NoContainingBranch {
                    commit: commit.to_string(),
                })
            }
            [only] => (only.clone(), "single"),
            _ => (
                self.selector.select(commit, &candidates).await?,
                self.selector.name(),
            ),
        };

        info!(
            branch = %branch,
            candidates = ?candidates.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            selector,
            "Branch resolved"
        );
        Ok(branch)
    }
}
