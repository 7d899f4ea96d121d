use crate::external::GitError;
use crate::github::GitHubError;
use thiserror::Error;

/// Malformed operator input, rejected before any session starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Source URL '{0}' is not a recognised repository URL (expected https://host/owner/repo or git@host:owner/repo)")]
    InvalidSourceUrl(String),
    #[error("Commit hash '{0}' must be a full 40-character (or 64-character) hexadecimal SHA")]
    InvalidCommitHash(String),
    #[error("'{0}' is not a valid repository or organization name")]
    InvalidName(String),
}

/// Failure kinds of a provisioning session.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("{organization}/{name} already exists")]
    RemoteExists { organization: String, name: String },

    #[error("Could not check whether {organization}/{name} exists: {reason}")]
    ExistenceCheckFailed {
        organization: String,
        name: String,
        reason: String,
    },

    #[error("Error creating remote repository: {source}")]
    RemoteCreation {
        #[source]
        source: GitHubError,
    },

    #[error("Creation of {organization}/{name} was not confirmed: {source}")]
    RemoteCreationUnconfirmed {
        organization: String,
        name: String,
        #[source]
        source: GitHubError,
    },

    #[error("Error cloning source repository: {source}")]
    Clone {
        #[source]
        source: GitError,
    },

    #[error("Commit {commit} is not contained in any branch of the source repository")]
    NoContainingBranch { commit: String },

    #[error("Invalid branch index '{input}', expected a number between 1 and {max}")]
    AmbiguousSelectionInvalid { input: String, max: usize },

    #[error("Commit is contained in {} branches ({}) and no branch was selected: {reason}", .candidates.len(), .candidates.join(", "))]
    AmbiguousBranchUnresolved {
        candidates: Vec<String>,
        reason: String,
    },

    #[error("Could not inspect branches of the source repository: {source}")]
    BranchLookup {
        #[source]
        source: GitError,
    },

    #[error("Could not point the workspace at the target repository: {reason}")]
    RepointRemote { reason: String },

    #[error("Error publishing branch '{branch}' as '{target_branch}': {source}")]
    Push {
        branch: String,
        target_branch: String,
        #[source]
        source: GitError,
    },

    #[error("Error creating audit tag through the API: {source}")]
    TagCreation {
        #[source]
        source: GitHubError,
    },

    #[error("Error creating audit tag manually: {reason} (API attempt failed first: {primary})")]
    TagCreationFallback { primary: String, reason: String },

    #[error("Rollback failed, {organization}/{name} must be deleted manually: {source}")]
    Rollback {
        organization: String,
        name: String,
        #[source]
        source: GitHubError,
    },

    #[error("Provisioning interrupted by operator")]
    Interrupted,

    #[error("Workspace error: {source}")]
    Workspace {
        #[source]
        source: std::io::Error,
    },
}

impl ProvisioningError {
    /// Short stable name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisioningError::RemoteExists { .. } => "remote_exists",
            ProvisioningError::ExistenceCheckFailed { .. } => "existence_check_failed",
            ProvisioningError::RemoteCreation { .. } => "remote_creation",
            ProvisioningError::RemoteCreationUnconfirmed { .. } => "remote_creation_unconfirmed",
            ProvisioningError::Clone { .. } => "clone",
            ProvisioningError::NoContainingBranch { .. } => "no_containing_branch",
            ProvisioningError::AmbiguousSelectionInvalid { .. } => "ambiguous_selection_invalid",
            ProvisioningError::AmbiguousBranchUnresolved { .. } => "ambiguous_branch_unresolved",
            ProvisioningError::BranchLookup { .. } => "branch_lookup",
            ProvisioningError::RepointRemote { .. } => "repoint_remote",
            ProvisioningError::Push { .. } => "push",
            ProvisioningError::TagCreation { .. } => "tag_creation",
            ProvisioningError::TagCreationFallback { .. } => "tag_creation_fallback",
            ProvisioningError::Rollback { .. } => "rollback",
            ProvisioningError::Interrupted => "interrupted",
            ProvisioningError::Workspace { .. } => "workspace",
        }
    }
}
