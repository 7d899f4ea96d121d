//! Audit repository provisioning pipeline
//!
//! A [`ProvisioningSession`] checks that the target name is free, creates the
//! remote repository, clones the source, picks the branch containing the
//! audited commit, publishes it as the target's main branch and stamps the
//! audit tag. Failures after the remote exists are rolled back.

pub mod branch;
pub mod errors;
pub mod existence;
pub mod lifecycle;
pub mod provisioner;
pub mod rollback;
pub mod session;
pub mod tagging;
pub mod types;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use branch::{
    prompt_for_branch, BranchResolver, BranchSelector, FirstBranchSelector,
    InteractiveBranchSelector,
};
pub use errors::{InputError, ProvisioningError};
pub use existence::{ExistenceStatus, RemoteExistenceChecker};
pub use lifecycle::{ProvisioningPhase, SessionEvent, SessionLifecycle};
pub use provisioner::RepoProvisioner;
pub use rollback::{RollbackController, RollbackGuard};
pub use session::{ProvisioningSession, SessionOutcome, SessionReport};
pub use tagging::{ApiTagStrategy, CliTagStrategy, TagEstablisher, TagStrategy};
pub use types::{
    AuditTag, Branch, CommitReference, GitCredentials, ProvisioningRequest, SourceRepository,
    TagPath, TargetRepository,
};
pub use workspace::ProvisioningWorkspace;
