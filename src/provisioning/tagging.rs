use super::errors::ProvisioningError;
use super::types::{AuditTag, CommitReference, TagPath, TargetRepository};
use crate::external::GitClient;
use crate::github::{GitHubError, HostingApi, TagObjectRequest};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// One way of creating the audit tag.
#[async_trait]
pub trait TagStrategy: Send + Sync {
    fn path(&self) -> TagPath;

    /// Create tag `name` at `commit`; the error is a printable cause.
    async fn create(
        &self,
        target: &TargetRepository,
        name: &str,
        commit: &CommitReference,
    ) -> Result<(), String>;
}

/// Annotated tag object plus `refs/tags/<name>`, through the API.
pub struct ApiTagStrategy {
    api: Arc<dyn HostingApi>,
    message: String,
}

impl ApiTagStrategy {
    pub fn new(api: Arc<dyn HostingApi>, message: impl Into<String>) -> Self {
        Self {
            api,
            message: message.into(),
        }
    }
}

#[async_trait]
impl TagStrategy for ApiTagStrategy {
    fn path(&self) -> TagPath {
        TagPath::Api
    }

    async fn create(
        &self,
        target: &TargetRepository,
        name: &str,
        commit: &CommitReference,
    ) -> Result<(), String> {
        let request = TagObjectRequest::for_commit(name, &self.message, commit.as_str());
        let tag = self
            .api
            .create_tag_object(&target.organization, &target.name, &request)
            .await
            .map_err(describe)?;
        self.api
            .create_tag_ref(&target.organization, &target.name, name, &tag.sha)
            .await
            .map_err(describe)
    }
}

fn describe(source: GitHubError) -> String {
    ProvisioningError::TagCreation { source }.to_string()
}

/// `git tag` in the workspace followed by a push of that single ref.
pub struct CliTagStrategy {
    git: GitClient,
    checkout: PathBuf,
    remote: String,
}

impl CliTagStrategy {
    pub fn new(git: GitClient, checkout: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            git,
            checkout: checkout.into(),
            remote: remote.into(),
        }
    }
}

#[async_trait]
impl TagStrategy for CliTagStrategy {
    fn path(&self) -> TagPath {
        TagPath::Cli
    }

    async fn create(
        &self,
        _target: &TargetRepository,
        name: &str,
        commit: &CommitReference,
    ) -> Result<(), String> {
        self.git
            .create_tag(&self.checkout, name, commit.as_str())
            .await
            .map_err(|e| e.to_string())?;
        self.git
            .push(&self.checkout, &self.remote, &format!("refs/tags/{name}"), false)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Creates the audit tag with the primary strategy, falling back once.
pub struct TagEstablisher {
    name: String,
    primary: Box<dyn TagStrategy>,
    fallback: Box<dyn TagStrategy>,
}

impl TagEstablisher {
    pub fn new(
        name: impl Into<String>,
        primary: Box<dyn TagStrategy>,
        fallback: Box<dyn TagStrategy>,
    ) -> Self {
        Self {
            name: name.into(),
            primary,
            fallback,
        }
    }

    pub async fn establish(
        &self,
        target: &TargetRepository,
        commit: &CommitReference,
    ) -> Result<AuditTag, ProvisioningError> {
        let primary_cause = match self.primary.create(target, &self.name, commit).await {
            Ok(()) => return Ok(self.created(commit, self.primary.path())),
            Err(cause) => cause,
        };
        warn!(
            tag.path = self.primary.path().as_str(),
            tag.name = %self.name,
            error = %primary_cause,
            "Tag creation failed, trying fallback"
        );

        match self.fallback.create(target, &self.name, commit).await {
            Ok(()) => Ok(self.created(commit, self.fallback.path())),
            Err(reason) => {
                warn!(
                    tag.path = self.fallback.path().as_str(),
                    tag.name = %self.name,
                    error = %reason,
                    "Fallback tag creation failed"
                );
                Err(ProvisioningError::TagCreationFallback {
                    primary: primary_cause,
                    reason,
                })
            }
        }
    }

    fn created(&self, commit: &CommitReference, path: TagPath) -> AuditTag {
        info!(tag.path = path.as_str(), tag.name = %self.name, commit = %commit, "Audit tag created");
        AuditTag {
            name: self.name.clone(),
            commit: commit.clone(),
            created_via: path,
        }
    }
}
