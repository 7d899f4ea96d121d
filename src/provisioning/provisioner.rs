use super::branch::BranchResolver;
use super::errors::ProvisioningError;
use super::types::{validate_name, Branch, CommitReference, GitCredentials, SourceRepository, TargetRepository};
use super::workspace::ProvisioningWorkspace;
use crate::config::ProvisioningSettings;
use crate::external::{redact_credentials, GitClient};
use crate::github::{GitHubError, HostingApi};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Creates the audit repository and fills it with the selected source branch.
pub struct RepoProvisioner {
    api: Arc<dyn HostingApi>,
    git: GitClient,
    resolver: BranchResolver,
    credentials: GitCredentials,
    git_host: String,
    settings: ProvisioningSettings,
}

impl RepoProvisioner {
    pub fn new(
        api: Arc<dyn HostingApi>,
        git: GitClient,
        resolver: BranchResolver,
        credentials: GitCredentials,
        git_host: impl Into<String>,
        settings: ProvisioningSettings,
    ) -> Self {
        Self {
            api,
            git,
            resolver,
            credentials,
            git_host: git_host.into(),
            settings,
        }
    }

    pub async fn create_remote(
        &self,
        organization: &str,
        name: &str,
    ) -> Result<TargetRepository, ProvisioningError> {
        let org = self
            .api
            .get_organization(organization)
            .await
            .map_err(|source| ProvisioningError::RemoteCreation { source })?;

        // a timed-out request may still have created the repository
        let created = self
            .api
            .create_repository(&org.login, name, self.settings.private)
            .await
            .map_err(|source| match source {
                GitHubError::Timeout { .. } => ProvisioningError::RemoteCreationUnconfirmed {
                    organization: org.login.clone(),
                    name: name.to_string(),
                    source,
                },
                source => ProvisioningError::RemoteCreation { source },
            })?;

        info!(
            repository = %created.full_name,
            private = created.private,
            "Remote repository created"
        );
        Ok(TargetRepository {
            organization: org.login,
            name: created.name,
            html_url: created.html_url,
        })
    }

    /// Clone the source into the workspace and return the checkout path.
    pub async fn clone_source(
        &self,
        source: &SourceRepository,
        workspace: &ProvisioningWorkspace,
    ) -> Result<PathBuf, ProvisioningError> {
        let checkout = workspace.checkout_dir();
        self.git
            .clone_repository(&source.clone_url(&self.credentials), &checkout)
            .await
            .map_err(|source| ProvisioningError::Clone { source })?;
        info!(source = %source, "Source repository cloned");
        Ok(checkout)
    }

    pub async fn resolve_branch(
        &self,
        checkout: &Path,
        commit: &CommitReference,
    ) -> Result<Branch, ProvisioningError> {
        self.resolver.resolve(checkout, commit).await
    }

    /// Point the workspace remote at the target repository.
    pub async fn repoint_remote(
        &self,
        checkout: &Path,
        target: &TargetRepository,
    ) -> Result<(), ProvisioningError> {
        for part in [&target.organization, &target.name] {
            validate_name(part).map_err(|e| ProvisioningError::RepointRemote {
                reason: e.to_string(),
            })?;
        }

        let url = target.remote_url(&self.git_host, &self.credentials);
        self.git
            .set_remote_url(checkout, &self.settings.remote_name, &url)
            .await
            .map_err(|e| ProvisioningError::RepointRemote {
                reason: e.to_string(),
            })?;
        info!(remote = %redact_credentials(&url), "Workspace remote repointed");
        Ok(())
    }

    /// Fetch `branch` fresh from the source, check it out and push it as the
    /// target's main branch.
    pub async fn publish_as_main(
        &self,
        checkout: &Path,
        source: &SourceRepository,
        branch: &Branch,
    ) -> Result<(), ProvisioningError> {
        let remote = &self.settings.remote_name;
        let main = &self.settings.main_branch_name;
        let push_error = |source| ProvisioningError::Push {
            branch: branch.name.clone(),
            target_branch: main.clone(),
            source,
        };

        self.git
            .fetch_branch(checkout, &source.clone_url(&self.credentials), remote, &branch.name)
            .await
            .map_err(push_error)?;
        self.git
            .checkout_tracking(checkout, remote, &branch.name)
            .await
            .map_err(push_error)?;

        let refspec = format!("refs/heads/{}:refs/heads/{main}", branch.name);
        self.git
            .push(checkout, remote, &refspec, true)
            .await
            .map_err(push_error)?;

        info!(branch = %branch, target_branch = %main, "Branch published");
        Ok(())
    }
}
