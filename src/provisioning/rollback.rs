use super::errors::ProvisioningError;
use super::types::TargetRepository;
use crate::github::HostingApi;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Deletes a freshly created remote repository after a failed session.
#[derive(Clone)]
pub struct RollbackController {
    api: Arc<dyn HostingApi>,
}

impl RollbackController {
    pub fn new(api: Arc<dyn HostingApi>) -> Self {
        Self { api }
    }

    /// Arm a guard for `target`; it must be disarmed or rolled back.
    pub fn arm(&self, target: TargetRepository) -> RollbackGuard {
        RollbackGuard {
            controller: self.clone(),
            target: Some(target),
        }
    }

    /// Delete a repository whose creation was never confirmed. A missing
    /// repository counts as success.
    pub async fn withdraw(&self, organization: &str, name: &str) -> Result<(), ProvisioningError> {
        let repository = format!("{organization}/{name}");
        warn!(repository = %repository, "Creation unconfirmed, deleting the repository if it exists");
        match self.api.delete_repository(organization, name).await {
            Ok(()) => {
                info!(repository = %repository, "Unconfirmed repository deleted");
                Ok(())
            }
            Err(source) if source.is_not_found() => {
                info!(repository = %repository, "Repository was never created");
                Ok(())
            }
            Err(source) => {
                error!(
                    repository = %repository,
                    error = %source,
                    "Could not remove unconfirmed repository; check for it manually"
                );
                Err(ProvisioningError::Rollback {
                    organization: organization.to_string(),
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    pub async fn rollback(&self, target: &TargetRepository) -> Result<(), ProvisioningError> {
        warn!(repository = %target.full_name(), "Rolling back, deleting remote repository");
        match self
            .api
            .delete_repository(&target.organization, &target.name)
            .await
        {
            Ok(()) => {
                info!(repository = %target.full_name(), "Remote repository deleted");
                Ok(())
            }
            Err(source) => {
                error!(
                    repository = %target.full_name(),
                    error = %source,
                    "Rollback failed, repository must be deleted manually"
                );
                Err(ProvisioningError::Rollback {
                    organization: target.organization.clone(),
                    name: target.name.clone(),
                    source,
                })
            }
        }
    }
}

/// Tracks a created remote repository until the session settles its fate.
pub struct RollbackGuard {
    controller: RollbackController,
    target: Option<TargetRepository>,
}

impl RollbackGuard {
    pub fn target(&self) -> Option<&TargetRepository> {
        self.target.as_ref()
    }

    /// Keep the repository.
    pub fn disarm(mut self) -> Option<TargetRepository> {
        self.target.take()
    }

    /// Delete the repository. Never retried.
    pub async fn rollback(mut self) -> Result<(), ProvisioningError> {
        match self.target.take() {
            Some(target) => self.controller.rollback(&target).await,
            None => Ok(()),
        }
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if let Some(target) = &self.target {
            error!(
                repository = %target.full_name(),
                "Session ended without settling the created repository; delete it manually"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioning::testing::FakeHostingApi;

    fn target() -> TargetRepository {
        TargetRepository {
            organization: "bar".to_string(),
            name: "audit-foo".to_string(),
            html_url: None,
        }
    }

    #[tokio::test]
    async fn test_disarm_keeps_repository() {
        let api = Arc::new(FakeHostingApi::new());
        let guard = RollbackController::new(api.clone()).arm(target());

        assert_eq!(guard.disarm(), Some(target()));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_deletes_once() {
        let api = Arc::new(FakeHostingApi::new());
        let guard = RollbackController::new(api.clone()).arm(target());

        guard.rollback().await.unwrap();
        assert_eq!(api.count("delete_repository"), 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_is_reported_not_retried() {
        let api = Arc::new(FakeHostingApi::new());
        api.fail("delete_repository");

        let err = RollbackController::new(api.clone())
            .arm(target())
            .rollback()
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisioningError::Rollback { ref name, .. } if name == "audit-foo"));
        assert_eq!(api.count("delete_repository"), 1);
    }

    #[tokio::test]
    async fn test_withdraw_deletes_unconfirmed_repository() {
        let api = Arc::new(FakeHostingApi::new());

        RollbackController::new(api.clone())
            .withdraw("bar", "audit-foo")
            .await
            .unwrap();
        assert_eq!(api.count("delete_repository"), 1);
    }

    #[tokio::test]
    async fn test_withdraw_failure_is_a_rollback_error() {
        let api = Arc::new(FakeHostingApi::new());
        api.fail("delete_repository");

        let err = RollbackController::new(api.clone())
            .withdraw("bar", "audit-foo")
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::Rollback { .. }));
    }
}
