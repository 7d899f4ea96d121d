use super::branch::{BranchResolver, BranchSelector};
use super::errors::ProvisioningError;
use super::existence::{ExistenceStatus, RemoteExistenceChecker};
use super::lifecycle::{ProvisioningPhase, SessionEvent, SessionLifecycle};
use super::provisioner::RepoProvisioner;
use super::rollback::RollbackController;
use super::tagging::{ApiTagStrategy, CliTagStrategy, TagEstablisher};
use super::types::{AuditTag, Branch, GitCredentials, ProvisioningRequest, TargetRepository};
use super::workspace::ProvisioningWorkspace;
use crate::config::{AuditConfig, ProvisioningSettings};
use crate::external::GitClient;
use crate::github::{issue_template, labels, projects, HostingApi, ProjectBoard};
use crate::shutdown::ShutdownSignal;
use crate::telemetry::{create_session_span, generate_correlation_id};
use statig::prelude::*;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

/// What a successful session produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub correlation_id: String,
    pub target: TargetRepository,
    pub branch: Branch,
    pub tag: AuditTag,
    pub project_board: Option<ProjectBoard>,
    /// Post-tag steps that did not complete.
    pub warnings: Vec<String>,
    /// An interrupt arrived after tagging and the remaining setup was skipped.
    pub interrupted: bool,
}

/// Result of the post-tag steps.
#[derive(Debug, Default)]
struct Dressing {
    project_board: Option<ProjectBoard>,
    warnings: Vec<String>,
    interrupted: bool,
}

impl Dressing {
    fn stopped(mut self, error: ProvisioningError) -> Self {
        match error {
            ProvisioningError::Interrupted => {
                warn!("Interrupted after tagging, remaining repository setup skipped");
                self.interrupted = true;
                self.warnings.push(
                    "interrupted after tagging: issue template, labels or project board may be missing"
                        .to_string(),
                );
            }
            other => self.warnings.push(other.to_string()),
        }
        self
    }
}

#[derive(Debug)]
pub enum SessionOutcome {
    Succeeded(SessionReport),
    /// Failed before anything was created remotely.
    Aborted(ProvisioningError),
    RolledBack { cause: ProvisioningError },
    /// The created repository is still there and needs manual cleanup.
    RollbackFailed {
        cause: ProvisioningError,
        rollback_error: ProvisioningError,
    },
}

impl SessionOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionOutcome::Succeeded(_) => 0,
            SessionOutcome::Aborted(_) => 1,
            SessionOutcome::RolledBack { .. } => 3,
            SessionOutcome::RollbackFailed { .. } => 4,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Succeeded(_))
    }
}

fn failure(error: &ProvisioningError) -> SessionEvent {
    SessionEvent::Fail {
        kind: error.kind(),
        message: error.to_string(),
    }
}

/// One end-to-end provisioning run
///
/// Sequences existence check, remote creation, clone, branch resolution,
/// publishing and tagging. Any failure after the remote repository exists is
/// turned into exactly one rollback attempt. Every step except remote
/// creation is raced against the shutdown signal.
pub struct ProvisioningSession {
    request: ProvisioningRequest,
    settings: ProvisioningSettings,
    credentials: GitCredentials,
    git_host: String,
    api: Arc<dyn HostingApi>,
    git: GitClient,
    checker: RemoteExistenceChecker,
    provisioner: RepoProvisioner,
    rollback: RollbackController,
    shutdown: ShutdownSignal,
    workspace_parent: Option<PathBuf>,
    lifecycle: StateMachine<SessionLifecycle>,
}

impl ProvisioningSession {
    pub fn new(
        request: ProvisioningRequest,
        config: &AuditConfig,
        credentials: GitCredentials,
        api: Arc<dyn HostingApi>,
        git: GitClient,
        selector: Arc<dyn BranchSelector>,
    ) -> Self {
        let settings = config.provisioning.clone();
        let git_host = config.github.git_host.clone();
        let resolver = BranchResolver::new(git.clone(), settings.remote_name.clone(), selector);
        let provisioner = RepoProvisioner::new(
            api.clone(),
            git.clone(),
            resolver,
            credentials.clone(),
            git_host.clone(),
            settings.clone(),
        );

        Self {
            request,
            checker: RemoteExistenceChecker::new(git.clone()),
            rollback: RollbackController::new(api.clone()),
            settings,
            credentials,
            git_host,
            api,
            git,
            provisioner,
            shutdown: ShutdownSignal::never(),
            workspace_parent: None,
            lifecycle: SessionLifecycle::new(generate_correlation_id()).state_machine(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Create the workspace under `parent` rather than the system temp dir.
    pub fn with_workspace_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.workspace_parent = Some(parent.into());
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.lifecycle.inner().correlation_id
    }

    pub fn phase(&self) -> ProvisioningPhase {
        self.lifecycle.inner().phase()
    }

    pub async fn run(mut self) -> SessionOutcome {
        let span = create_session_span(
            self.correlation_id(),
            &self.request.organization,
            &self.request.target_name,
            self.request.commit.as_str(),
        );
        async move { self.execute().await }.instrument(span).await
    }

    async fn execute(&mut self) -> SessionOutcome {
        info!(source = %self.request.source, "Starting provisioning session");

        let workspace = match &self.workspace_parent {
            Some(parent) => ProvisioningWorkspace::acquire_in(parent),
            None => ProvisioningWorkspace::acquire(),
        };
        let outcome = match workspace {
            Ok(workspace) => {
                let outcome = self.drive(&workspace).await;
                workspace.release();
                outcome
            }
            Err(e) => self.abort(e),
        };

        self.report(&outcome);
        outcome
    }

    async fn drive(&mut self, workspace: &ProvisioningWorkspace) -> SessionOutcome {
        if let Err(e) = self.preflight().await {
            return self.abort(e);
        }
        self.lifecycle.handle(&SessionEvent::ExistenceChecked);

        // not raced against shutdown; the next step observes an interrupt
        // with the guard armed
        let created = self
            .provisioner
            .create_remote(&self.request.organization, &self.request.target_name)
            .await;
        let target = match created {
            Ok(target) => target,
            Err(cause @ ProvisioningError::RemoteCreationUnconfirmed { .. }) => {
                return self.withdraw(cause).await;
            }
            Err(e) => return self.abort(e),
        };
        self.lifecycle.handle(&SessionEvent::RemoteCreated);
        let guard = self.rollback.arm(target.clone());

        match self.provision(workspace, &target).await {
            Ok((branch, tag)) => {
                let dressing = self.finish(&target).await;
                guard.disarm();
                self.lifecycle.handle(&SessionEvent::Complete);
                SessionOutcome::Succeeded(SessionReport {
                    correlation_id: self.correlation_id().to_string(),
                    target,
                    branch,
                    tag,
                    project_board: dressing.project_board,
                    warnings: dressing.warnings,
                    interrupted: dressing.interrupted,
                })
            }
            Err(cause) => {
                error!(error.kind = cause.kind(), error = %cause, "Provisioning failed after remote creation");
                self.lifecycle.handle(&failure(&cause));

                // rollback runs even after an interrupt
                let result = guard.rollback().await;
                self.lifecycle.handle(&SessionEvent::RollbackFinished {
                    succeeded: result.is_ok(),
                });
                match result {
                    Ok(()) => SessionOutcome::RolledBack { cause },
                    Err(rollback_error) => SessionOutcome::RollbackFailed {
                        cause,
                        rollback_error,
                    },
                }
            }
        }
    }

    /// Creation timed out, so the repository may exist; delete it if it does.
    async fn withdraw(&mut self, cause: ProvisioningError) -> SessionOutcome {
        error!(error.kind = cause.kind(), error = %cause, "Remote creation was not confirmed");
        self.lifecycle.handle(&SessionEvent::CreationUnconfirmed {
            kind: cause.kind(),
            message: cause.to_string(),
        });

        let result = match &cause {
            ProvisioningError::RemoteCreationUnconfirmed {
                organization, name, ..
            } => self.rollback.withdraw(organization, name).await,
            _ => Ok(()),
        };
        self.lifecycle.handle(&SessionEvent::RollbackFinished {
            succeeded: result.is_ok(),
        });
        match result {
            Ok(()) => SessionOutcome::RolledBack { cause },
            Err(rollback_error) => SessionOutcome::RollbackFailed {
                cause,
                rollback_error,
            },
        }
    }

    async fn preflight(&self) -> Result<(), ProvisioningError> {
        let organization = &self.request.organization;
        let name = &self.request.target_name;
        let url = self.credentials.authenticated_url(&self.git_host, organization, name);

        let status = self
            .guarded(async { Ok(self.checker.check(&url).await) })
            .await?;
        match status {
            ExistenceStatus::Available => {
                info!(repository = %format!("{organization}/{name}"), "Target name is available");
                Ok(())
            }
            ExistenceStatus::AlreadyExists => Err(ProvisioningError::RemoteExists {
                organization: organization.clone(),
                name: name.clone(),
            }),
            ExistenceStatus::CheckFailed(reason) => Err(ProvisioningError::ExistenceCheckFailed {
                organization: organization.clone(),
                name: name.clone(),
                reason,
            }),
        }
    }

    async fn provision(
        &mut self,
        workspace: &ProvisioningWorkspace,
        target: &TargetRepository,
    ) -> Result<(Branch, AuditTag), ProvisioningError> {
        let checkout = self
            .guarded(self.provisioner.clone_source(&self.request.source, workspace))
            .await?;
        self.lifecycle.handle(&SessionEvent::Cloned);

        let branch = self
            .guarded(self.provisioner.resolve_branch(&checkout, &self.request.commit))
            .await?;
        self.lifecycle.handle(&SessionEvent::BranchResolved {
            branch: branch.name.clone(),
        });

        self.guarded(self.provisioner.repoint_remote(&checkout, target))
            .await?;
        self.guarded(
            self.provisioner
                .publish_as_main(&checkout, &self.request.source, &branch),
        )
        .await?;
        self.lifecycle.handle(&SessionEvent::Published);

        let establisher = self.tag_establisher(&checkout);
        let tag = self
            .guarded(establisher.establish(target, &self.request.commit))
            .await?;
        self.lifecycle.handle(&SessionEvent::Tagged);

        Ok((branch, tag))
    }

    fn tag_establisher(&self, checkout: &Path) -> TagEstablisher {
        TagEstablisher::new(
            self.settings.audit_tag_name.clone(),
            Box::new(ApiTagStrategy::new(
                self.api.clone(),
                self.settings.audit_tag_message.clone(),
            )),
            Box::new(CliTagStrategy::new(
                self.git.clone(),
                checkout,
                self.settings.remote_name.clone(),
            )),
        )
    }

    /// Best-effort repository dressing once the audit tag exists.
    async fn finish(&self, target: &TargetRepository) -> Dressing {
        let api = self.api.as_ref();
        let (owner, repo) = (target.organization.as_str(), target.name.as_str());
        let mut dressing = Dressing::default();

        match self
            .guarded(async { Ok(issue_template::seed_issue_template(api, owner, repo).await) })
            .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Could not seed the issue template");
                dressing.warnings.push(format!("issue template: {e}"));
            }
            Err(e) => return dressing.stopped(e),
        }

        match self
            .guarded(async { Ok(labels::replace_labels(api, owner, repo).await) })
            .await
        {
            Ok(report) => dressing.warnings.extend(report.warnings()),
            Err(e) => return dressing.stopped(e),
        }

        let Some(board) = &self.request.project_board else {
            return dressing;
        };
        let cloned = self
            .guarded(async {
                Ok(projects::clone_project_board(api, owner, board).await)
            })
            .await;
        match cloned {
            Ok(Ok(project)) => dressing.project_board = Some(project),
            Ok(Err(e)) => {
                warn!(error = %e, template = board.template_number, "Could not clone the project board");
                dressing.warnings.push(format!("project board: {e}"));
            }
            Err(e) => return dressing.stopped(e),
        }
        dressing
    }

    /// Run `step` unless shutdown is requested first.
    async fn guarded<T, F>(&self, step: F) -> Result<T, ProvisioningError>
    where
        F: Future<Output = Result<T, ProvisioningError>>,
    {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(ProvisioningError::Interrupted),
            result = step => result,
        }
    }

    fn abort(&mut self, error: ProvisioningError) -> SessionOutcome {
        self.lifecycle.handle(&failure(&error));
        SessionOutcome::Aborted(error)
    }

    fn report(&self, outcome: &SessionOutcome) {
        let context = self.lifecycle.inner();
        match outcome {
            SessionOutcome::Succeeded(report) => info!(
                phase = ?context.phase(),
                repository = %report.target.full_name(),
                branch = %report.branch,
                tag.path = report.tag.created_via.as_str(),
                warnings = report.warnings.len(),
                interrupted = report.interrupted,
                "Audit repository provisioned"
            ),
            SessionOutcome::Aborted(e) => error!(
                phase = ?context.phase(),
                error.kind = e.kind(),
                error = %e,
                "Provisioning aborted, nothing was created"
            ),
            SessionOutcome::RolledBack { cause } => error!(
                phase = ?context.phase(),
                error.kind = cause.kind(),
                error = %cause,
                "Provisioning failed, created repository was deleted"
            ),
            SessionOutcome::RollbackFailed {
                cause,
                rollback_error,
            } => error!(
                phase = ?context.phase(),
                error.kind = cause.kind(),
                error = %cause,
                rollback_error = %rollback_error,
                errors = ?context.errors(),
                "Provisioning failed and rollback failed"
            ),
        }
    }
}
