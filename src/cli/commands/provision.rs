use crate::cli::Cli;
use crate::config::{AuditConfig, BranchSelection};
use crate::external::{GitClient, ProcessCommandExecutor};
use crate::github::{GitHubClient, ProjectBoardRequest};
use crate::provisioning::{
    BranchSelector, CommitReference, FirstBranchSelector, GitCredentials, InputError,
    InteractiveBranchSelector, ProvisioningRequest, ProvisioningSession, SessionOutcome,
    SourceRepository,
};
use crate::shutdown::ShutdownSignal;
use anyhow::Result;
use chrono::NaiveDate;
use std::io::{BufRead, Write};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Problems with the operator's parameters; reported as usage errors.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),
    #[error(transparent)]
    Invalid(#[from] InputError),
}

/// Raw parameters as given on the command line, the environment or a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningInputs {
    pub source_url: Option<String>,
    pub target_name: Option<String>,
    pub commit_hash: Option<String>,
    pub organization: Option<String>,
    pub github_token: Option<String>,
    pub project_template_id: Option<u64>,
    pub project_title: Option<String>,
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<&Cli> for ProvisioningInputs {
    fn from(cli: &Cli) -> Self {
        Self {
            source_url: cli.source_url.clone(),
            target_name: cli.target_name.clone(),
            commit_hash: cli.commit_hash.clone(),
            organization: cli.organization.clone(),
            github_token: cli.github_token.clone(),
            project_template_id: cli.project_template_id,
            project_title: cli.project_title.clone(),
        }
    }
}

impl ProvisioningInputs {
    fn is_complete(&self) -> bool {
        filled(&self.source_url) && filled(&self.commit_hash) && filled(&self.organization)
    }

    /// Ask for whatever is missing until source URL, commit hash and
    /// organization are all set. Stops quietly at end of input.
    pub fn prompt_for_missing<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> std::io::Result<()> {
        let mut target_asked = false;
        while !self.is_complete() {
            let fields: [(&str, &mut Option<String>, bool); 4] = [
                ("Source repository URL", &mut self.source_url, true),
                ("Target repository name (blank for default)", &mut self.target_name, false),
                ("Commit hash", &mut self.commit_hash, true),
                ("Organization", &mut self.organization, true),
            ];
            for (label, slot, mandatory) in fields {
                if filled(slot) || (!mandatory && target_asked) {
                    continue;
                }
                if !mandatory {
                    target_asked = true;
                }
                write!(output, "{label}: ")?;
                output.flush()?;

                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    writeln!(output)?;
                    return Ok(());
                }
                if let Some(value) = non_blank(Some(line)) {
                    *slot = Some(value);
                }
            }
        }
        Ok(())
    }

    /// Validate the inputs and build the session request.
    pub fn into_request(
        self,
        config: &AuditConfig,
        today: NaiveDate,
    ) -> Result<(ProvisioningRequest, GitCredentials), UsageError> {
        let source_url = non_blank(self.source_url).ok_or(UsageError::Missing("source URL"))?;
        let commit = non_blank(self.commit_hash).ok_or(UsageError::Missing("commit hash"))?;
        let organization = non_blank(self.organization).ok_or(UsageError::Missing("organization"))?;
        let token = non_blank(self.github_token).ok_or(UsageError::Missing("GitHub token"))?;

        let source = SourceRepository::parse(&source_url)?;
        let commit = CommitReference::parse(&commit)?;
        let target_name = non_blank(self.target_name)
            .unwrap_or_else(|| format!("{}{}", config.provisioning.target_prefix, source.name));

        let project_title = non_blank(self.project_title);
        let mut request = ProvisioningRequest::new(source, organization, target_name, commit)?;
        match (self.project_template_id, project_title) {
            (Some(template_number), title) => {
                let title =
                    title.unwrap_or_else(|| default_project_title(&request.target_name, today));
                request = request.with_project_board(ProjectBoardRequest {
                    template_number,
                    title,
                });
            }
            (None, Some(title)) => {
                warn!(title = %title, "Project title given without a template id, no board will be created");
            }
            (None, None) => {}
        }

        Ok((request, GitCredentials::new(token)))
    }
}

pub fn default_project_title(target_name: &str, today: NaiveDate) -> String {
    format!("{target_name} audit {}", today.format("%Y-%m-%d"))
}

pub struct ProvisionCommand {
    request: ProvisioningRequest,
    credentials: GitCredentials,
    config: AuditConfig,
}

impl ProvisionCommand {
    pub fn new(request: ProvisioningRequest, credentials: GitCredentials, config: AuditConfig) -> Self {
        Self {
            request,
            credentials,
            config,
        }
    }

    pub async fn execute(&self, shutdown: ShutdownSignal) -> Result<SessionOutcome> {
        let settings = &self.config.provisioning;
        let api = GitHubClient::new(
            self.credentials.token(),
            self.config.github.api_base_url.as_deref(),
            settings.api_timeout(),
        )?;
        let executor = ProcessCommandExecutor::new()
            .with_timeout(settings.git_timeout())
            .with_env("GIT_TERMINAL_PROMPT", "0");
        let selector: Arc<dyn BranchSelector> = match settings.branch_selection {
            BranchSelection::First => Arc::new(FirstBranchSelector),
            BranchSelection::Interactive => Arc::new(InteractiveBranchSelector),
        };

        let session = ProvisioningSession::new(
            self.request.clone(),
            &self.config,
            self.credentials.clone(),
            Arc::new(api),
            GitClient::new(Arc::new(executor)),
            selector,
        )
        .with_shutdown(shutdown);

        Ok(session.run().await)
    }
}

pub fn print_summary(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Succeeded(report) => {
            println!("✅ Audit repository ready: {}", report.target.full_name());
            if let Some(url) = &report.target.html_url {
                println!("   🔗 {url}");
            }
            println!("   🌿 Published branch: {}", report.branch);
            println!(
                "   🏷️  Tag {} at {} (via {})",
                report.tag.name,
                report.tag.commit,
                report.tag.created_via.as_str()
            );
            if let Some(board) = &report.project_board {
                println!("   📋 Project board: {}", board.url.as_deref().unwrap_or(&board.id));
            }
            if report.interrupted {
                println!("   ⏹️  Interrupted after tagging, finish the repository setup by hand");
            }
            for warning in &report.warnings {
                println!("   ⚠️  {warning}");
            }
        }
        SessionOutcome::Aborted(e) => {
            eprintln!("❌ Provisioning aborted: {e}");
        }
        SessionOutcome::RolledBack { cause } => {
            eprintln!("❌ Provisioning failed: {cause}");
            eprintln!("   ↩️  The created repository was deleted");
        }
        SessionOutcome::RollbackFailed {
            cause,
            rollback_error,
        } => {
            eprintln!("❌ Provisioning failed: {cause}");
            eprintln!("   🚨 {rollback_error}");
        }
    }
}
