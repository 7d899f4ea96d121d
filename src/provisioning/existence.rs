use crate::external::{redact_credentials, GitClient};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistenceStatus {
    Available,
    AlreadyExists,
    CheckFailed(String),
}

/// Probes the destination organization for a taken repository name with
/// `git ls-remote`, without cloning or touching the API.
pub struct RemoteExistenceChecker {
    git: GitClient,
}

impl RemoteExistenceChecker {
    pub fn new(git: GitClient) -> Self {
        Self { git }
    }

    pub async fn check(&self, remote_url: &str) -> ExistenceStatus {
        let output = match self.git.ls_remote_heads(remote_url).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Existence probe could not run");
                return ExistenceStatus::CheckFailed(e.to_string());
            }
        };

        let status = classify_probe(output.status_code, &output.stderr);
        debug!(
            remote = %redact_credentials(remote_url),
            exit_code = output.status_code,
            status = ?status,
            "Existence probe finished"
        );
        status
    }
}

// -1 is how the executor reports a signal-terminated process
fn classify_probe(status_code: i32, stderr: &str) -> ExistenceStatus {
    match status_code {
        0 => ExistenceStatus::AlreadyExists,
        128 if is_auth_failure(stderr) => ExistenceStatus::CheckFailed(format!(
            "authentication failed: {}",
            redact_credentials(stderr.trim())
        )),
        128 => ExistenceStatus::Available,
        -1 => ExistenceStatus::CheckFailed("git ls-remote was terminated by a signal".to_string()),
        code => ExistenceStatus::CheckFailed(format!(
            "git ls-remote exited with {code}: {}",
            redact_credentials(stderr.trim())
        )),
    }
}

fn is_auth_failure(stderr: &str) -> bool {
    let lowered = stderr.to_ascii_lowercase();
    lowered.contains("authentication failed")
        || lowered.contains("could not read username")
        || lowered.contains("could not read password")
        || lowered.contains("permission denied")
        || lowered.contains("could not resolve host")
}
