//! Audit label management
//!
//! Replaces GitHub's default issue labels with the severity labels used to
//! triage audit findings. Every step is best-effort: a label that cannot be
//! deleted or created is recorded and skipped.

use super::client::HostingApi;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSpec {
    pub name: String,
    pub color: String,
    pub description: String,
}

impl LabelSpec {
    fn new(name: &str, color: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            description: description.to_string(),
        }
    }
}

/// Labels GitHub creates in every new repository.
pub const DEFAULT_LABELS: &[&str] = &[
    "bug",
    "documentation",
    "duplicate",
    "enhancement",
    "good first issue",
    "help wanted",
    "invalid",
    "question",
    "wontfix",
];

pub fn severity_labels() -> Vec<LabelSpec> {
    vec![
        LabelSpec::new("severity: critical", "b60205", "Direct loss of funds or full compromise"),
        LabelSpec::new("severity: high", "d93f0b", "Significant impact, exploitable under realistic conditions"),
        LabelSpec::new("severity: medium", "fbca04", "Limited impact or requires unlikely preconditions"),
        LabelSpec::new("severity: low", "0e8a16", "Minor impact, defense in depth"),
        LabelSpec::new("severity: informational", "1d76db", "Code quality and best-practice notes"),
    ]
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabelReport {
    pub deleted: Vec<String>,
    pub missing: Vec<String>,
    pub created: Vec<String>,
    /// Label name and the reason it could not be deleted or created.
    pub failed: Vec<(String, String)>,
}

impl LabelReport {
    pub fn warnings(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|(label, reason)| format!("label '{label}': {reason}"))
            .collect()
    }
}

pub async fn replace_labels(api: &dyn HostingApi, owner: &str, repo: &str) -> LabelReport {
    let mut report = LabelReport::default();

    info!(repo = %format!("{owner}/{repo}"), "Deleting default labels");
    for name in DEFAULT_LABELS {
        match api.delete_label(owner, repo, name).await {
            Ok(true) => report.deleted.push(name.to_string()),
            Ok(false) => {
                warn!(label = %name, "Label does not exist, skipping");
                report.missing.push(name.to_string());
            }
            Err(e) => {
                warn!(label = %name, error = %e, "Failed to delete label, skipping");
                report.failed.push((name.to_string(), e.to_string()));
            }
        }
    }

    info!(repo = %format!("{owner}/{repo}"), "Creating severity labels");
    for label in severity_labels() {
        match api.create_label(owner, repo, &label).await {
            Ok(()) => report.created.push(label.name),
            Err(e) => {
                warn!(label = %label.name, error = %e, "Failed to create label, skipping");
                report.failed.push((label.name, e.to_string()));
            }
        }
    }

    report
}
