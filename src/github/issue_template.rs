//! Seeds the audit finding issue template into a freshly provisioned repository.

use super::client::HostingApi;
use super::errors::GitHubError;

pub const FINDING_TEMPLATE_PATH: &str = ".github/ISSUE_TEMPLATE/finding.md";

pub const FINDING_TEMPLATE: &str = r#"---
name: Finding
about: Report an audit finding
title: ""
labels: ""
assignees: ""
---

## Summary

## Severity

<!-- critical / high / medium / low / informational -->

## Location

<!-- file paths and line ranges at the audited commit (tag `kupia-audit`) -->

## Description

## Impact

## Recommendation
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSeeding {
    Created,
    AlreadyPresent,
}

/// Create the finding template unless the repository already carries one.
pub async fn seed_issue_template(
    api: &dyn HostingApi,
    owner: &str,
    repo: &str,
) -> Result<TemplateSeeding, GitHubError> {
    if api.file_exists(owner, repo, FINDING_TEMPLATE_PATH).await? {
        tracing::info!(path = FINDING_TEMPLATE_PATH, "Issue template already present, leaving it");
        return Ok(TemplateSeeding::AlreadyPresent);
    }

    api.create_file(owner, repo, FINDING_TEMPLATE_PATH, "finding.md", FINDING_TEMPLATE)
        .await?;
    tracing::info!(path = FINDING_TEMPLATE_PATH, "Issue template created");
    Ok(TemplateSeeding::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::MockHostingApi;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_existing_template_is_left_alone() {
        let mut api = MockHostingApi::new();
        api.expect_file_exists()
            .with(eq("acme"), eq("audit-widget"), eq(FINDING_TEMPLATE_PATH))
            .returning(|_, _, _| Ok(true));
        api.expect_create_file().never();

        let outcome = seed_issue_template(&api, "acme", "audit-widget").await.unwrap();
        assert_eq!(outcome, TemplateSeeding::AlreadyPresent);
    }

    #[tokio::test]
    async fn test_missing_template_is_created() {
        let mut api = MockHostingApi::new();
        api.expect_file_exists().returning(|_, _, _| Ok(false));
        api.expect_create_file()
            .withf(|_, _, path, message, content| {
                path == FINDING_TEMPLATE_PATH && message == "finding.md" && content.contains("## Severity")
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));

        let outcome = seed_issue_template(&api, "acme", "audit-widget").await.unwrap();
        assert_eq!(outcome, TemplateSeeding::Created);
    }
}
