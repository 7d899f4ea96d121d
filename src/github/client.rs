use super::errors::GitHubError;
use super::labels::LabelSpec;
use async_trait::async_trait;
use octocrab::params::repos::Reference;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::time::Duration;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationInfo {
    pub login: String,
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRepository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Body of `POST /repos/{owner}/{repo}/git/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagObjectRequest {
    pub tag: String,
    pub message: String,
    pub object: String,
    #[serde(rename = "type")]
    pub object_type: String,
}

impl TagObjectRequest {
    pub fn for_commit(tag: &str, message: &str, sha: &str) -> Self {
        Self {
            tag: tag.to_string(),
            message: message.to_string(),
            object: sha.to_string(),
            object_type: "commit".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitTagObject {
    pub sha: String,
    pub tag: String,
}

/// Hosting API operations consumed by the provisioning pipeline
///
/// Implemented by [`GitHubClient`] against the REST/GraphQL API and mocked in
/// tests.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn get_organization(&self, org: &str) -> Result<OrganizationInfo, GitHubError>;
    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<CreatedRepository, GitHubError>;
    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), GitHubError>;
    async fn create_tag_object(&self, owner: &str, repo: &str, request: &TagObjectRequest) -> Result<GitTagObject, GitHubError>;
    async fn create_tag_ref(&self, owner: &str, repo: &str, tag: &str, sha: &str) -> Result<(), GitHubError>;
    async fn file_exists(&self, owner: &str, repo: &str, path: &str) -> Result<bool, GitHubError>;
    async fn create_file(&self, owner: &str, repo: &str, path: &str, message: &str, content: &str) -> Result<(), GitHubError>;
    /// Delete a label; `Ok(false)` when the label does not exist.
    async fn delete_label(&self, owner: &str, repo: &str, name: &str) -> Result<bool, GitHubError>;
    async fn create_label(&self, owner: &str, repo: &str, label: &LabelSpec) -> Result<(), GitHubError>;
    async fn graphql(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value, GitHubError>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    timeout: Duration,
}

impl GitHubClient {
    pub fn new(token: &str, api_base_url: Option<&str>, timeout: Duration) -> Result<Self, GitHubError> {
        if token.trim().is_empty() {
            return Err(GitHubError::TokenNotFound(
                "GitHub token is empty".to_string(),
            ));
        }

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(base) = api_base_url {
            builder = builder.base_uri(base)?;
        }

        Ok(GitHubClient {
            octocrab: builder.build()?,
            timeout,
        })
    }

    pub fn octocrab(&self) -> &Octocrab {
        &self.octocrab
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, GitHubError>
    where
        F: Future<Output = Result<T, octocrab::Error>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(GitHubError::from),
            Err(_) => Err(GitHubError::Timeout {
                operation: operation.to_string(),
                duration_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn get_organization(&self, org: &str) -> Result<OrganizationInfo, GitHubError> {
        self.bounded(
            "get organization",
            self.octocrab.get(format!("/orgs/{org}"), None::<&()>),
        )
        .await
    }

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<CreatedRepository, GitHubError> {
        let body = json!({ "name": name, "private": private });
        self.bounded(
            "create repository",
            self.octocrab.post(format!("/orgs/{org}/repos"), Some(&body)),
        )
        .await
    }

    async fn delete_repository(&self, owner: &str, name: &str) -> Result<(), GitHubError> {
        self.bounded("delete repository", self.octocrab.repos(owner, name).delete())
            .await
    }

    async fn create_tag_object(&self, owner: &str, repo: &str, request: &TagObjectRequest) -> Result<GitTagObject, GitHubError> {
        self.bounded(
            "create tag object",
            self.octocrab
                .post(format!("/repos/{owner}/{repo}/git/tags"), Some(request)),
        )
        .await
    }

    async fn create_tag_ref(&self, owner: &str, repo: &str, tag: &str, sha: &str) -> Result<(), GitHubError> {
        self.bounded(
            "create tag ref",
            self.octocrab
                .repos(owner, repo)
                .create_ref(&Reference::Tag(tag.to_string()), sha),
        )
        .await?;
        Ok(())
    }

    async fn file_exists(&self, owner: &str, repo: &str, path: &str) -> Result<bool, GitHubError> {
        let lookup = self
            .bounded(
                "get file contents",
                self.octocrab.repos(owner, repo).get_content().path(path).send(),
            )
            .await;

        match lookup {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_file(&self, owner: &str, repo: &str, path: &str, message: &str, content: &str) -> Result<(), GitHubError> {
        self.bounded(
            "create file",
            self.octocrab
                .repos(owner, repo)
                .create_file(path, message, content)
                .send(),
        )
        .await?;
        Ok(())
    }

    async fn delete_label(&self, owner: &str, repo: &str, name: &str) -> Result<bool, GitHubError> {
        let lookup = self
            .bounded("get label", self.octocrab.issues(owner, repo).get_label(name))
            .await;

        match lookup {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        }

        self.bounded("delete label", self.octocrab.issues(owner, repo).delete_label(name))
            .await?;
        Ok(true)
    }

    async fn create_label(&self, owner: &str, repo: &str, label: &LabelSpec) -> Result<(), GitHubError> {
        self.bounded(
            "create label",
            self.octocrab
                .issues(owner, repo)
                .create_label(&label.name, &label.color, &label.description),
        )
        .await?;
        Ok(())
    }

    async fn graphql(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value, GitHubError> {
        let payload = json!({ "query": query, "variables": variables });
        let response: serde_json::Value = self
            .bounded("graphql", self.octocrab.graphql(&payload))
            .await?;

        if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
            return Err(GitHubError::UnexpectedResponse {
                operation: "graphql".to_string(),
                message: errors.to_string(),
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_object_request_serializes_type_field() {
        let request = TagObjectRequest::for_commit("kupia-audit", "Kupia audit tag", "abc123");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "tag": "kupia-audit",
                "message": "Kupia audit tag",
                "object": "abc123",
                "type": "commit"
            })
        );
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let err = GitHubClient::new("  ", None, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, GitHubError::TokenNotFound(_)));
    }
}
