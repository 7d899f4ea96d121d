//! Project board cloning
//!
//! Project (v2) boards cannot be created through the REST API, so the
//! organization's template board is copied with the GraphQL `copyProjectV2`
//! mutation.

use super::client::HostingApi;
use super::errors::GitHubError;
use serde_json::json;

const TEMPLATE_LOOKUP: &str = r#"
query($org: String!, $number: Int!) {
  organization(login: $org) {
    id
    projectV2(number: $number) { id title }
  }
}"#;

const COPY_PROJECT: &str = r#"
mutation($ownerId: ID!, $projectId: ID!, $title: String!) {
  copyProjectV2(input: { ownerId: $ownerId, projectId: $projectId, title: $title, includeDraftIssues: true }) {
    projectV2 { id url }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBoardRequest {
    /// Number from the template project URL (`/orgs/<org>/projects/<number>`).
    pub template_number: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBoard {
    pub id: String,
    pub url: Option<String>,
}

fn missing(field: &str) -> GitHubError {
    GitHubError::UnexpectedResponse {
        operation: "clone project board".to_string(),
        message: format!("response is missing {field}"),
    }
}

pub async fn clone_project_board(
    api: &dyn HostingApi,
    organization: &str,
    request: &ProjectBoardRequest,
) -> Result<ProjectBoard, GitHubError> {
    let lookup = api
        .graphql(
            TEMPLATE_LOOKUP,
            json!({ "org": organization, "number": request.template_number }),
        )
        .await?;

    let org = &lookup["data"]["organization"];
    let owner_id = org["id"].as_str().ok_or_else(|| missing("organization id"))?;
    let template_id = org["projectV2"]["id"]
        .as_str()
        .ok_or_else(|| missing("template project id"))?;

    let copied = api
        .graphql(
            COPY_PROJECT,
            json!({ "ownerId": owner_id, "projectId": template_id, "title": request.title }),
        )
        .await?;

    let project = &copied["data"]["copyProjectV2"]["projectV2"];
    let id = project["id"].as_str().ok_or_else(|| missing("copied project id"))?;

    tracing::info!(project.id = %id, title = %request.title, "Project board cloned");
    Ok(ProjectBoard {
        id: id.to_string(),
        url: project["url"].as_str().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::MockHostingApi;
    use mockall::Sequence;

    #[tokio::test]
    async fn test_clone_project_board_copies_template() {
        let mut api = MockHostingApi::new();
        let mut seq = Sequence::new();
        api.expect_graphql()
            .withf(|query, vars| query.contains("projectV2(number") && vars["number"] == 7)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(json!({ "data": { "organization": { "id": "O_1", "projectV2": { "id": "PVT_7", "title": "Template" } } } }))
            });
        api.expect_graphql()
            .withf(|query, vars| {
                query.contains("copyProjectV2") && vars["projectId"] == "PVT_7" && vars["ownerId"] == "O_1"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(json!({ "data": { "copyProjectV2": { "projectV2": { "id": "PVT_8", "url": "https://github.com/orgs/acme/projects/8" } } } }))
            });

        let request = ProjectBoardRequest {
            template_number: 7,
            title: "audit-widget".to_string(),
        };
        let board = clone_project_board(&api, "acme", &request).await.unwrap();

        assert_eq!(board.id, "PVT_8");
        assert_eq!(board.url.as_deref(), Some("https://github.com/orgs/acme/projects/8"));
    }

    #[tokio::test]
    async fn test_missing_template_is_an_error() {
        let mut api = MockHostingApi::new();
        api.expect_graphql()
            .times(1)
            .returning(|_, _| Ok(json!({ "data": { "organization": { "id": "O_1", "projectV2": null } } })));

        let request = ProjectBoardRequest {
            template_number: 99,
            title: "audit-widget".to_string(),
        };
        let err = clone_project_board(&api, "acme", &request).await.unwrap_err();
        assert!(err.to_string().contains("template project id"));
    }
}
