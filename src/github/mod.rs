pub mod client;
pub mod errors;
pub mod issue_template;
pub mod labels;
pub mod projects;

pub use client::{CreatedRepository, GitHubClient, GitTagObject, HostingApi, OrganizationInfo, TagObjectRequest};
pub use errors::GitHubError;
pub use labels::LabelSpec;
pub use projects::{ProjectBoard, ProjectBoardRequest};
