use super::errors::InputError;
use crate::github::ProjectBoardRequest;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SOURCE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://(?:[^@/]+@)?(?P<host>[^/]+)/|git@(?P<ssh_host>[^:]+):)(?P<owner>[^/]+)/(?P<name>[^/]+?)(?:\.git)?/?$",
    )
    .expect("static regex")
});

static COMMIT_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9a-f]{40}|[0-9a-f]{64})$").expect("static regex"));

static REPO_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex"));

pub fn validate_name(name: &str) -> Result<(), InputError> {
    if REPO_NAME.is_match(name) && name != "." && name != ".." {
        Ok(())
    } else {
        Err(InputError::InvalidName(name.to_string()))
    }
}

/// Token used for the hosting API and git transport.
#[derive(Clone)]
pub struct GitCredentials {
    token: String,
}

impl GitCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `https://<token>@<host>/<owner>/<name>.git`
    pub fn authenticated_url(&self, host: &str, owner: &str, name: &str) -> String {
        format!("https://{}@{host}/{owner}/{name}.git", self.token)
    }
}

impl fmt::Debug for GitCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitCredentials").field("token", &"***").finish()
    }
}

/// The repository under audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepository {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl SourceRepository {
    pub fn parse(url: &str) -> Result<Self, InputError> {
        let caps = SOURCE_URL
            .captures(url.trim())
            .ok_or_else(|| InputError::InvalidSourceUrl(url.to_string()))?;

        let host = caps
            .name("host")
            .or_else(|| caps.name("ssh_host"))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| InputError::InvalidSourceUrl(url.to_string()))?;

        Ok(Self {
            host,
            owner: caps["owner"].to_string(),
            name: caps["name"].to_string(),
        })
    }

    pub fn clone_url(&self, credentials: &GitCredentials) -> String {
        credentials.authenticated_url(&self.host, &self.owner, &self.name)
    }
}

impl fmt::Display for SourceRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

/// Full SHA of the audited commit, normalised to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitReference(String);

impl CommitReference {
    pub fn parse(sha: &str) -> Result<Self, InputError> {
        let normalized = sha.trim().to_ascii_lowercase();
        if COMMIT_SHA.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(InputError::InvalidCommitHash(sha.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to the audit repository created in the destination organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRepository {
    pub organization: String,
    pub name: String,
    pub html_url: Option<String>,
}

impl TargetRepository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }

    pub fn remote_url(&self, git_host: &str, credentials: &GitCredentials) -> String {
        credentials.authenticated_url(git_host, &self.organization, &self.name)
    }
}

/// A source branch containing the audited commit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Branch {
    pub name: String,
}

impl Branch {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Which tag path produced the audit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPath {
    Api,
    Cli,
}

impl TagPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagPath::Api => "api",
            TagPath::Cli => "cli",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTag {
    pub name: String,
    pub commit: CommitReference,
    pub created_via: TagPath,
}

/// Everything a session needs to know about what to provision.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub source: SourceRepository,
    pub organization: String,
    pub target_name: String,
    pub commit: CommitReference,
    pub project_board: Option<ProjectBoardRequest>,
}

impl ProvisioningRequest {
    pub fn new(
        source: SourceRepository,
        organization: impl Into<String>,
        target_name: impl Into<String>,
        commit: CommitReference,
    ) -> Result<Self, InputError> {
        let organization = organization.into();
        let target_name = target_name.into();
        validate_name(&organization)?;
        validate_name(&target_name)?;
        Ok(Self {
            source,
            organization,
            target_name,
            commit,
            project_board: None,
        })
    }

    pub fn with_project_board(mut self, request: ProjectBoardRequest) -> Self {
        self.project_board = Some(request);
        self
    }
}
