use octocrab::Error as OctocrabError;

#[derive(Debug)]
pub enum GitHubError {
    TokenNotFound(String),
    ApiError(OctocrabError),
    Timeout {
        operation: String,
        duration_ms: u64,
    },
    UnexpectedResponse {
        operation: String,
        message: String,
    },
}

impl GitHubError {
    /// HTTP status returned by the API, when the failure came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GitHubError::ApiError(OctocrabError::GitHub { source, .. }) => {
                Some(source.status_code.as_u16())
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<OctocrabError> for GitHubError {
    fn from(err: OctocrabError) -> Self {
        GitHubError::ApiError(err)
    }
}

impl std::fmt::Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitHubError::TokenNotFound(msg) => {
                writeln!(f, "GitHub Authentication Error")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "🔑 {msg}\n\n")?;
                writeln!(f, "🔧 QUICK FIXES:")?;
                writeln!(f, "   → Pass --github-token or export GITHUB_ACCESS_TOKEN=your_token")?;
                writeln!(f, "   → Create token at: https://github.com/settings/tokens")?;
                write!(f, "     (needs 'repo' and 'delete_repo' scopes, plus 'project' for boards)")
            }
            GitHubError::ApiError(octocrab_err) => {
                writeln!(f, "GitHub API Error")?;
                writeln!(f, "────────────────")?;

                match octocrab_err {
                    octocrab::Error::GitHub { source, .. } => {
                        writeln!(f, "🌐 HTTP {}: {}", source.status_code, source.message)?;
                        writeln!(f)?;

                        match source.status_code.as_u16() {
                            401 => {
                                writeln!(f, "🔧 AUTHENTICATION FAILED:")?;
                                writeln!(f, "   → Token is invalid or expired")?;
                                write!(f, "   → Generate a new token and export GITHUB_ACCESS_TOKEN")
                            }
                            403 => {
                                writeln!(f, "🔧 PERMISSION DENIED:")?;
                                writeln!(f, "   → Token lacks required permissions")?;
                                writeln!(f, "   → Creating org repositories needs 'repo' scope and org membership")?;
                                write!(f, "   → Deleting repositories on rollback needs 'delete_repo' scope")
                            }
                            404 => {
                                writeln!(f, "🔧 RESOURCE NOT FOUND:")?;
                                writeln!(f, "   → Organization or repository may not exist")?;
                                write!(f, "   → Private resources also report 404 when the token cannot see them")
                            }
                            422 => {
                                writeln!(f, "🔧 VALIDATION ERROR:")?;
                                writeln!(f, "   → Request data is invalid")?;
                                write!(f, "   → The repository, tag, or label may already exist")
                            }
                            _ => {
                                writeln!(f, "🔧 TROUBLESHOOTING:")?;
                                writeln!(f, "   → Test connection: curl -I https://api.github.com")?;
                                write!(f, "   → Check GitHub status: https://status.github.com")
                            }
                        }
                    }
                    octocrab::Error::Http { .. } => {
                        writeln!(f, "🌐 Network connection failed to GitHub API")?;
                        writeln!(f)?;
                        writeln!(f, "🔧 NETWORK TROUBLESHOOTING:")?;
                        writeln!(f, "   → Test HTTPS: curl -I https://api.github.com")?;
                        write!(f, "   → Check proxy settings: https_proxy / HTTPS_PROXY")
                    }
                    _ => write!(f, "🌐 {octocrab_err}"),
                }
            }
            GitHubError::Timeout {
                operation,
                duration_ms,
            } => {
                writeln!(f, "GitHub Operation Timeout")?;
                writeln!(f, "─────────────────────────")?;
                write!(f, "⏰ Operation '{operation}' timed out after {duration_ms}ms")
            }
            GitHubError::UnexpectedResponse { operation, message } => {
                writeln!(f, "Unexpected GitHub Response")?;
                writeln!(f, "──────────────────────────")?;
                write!(f, "❓ {operation}: {message}")
            }
        }
    }
}

impl std::error::Error for GitHubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitHubError::ApiError(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_names_operation() {
        let err = GitHubError::Timeout {
            operation: "delete repository".to_string(),
            duration_ms: 60_000,
        };
        let text = err.to_string();
        assert!(text.contains("delete repository"));
        assert!(text.contains("60000ms"));
        assert_eq!(err.status_code(), None);
        assert!(!err.is_not_found());
    }
}
