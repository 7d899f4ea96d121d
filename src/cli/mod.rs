use clap::Parser;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug, Default)]
#[command(name = "audit-repo-cloner")]
#[command(version)]
#[command(about = "Provision an isolated audit copy of a repository at a given commit")]
#[command(long_about = "Creates a private repository in the audit organization, publishes the branch \
                       containing the audited commit as its main branch and tags the commit. \
                       Anything created is deleted again if a later step fails.")]
pub struct Cli {
    /// Repository to audit (https://host/owner/repo or git@host:owner/repo)
    #[arg(long, env = "SOURCE_REPO_URL")]
    pub source_url: Option<String>,

    /// Name of the audit repository (default: audit-<source repo name>)
    #[arg(long, env = "TARGET_REPO_NAME")]
    pub target_name: Option<String>,

    /// Full SHA of the audited commit
    #[arg(long, env = "COMMIT_HASH")]
    pub commit_hash: Option<String>,

    /// Token with repo and delete_repo scopes
    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Organization the audit repository is created in
    #[arg(long, env = "GITHUB_ORGANIZATION")]
    pub organization: Option<String>,

    /// Number of the organization project board to copy
    #[arg(long, env = "PROJECT_TEMPLATE_ID")]
    pub project_template_id: Option<u64>,

    /// Title of the copied project board
    #[arg(long, env = "PROJECT_TITLE")]
    pub project_title: Option<String>,

    /// Pick the lexicographically first branch when several contain the commit
    #[arg(long, help = "Never prompt for a branch; take the first candidate")]
    pub select_first_branch: bool,

    /// Do not prompt for missing parameters
    #[arg(long)]
    pub no_prompt: bool,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,

    /// Configuration file (default: ./audit-repo-cloner.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "audit-repo-cloner",
            "--source-url",
            "https://github.com/acme/widget",
            "--commit-hash",
            "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3",
            "--organization",
            "audits",
            "--project-template-id",
            "4",
            "--select-first-branch",
            "--no-prompt",
        ])
        .unwrap();

        assert_eq!(cli.organization.as_deref(), Some("audits"));
        assert_eq!(cli.project_template_id, Some(4));
        assert!(cli.select_first_branch);
        assert!(cli.no_prompt);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_non_numeric_template_is_rejected() {
        let result = Cli::try_parse_from(["audit-repo-cloner", "--project-template-id", "seven"]);
        assert!(result.is_err());
    }
}
