use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for audit-repo-cloner
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// GitHub configuration
    pub github: GitHubConfig,
    /// Provisioning pipeline settings
    pub provisioning: ProvisioningSettings,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST/GraphQL base URL override (GitHub Enterprise, test servers)
    pub api_base_url: Option<String>,
    /// Host used for git transport URLs
    pub git_host: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            git_host: "github.com".to_string(),
        }
    }
}

/// How to pick among several branches containing the audited commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSelection {
    /// Ask the operator for a 1-based index
    Interactive,
    /// Take the lexicographically first candidate
    First,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvisioningSettings {
    /// Branch name the selected source branch is published as
    pub main_branch_name: String,
    /// Remote name inside the workspace clone
    pub remote_name: String,
    pub audit_tag_name: String,
    pub audit_tag_message: String,
    /// Prefix for the default target name (`<prefix><source repo name>`)
    pub target_prefix: String,
    pub private: bool,
    pub branch_selection: BranchSelection,
    pub git_timeout_seconds: u64,
    pub api_timeout_seconds: u64,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            main_branch_name: "main".to_string(),
            remote_name: "origin".to_string(),
            audit_tag_name: "kupia-audit".to_string(),
            audit_tag_message: "Kupia audit tag".to_string(),
            target_prefix: "audit-".to_string(),
            private: true,
            branch_selection: BranchSelection::Interactive,
            git_timeout_seconds: 600,
            api_timeout_seconds: 60,
        }
    }
}

impl ProvisioningSettings {
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_seconds)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl AuditConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (audit-repo-cloner.toml)
    /// 3. Environment variables (prefixed with AUDIT_REPO_CLONER_, `__` between nested keys)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("audit-repo-cloner.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("AUDIT_REPO_CLONER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
        }
        Ok(())
    }
}
