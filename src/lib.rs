// audit-repo-cloner library
// Exposes the provisioning pipeline for the binary and for integration tests

pub mod cli;
pub mod config;
pub mod external;
pub mod github;
pub mod provisioning;
pub mod shutdown;
pub mod telemetry;

// Re-export key types for easy access
pub use config::AuditConfig;
pub use external::{CommandExecutor, GitClient, ProcessCommandExecutor};
pub use github::{GitHubClient, GitHubError, HostingApi};
pub use provisioning::{
    ProvisioningError, ProvisioningRequest, ProvisioningSession, SessionOutcome, SessionReport,
};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use telemetry::{create_session_span, generate_correlation_id, init_telemetry};
