use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr so
/// interactive prompts on stdout stay readable.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

/// Generate a correlation ID for linking the log lines of one session
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create the span every provisioning session runs in
pub fn create_session_span(
    correlation_id: &str,
    organization: &str,
    target: &str,
    commit: &str,
) -> tracing::Span {
    tracing::info_span!(
        "audit_session",
        correlation.id = correlation_id,
        organization = organization,
        target = target,
        commit = commit,
    )
}
