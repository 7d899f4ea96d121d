use anyhow::Result;
use audit_repo_cloner::cli::commands::{print_summary, ProvisionCommand, ProvisioningInputs};
use audit_repo_cloner::cli::Cli;
use audit_repo_cloner::config::{AuditConfig, BranchSelection};
use audit_repo_cloner::shutdown::ShutdownCoordinator;
use audit_repo_cloner::telemetry::init_telemetry;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;

fn main() -> Result<()> {
    // .env has to be in the environment before clap reads env-backed options
    AuditConfig::load_env_file()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AuditConfig::load_from(path)?,
        None => AuditConfig::load()?,
    };
    if cli.json_logs {
        config.observability.json_logs = true;
    }
    if cli.select_first_branch {
        config.provisioning.branch_selection = BranchSelection::First;
    }
    init_telemetry(&config.observability)?;

    let mut inputs = ProvisioningInputs::from(&cli);
    if !cli.no_prompt && std::io::stdin().is_terminal() {
        inputs.prompt_for_missing(std::io::stdin().lock(), std::io::stdout())?;
    }

    let (request, credentials) = match inputs.into_request(&config, chrono::Local::now().date_naive()) {
        Ok(resolved) => resolved,
        Err(e) => Cli::command().error(ErrorKind::MissingRequiredArgument, e).exit(),
    };
    let command = ProvisionCommand::new(request, credentials, config);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        let shutdown = ShutdownCoordinator::new().install_signal_handlers();
        command.execute(shutdown).await
    });
    // a branch prompt may still be blocked on stdin
    runtime.shutdown_background();

    let outcome = result?;
    print_summary(&outcome);
    std::process::exit(outcome.exit_code());
}
