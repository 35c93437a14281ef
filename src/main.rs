//! Warden CLI entry point.

use clap::Parser;
use tracing::debug;

use warden::cli::commands::{evaluate, history, policy, workspace};
use warden::cli::{handle_error, load_config, Cli, Commands};
use warden::domain::models::SpecificationBudget;
use warden::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(&err, cli.json),
    };
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, cli.json),
    };
    debug!(command = ?cli.command, "Configuration loaded");

    let result = match cli.command {
        Commands::Policy(ref command) => {
            policy::execute(command, &config, cli.config.as_ref(), cli.json)
        }
        Commands::Evaluate {
            ref file,
            phase,
            remaining,
        } => evaluate::execute_evaluate(&config, file, phase, remaining, cli.json).await,
        Commands::Price {
            ref file,
            remaining,
        } => evaluate::execute_price(&config, file, remaining, cli.json),
        Commands::Envelope {
            max_loc,
            max_files,
            max_deps,
        } => evaluate::execute_envelope(
            &config,
            SpecificationBudget {
                max_loc_delta: max_loc,
                max_new_files: max_files,
                max_new_dependencies: max_deps,
            },
            cli.json,
        ),
        Commands::Workspace { ref root } => workspace::execute(&config, root, cli.json).await,
        Commands::History { file, kind } => history::execute(&config, file, kind, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
