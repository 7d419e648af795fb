//! # DOI Registry Entry Point

use std::process::ExitCode;

use clap::Parser;
use doi_registry::{
    cli::{self, Cli},
    config::ConfigLoader,
    telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConfigLoader::new().load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = telemetry::init_tracing(&config) {
        eprintln!("Failed to initialize telemetry: {}", err);
    }

    tracing::debug!(profile = %config.profile, "Configuration loaded");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::trace!(configuration = %redacted_json, "Effective configuration");
    }

    match cli::execute(&cli.command, &config).await {
        Ok(output) => {
            println!("{}", cli::render(&output, cli.pretty));
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(error = %format!("{:#}", err), "Command failed");
            eprintln!("{}", cli::render_error(&err));
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
