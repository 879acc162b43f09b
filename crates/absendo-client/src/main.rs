//! absendo CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use absendo_client::cli::{Cli, Command, ConfigAction};
use absendo_client::commands;
use absendo_client::config::ClientConfig;
use absendo_client::error::{ClientError, ClientResult};
use absendo_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    let mut tracing_config = TracingConfig::cli(cli.debug || config.debug);
    if let Some(ref filter) = config.log_filter {
        tracing_config = tracing_config.with_env_filter(filter.as_str());
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match cli.command {
        Command::Lessons(ref args) => commands::lessons::run(args, &config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
