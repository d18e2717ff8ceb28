//! debhub - APT repository for GitHub release assets
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use debhub::cli::{Cli, Commands};
use debhub::config::ConfigManager;
use debhub::error::DebhubResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DebhubResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("debhub=warn"),
        1 => EnvFilter::new("debhub=info"),
        _ => EnvFilter::new("debhub=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    debug!("Using config {}", config_manager.path().display());

    // Dispatch to command
    match cli.command {
        Commands::Inspect(args) => debhub::cli::commands::inspect(args, &config).await,
        Commands::Index(args) => debhub::cli::commands::index(args, &config).await,
    }
}
