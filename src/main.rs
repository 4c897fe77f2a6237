//! docqa CLI entry point.

use anyhow::Result;
use clap::Parser;
use docqa::cli::{commands, Cli, Commands};
use docqa::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging; -v flags override general.log_level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("docqa={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match cli.command {
        Commands::Index { reset, input, collection } => {
            std::fs::create_dir_all(settings.data_dir())?;
            commands::run_index(reset, input, collection, settings).await?;
        }

        Commands::Ask { question, template, sources } => {
            commands::run_ask(&question, template, sources, settings).await?;
        }

        Commands::Search { query, limit } => {
            commands::run_search(&query, limit, settings).await?;
        }

        Commands::Listen { audio, template } => {
            commands::run_listen(&audio, template, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Templates => {
            commands::run_templates(&settings)?;
        }

        Commands::Collections => {
            commands::run_collections(&settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, config_path).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}
