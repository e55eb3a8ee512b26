//! Scout CLI
//!
//! Operator commands over the search cache and the LLM fallback chain.

use anyhow::Result;
use clap::Parser;
use scout_core::error::exit_codes;
use scout_core::{Config, ScoutError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<ScoutError>()
            .map(ScoutError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_from(&config_path)?.with_env_overrides();
    if let Some(db) = cli.db.clone() {
        config.cache.path = Some(db);
    }

    match cli.command {
        Commands::Cache(args) => commands::cache::run(args, &config, cli.format).await,
        Commands::Search(args) => commands::search::run(args, &config, cli.format).await,
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format).await,
    }
}
