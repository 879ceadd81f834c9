use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use mediarag::cli::{Cli, Commands};
use mediarag::config::Config;
use mediarag::logging::init_logging;
use mediarag::metrics;

#[tokio::main]
async fn main() -> Result<()> {
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let config = Config::load(&root).unwrap_or_default();

    // The guard MUST be held until program exit to ensure logs are flushed
    let _logging_guard = init_logging(&config.logging, &root)?;

    tracing::info!("mediarag starting up");

    metrics::register_metrics();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            limit,
            collections,
            category,
            json,
        } => {
            mediarag::commands::search::run(&query, limit, collections, category, json).await?;
        }
        Commands::SearchCollections {
            query,
            limit,
            category,
            json,
        } => {
            mediarag::commands::search_collections::run(&query, limit, category, json).await?;
        }
        Commands::Collections => {
            mediarag::commands::collections::run().await?;
        }
        Commands::Status { prometheus } => {
            mediarag::commands::status::run(prometheus).await?;
        }
    }

    Ok(())
}
