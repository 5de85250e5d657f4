//! # Invoicing API Main Entry Point
//!
//! `serve` (the default) applies pending migrations and starts the HTTP
//! server and cron scheduler; `migrate` and `seed` run one-off
//! maintenance and exit.

use clap::{Parser, Subcommand};
use invoicing::{
    config::ConfigLoader,
    db::init_pool,
    migration::{Migrator, MigratorTrait},
    seeds::seed_all,
    server::run_server,
    telemetry::init_tracing,
};

#[derive(Debug, Parser)]
#[command(name = "invoicing", version, about = "Invoicing API service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API and the cron scheduler
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Seed roles, permissions, lookups and the bootstrap admin
    Seed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;
    init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            Migrator::up(&db, None).await?;
            run_server(config, db).await
        }
        Command::Migrate => {
            Migrator::up(&db, None).await?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Seed => {
            seed_all(&db, &config).await?;
            Ok(())
        }
    }
}
