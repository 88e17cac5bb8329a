//! Cantus CLI - Command-line access to the Cantus registry and Nexus integrations.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cantus=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let global = &cli.global;

    match cli.command {
        Commands::Classify(args) => commands::classify::run(&args),
        Commands::Tags(args) => commands::registry::tags(global, &args).await,
        Commands::Manifest(args) => commands::registry::manifest(global, &args).await,
        Commands::Details(args) => commands::registry::details(global, &args).await,
        Commands::BlobExists(args) => commands::registry::blob_exists(global, &args).await,
        Commands::Versions(args) => commands::nexus::versions(global, &args).await,
        Commands::Move(args) => commands::nexus::move_image(global, args).await,
        Commands::Whoami => commands::whoami::run(global).await,
        Commands::Version => {
            println!("cantus {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
