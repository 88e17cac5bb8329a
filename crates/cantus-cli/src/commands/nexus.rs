//! Nexus command implementations: versions and move.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cantus_core::{with_deadline, BATCH_TIMEOUT, NEXUS_SOURCE};
use cantus_nexus::{
    get_all_versions, move_service, DisabledMoveService, MoveRequest, MoveService, NexusClient,
};

use super::{print_json, GlobalArgs};

/// Arguments for the versions command.
#[derive(Args)]
pub struct VersionsArgs {
    /// Image namespace
    pub namespace: String,

    /// Image name
    pub name: String,

    /// Nexus repository to search
    pub repository: String,
}

/// Arguments for the move command.
#[derive(Args)]
pub struct MoveArgs {
    /// Repository currently holding the image
    pub from: String,

    /// Destination repository
    pub to: String,

    /// Image name, `namespace/name`
    pub name: String,

    /// Image tag
    pub version: String,

    /// Expected SHA-256 of the image
    pub sha256: String,
}

/// Runs the versions command.
///
/// # Errors
///
/// Returns an error if Nexus is not configured or the listing fails.
pub async fn versions(global: &GlobalArgs, args: &VersionsArgs) -> Result<()> {
    let config = global.load_config()?;
    let nexus = config
        .nexus
        .context("No nexus section in configuration")?
        .to_config();
    let client = NexusClient::new(nexus.clone()).context("Failed to create Nexus client")?;

    info!(namespace = %args.namespace, name = %args.name, repository = %args.repository, "Listing versions");
    let versions = with_deadline(
        BATCH_TIMEOUT,
        NEXUS_SOURCE,
        get_all_versions(&client, &args.namespace, &args.name, &args.repository, nexus.max_pages),
    )
    .await
    .context("Failed to list versions")?;

    print_json(&versions)
}

/// Runs the move command.
///
/// # Errors
///
/// Returns an error if moves are disabled, the lookup does not find exactly
/// one image, Nexus fails, or Nexus refuses the move. The outcome is printed
/// before a refusal is reported.
pub async fn move_image(global: &GlobalArgs, args: MoveArgs) -> Result<()> {
    let config = global.load_config()?;

    let mover: Arc<dyn MoveService> = match config.nexus {
        Some(section) => {
            let nexus = section.to_config();
            let client = NexusClient::new(nexus.clone()).context("Failed to create Nexus client")?;
            move_service(&nexus, Arc::new(client))
        }
        None => Arc::new(DisabledMoveService),
    };

    let request = MoveRequest::new(args.from, args.to, args.name, args.version, args.sha256);
    let outcome = with_deadline(BATCH_TIMEOUT, NEXUS_SOURCE, mover.move_image(&request))
        .await
        .context("Move failed")?;

    print_json(&outcome)?;
    if !outcome.success {
        anyhow::bail!("Nexus refused the move: {}", outcome.message);
    }
    Ok(())
}
