//! # Cantus Nexus
//!
//! Client for the parts of the Nexus REST API Cantus uses: docker component
//! search, version listing across continuation tokens, and staging moves.
//!
//! ## Components
//!
//! - [`NexusApi`] / [`NexusClient`] - single-page search and raw move calls
//! - [`get_all_versions`] - sequential walk over every search page
//! - [`MoveService`] - lookup, move and reconcile; [`move_service`] picks the
//!   Nexus-backed or the disabled implementation from configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cantus_nexus::{move_service, MoveRequest, NexusClient, NexusConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NexusConfig::new("https://nexus.example.com");
//!     let client = Arc::new(NexusClient::new(config.clone())?);
//!
//!     let versions = cantus_nexus::get_all_versions(
//!         client.as_ref(), "aurora", "console", "docker-snapshots", config.max_pages,
//!     ).await?;
//!     println!("{} versions", versions.len());
//!
//!     let mover = move_service(&config, client);
//!     let request = MoveRequest::new("docker-snapshots", "docker-release", "aurora/console", "4.2.4", "abc");
//!     let outcome = mover.move_image(&request).await?;
//!     println!("moved: {}", outcome.success);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]

mod client;
mod config;
mod mover;
mod pagination;
mod types;

pub use client::{NexusApi, NexusClient};
pub use config::{NexusConfig, NexusCredentials, DEFAULT_MAX_PAGES, DEFAULT_TIMEOUT};
pub use mover::{move_service, DisabledMoveService, MoveService, NexusMoveService, MOVE_INTEGRATION};
pub use pagination::get_all_versions;
pub use types::{
    ImageRef, ImageVersion, MoveData, MoveOutcome, MoveReply, MoveRequest, MoveResponse,
    MovedComponent, NexusAsset, NexusItem, NexusPage,
};
