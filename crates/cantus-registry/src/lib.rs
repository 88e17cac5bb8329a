//! # Cantus Registry
//!
//! Docker Registry HTTP API V2 client used by Cantus.
//!
//! The client reads manifests, tags, blobs and image configs, and offers the
//! narrow write path (blob upload and manifest push) needed to copy images.
//!
//! ## Features
//!
//! - **Strict manifests**: only schema 2 manifests are accepted and the
//!   `Docker-Content-Digest` header is required
//! - **Error classification**: every failure is a [`cantus_core::CantusError`]
//!   naming the registry it came from
//! - **Retries**: transient failures (5xx, network) are retried with
//!   exponential backoff; 4xx and protocol violations are not
//! - **Batches**: [`RegistryClient::get_manifests`] keeps one result per locator
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cantus_core::{LocatorResolver, RegistrySettings};
//! use cantus_registry::{RegistryClient, RegistryClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = LocatorResolver::new(RegistrySettings::new("docker.example.com"));
//!     let client = RegistryClient::new(RegistryClientConfig::default())?;
//!
//!     let locator = resolver.resolve("/aurora/console/latest", None)?;
//!     let manifest = client.get_manifest(&locator).await?;
//!     println!("{}", manifest.digest);
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod config;
mod manifest;
mod retry;

pub use client::RegistryClient;
pub use config::{
    RegistryClientConfig, RetryConfig, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BUDGET,
};
pub use manifest::{
    Descriptor, ImageDetails, ManifestResponse, ManifestV2, MediaType, DIGEST_HEADER,
    UPLOAD_UUID_HEADER,
};
