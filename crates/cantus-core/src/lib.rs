//! # Cantus Core
//!
//! Core types shared by the Cantus registry and Nexus integrations.
//!
//! This crate provides:
//!
//! - [`LocatorResolver`] - validates `registry/namespace/name[/tag]` strings
//!   into [`RepositoryLocator`] values
//! - [`RegistryMetadataResolver`] - derives scheme and authentication for a
//!   registry host
//! - [`TagCategory`] - classifies image tags by meaning
//! - [`CantusError`] - the error taxonomy every integration reports with
//! - [`BatchOutcome`] - per-item results for batch operations
//!
//! ## Example
//!
//! ```rust
//! use cantus_core::{LocatorResolver, RegistrySettings, TagCategory};
//!
//! let settings = RegistrySettings::new("docker.example.com")
//!     .with_allowed_registry("docker.example.com");
//! let resolver = LocatorResolver::new(settings);
//!
//! let locator = resolver.resolve("/aurora/console/4.2", None).unwrap();
//! let category = TagCategory::classify(locator.image_tag().unwrap());
//! assert_eq!(category, TagCategory::Minor);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod deadline;
pub mod error;
pub mod locator;
pub mod metadata;
pub mod tag;


// Re-export main types at crate root
pub use batch::{BatchItem, BatchOutcome};
pub use config::RegistrySettings;
pub use deadline::{with_deadline, BATCH_TIMEOUT, REGISTRY_TIMEOUT};
pub use error::{CantusError, ErrorKind, FailureClass, Result, NEXUS_SOURCE};
pub use locator::{LocatorResolver, RepositoryLocator};
pub use metadata::{ApiScheme, AuthenticationMethod, RegistryMetadata, RegistryMetadataResolver};
pub use tag::{group_tags, TagCategory};
