//! # Cantus Auth
//!
//! Resolves the caller's bearer token to a user and its groups, and caches
//! the answer.
//!
//! - [`GroupResolver`] - the lookup seam; [`OpenShiftGroupResolver`] asks the
//!   cluster's user API
//! - [`GroupCache`] - TTL cache with one in-flight lookup per token
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cantus_auth::{GroupCache, GroupCacheConfig, OpenShiftGroupResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = OpenShiftGroupResolver::new("https://api.cluster.example.com:6443", Duration::from_secs(5))?;
//!     let cache = GroupCache::new(Arc::new(resolver), GroupCacheConfig::default());
//!
//!     let user = cache.get("caller-token").await?;
//!     println!("{} is in {:?}", user.username, user.groups);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]

mod cache;
mod resolver;

pub use cache::{GroupCache, GroupCacheConfig};
pub use resolver::{GroupResolver, OpenShiftGroupResolver, UserGroups, OPENSHIFT_SOURCE};
