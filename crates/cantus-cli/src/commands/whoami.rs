//! Whoami command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use cantus_auth::{GroupCache, OpenShiftGroupResolver};
use cantus_core::{with_deadline, REGISTRY_TIMEOUT};

use super::{print_json, GlobalArgs};

/// Runs the whoami command.
///
/// # Errors
///
/// Returns an error if no token or cluster API is configured, or the lookup
/// fails.
pub async fn run(global: &GlobalArgs) -> Result<()> {
    let config = global.load_config()?;
    let openshift = config
        .openshift
        .context("No openshift section in configuration")?;
    let token = global
        .token
        .as_deref()
        .context("A caller token is required (--token or CANTUS_TOKEN)")?;

    let resolver = OpenShiftGroupResolver::new(
        openshift.api_url.clone(),
        Duration::from_secs(openshift.timeout_secs),
    )
    .context("Failed to create cluster client")?;
    let cache = GroupCache::new(Arc::new(resolver), openshift.cache_config());

    let user = with_deadline(REGISTRY_TIMEOUT, cantus_auth::OPENSHIFT_SOURCE, cache.get(token))
        .await
        .context("Failed to look up user")?;

    print_json(&user)
}
