//! Registry command implementations: tags, manifest, details and blob-exists.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cantus_core::{
    group_tags, with_deadline, LocatorResolver, RepositoryLocator, BATCH_TIMEOUT, REGISTRY_TIMEOUT,
};
use cantus_registry::RegistryClient;

use super::{print_json, GlobalArgs};

/// Arguments for the tags command.
#[derive(Args)]
pub struct TagsArgs {
    /// Repository locator, `[registry]/namespace/name`
    pub locator: String,

    /// Group the tags by category
    #[arg(long)]
    pub grouped: bool,
}

/// Arguments for the manifest command.
#[derive(Args)]
pub struct ManifestArgs {
    /// Image locators, `[registry]/namespace/name/tag`
    #[arg(required = true)]
    pub locators: Vec<String>,
}

/// Arguments for the details command.
#[derive(Args)]
pub struct DetailsArgs {
    /// Image locator, `[registry]/namespace/name/tag`
    pub locator: String,
}

/// Arguments for the blob-exists command.
#[derive(Args)]
pub struct BlobExistsArgs {
    /// Repository locator, `[registry]/namespace/name`
    pub locator: String,

    /// Blob digest, e.g. `sha256:...`
    pub digest: String,
}

/// Resolver and client built from configuration.
struct Registry {
    resolver: LocatorResolver,
    client: RegistryClient,
    token: Option<String>,
}

impl Registry {
    fn connect(global: &GlobalArgs) -> Result<Self> {
        let config = global.load_config()?;
        let client = RegistryClient::new(config.registry_client.to_config())
            .context("Failed to create registry client")?;

        Ok(Self {
            resolver: LocatorResolver::new(config.registry),
            client,
            token: global.token.clone(),
        })
    }

    fn locate(&self, locator: &str) -> Result<RepositoryLocator> {
        self.resolver
            .resolve(locator, self.token.as_deref())
            .with_context(|| format!("Invalid locator '{locator}'"))
    }
}

/// Runs the tags command.
///
/// # Errors
///
/// Returns an error if the locator is invalid or the registry call fails.
pub async fn tags(global: &GlobalArgs, args: &TagsArgs) -> Result<()> {
    let registry = Registry::connect(global)?;
    let locator = registry.locate(&args.locator)?;

    info!(locator = %locator, "Listing tags");
    let tags = with_deadline(
        REGISTRY_TIMEOUT,
        locator.registry_host(),
        registry.client.get_tags(&locator),
    )
    .await
    .context("Failed to list tags")?;

    if args.grouped {
        return print_json(&group_tags(tags.iter().map(String::as_str)));
    }
    for tag in tags {
        println!("{tag}");
    }
    Ok(())
}

/// Runs the manifest command.
///
/// Every locator is reported; the command fails if any of them failed.
///
/// # Errors
///
/// Returns an error if at least one locator could not be resolved or fetched.
pub async fn manifest(global: &GlobalArgs, args: &ManifestArgs) -> Result<()> {
    let registry = Registry::connect(global)?;

    let resolved = registry
        .resolver
        .resolve_all(args.locators.iter().map(String::as_str), registry.token.as_deref());

    let mut failed = 0;
    for (key, err) in resolved.failures() {
        eprintln!("{key}\terror: {err}");
        failed += 1;
    }

    let locators: Vec<RepositoryLocator> = resolved
        .into_items()
        .into_iter()
        .filter_map(|item| item.result.ok())
        .collect();

    let outcome = with_deadline(BATCH_TIMEOUT, "registry", async {
        Ok(registry.client.get_manifests(&locators).await)
    })
    .await
    .context("Manifest lookup did not finish")?;

    for item in outcome.items() {
        match &item.result {
            Ok(manifest) => println!("{}\t{}", item.key, manifest.digest),
            Err(err) => {
                eprintln!("{}\terror: {err}", item.key);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} locators failed", args.locators.len());
    }
    Ok(())
}

/// Runs the details command.
///
/// # Errors
///
/// Returns an error if the locator is invalid or any registry call fails.
pub async fn details(global: &GlobalArgs, args: &DetailsArgs) -> Result<()> {
    let registry = Registry::connect(global)?;
    let locator = registry.locate(&args.locator)?;

    let details = with_deadline(
        REGISTRY_TIMEOUT,
        locator.registry_host(),
        registry.client.get_image_details(&locator),
    )
    .await
    .context("Failed to read image details")?;

    print_json(&details)
}

/// Runs the blob-exists command.
///
/// # Errors
///
/// Returns an error if the locator is invalid or the registry answers with
/// anything but 2xx or 404.
pub async fn blob_exists(global: &GlobalArgs, args: &BlobExistsArgs) -> Result<()> {
    let registry = Registry::connect(global)?;
    let locator = registry.locate(&args.locator)?;

    let exists = with_deadline(
        REGISTRY_TIMEOUT,
        locator.registry_host(),
        registry.client.blob_exists(&locator, &args.digest),
    )
    .await
    .context("Failed to check blob")?;

    println!("{exists}");
    Ok(())
}
