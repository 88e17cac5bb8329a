//! CLI commands and argument parsing.

pub mod classify;
pub mod nexus;
pub mod registry;
pub mod whoami;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::CantusConfig;

/// Cantus - Docker registry and Nexus integration
#[derive(Parser)]
#[command(name = "cantus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Configuration file
    #[arg(short, long, global = true, env = "CANTUS_CONFIG", default_value = "cantus.yaml")]
    pub config: PathBuf,

    /// Overrides the default registry from the configuration file
    #[arg(long, global = true, env = "CANTUS_DEFAULT_REGISTRY")]
    pub default_registry: Option<String>,

    /// Caller bearer token, forwarded to internal registries
    #[arg(long, global = true, env = "CANTUS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Nexus password for staging moves
    #[arg(long, global = true, env = "CANTUS_NEXUS_PASSWORD", hide_env_values = true)]
    pub nexus_password: Option<String>,
}

impl GlobalArgs {
    /// Loads the configuration file and applies command-line overrides.
    ///
    /// A missing file is only an error when no default registry is given on
    /// the command line.
    pub fn load_config(&self) -> Result<CantusConfig> {
        let mut config = if self.config.exists() || self.default_registry.is_none() {
            CantusConfig::load(&self.config)?
        } else {
            CantusConfig::default()
        };

        if let Some(registry) = &self.default_registry {
            config.registry.default_registry.clone_from(registry);
        }
        if let (Some(nexus), Some(password)) = (config.nexus.as_mut(), &self.nexus_password) {
            nexus.password = Some(password.clone());
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Classify image tags
    Classify(classify::ClassifyArgs),

    /// List the tags of a repository
    Tags(registry::TagsArgs),

    /// Fetch manifests for one or more locators
    Manifest(registry::ManifestArgs),

    /// Show build details of an image
    Details(registry::DetailsArgs),

    /// Check whether a blob exists
    BlobExists(registry::BlobExistsArgs),

    /// List every version of an image in Nexus
    Versions(nexus::VersionsArgs),

    /// Move an image between Nexus repositories
    Move(nexus::MoveArgs),

    /// Show the user and groups behind the caller token
    Whoami,

    /// Print version information
    Version,
}

/// Prints `value` as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}
