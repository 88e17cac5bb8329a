//! Configuration file loading.
//!
//! ```yaml
//! registry:
//!   defaultRegistry: docker.example.com
//!   allowedRegistries: [docker.example.com, docker-registry.default.svc:5000]
//!   internalRegistries: [docker-registry.default.svc:5000]
//! registryClient:
//!   timeoutMs: 2500
//!   retryBudgetMs: 4000
//!   maxAttempts: 3
//! nexus:
//!   readUrl: https://nexus.example.com
//!   writeUrl: https://nexus.example.com
//!   username: mover
//!   moveEnabled: true
//! openshift:
//!   apiUrl: https://api.cluster.example.com:6443
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cantus_auth::GroupCacheConfig;
use cantus_core::{RegistrySettings, REGISTRY_TIMEOUT};
use cantus_nexus::{NexusConfig, NexusCredentials, DEFAULT_MAX_PAGES};
use cantus_registry::{RegistryClientConfig, RetryConfig};
use serde::Deserialize;

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CantusConfig {
    /// Registry hosts.
    pub registry: RegistrySettings,

    /// Registry client tuning.
    pub registry_client: RegistryClientSection,

    /// Nexus connection, if any.
    pub nexus: Option<NexusSection>,

    /// Cluster API used for group lookups, if any.
    pub openshift: Option<OpenShiftSection>,
}

/// Registry client timeouts and retries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryClientSection {
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Wall-clock budget for all attempts of one operation.
    pub retry_budget_ms: u64,
    /// Total attempts for retried operations.
    pub max_attempts: u32,
    /// First backoff delay.
    pub initial_backoff_ms: u64,
    /// Largest backoff delay.
    pub max_backoff_ms: u64,
    /// Random delay added to each backoff.
    pub jitter_ms: u64,
}

impl Default for RegistryClientSection {
    fn default() -> Self {
        Self {
            timeout_ms: 2500,
            retry_budget_ms: 4000,
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
            jitter_ms: 50,
        }
    }
}

impl RegistryClientSection {
    /// Builds the client configuration.
    pub fn to_config(&self) -> RegistryClientConfig {
        let retry = RetryConfig::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            )
            .with_jitter(Duration::from_millis(self.jitter_ms))
            .with_budget(Duration::from_millis(self.retry_budget_ms));

        RegistryClientConfig::new()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_retry(retry)
    }
}

/// Nexus settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NexusSection {
    /// Base URL for searches.
    pub read_url: String,
    /// Base URL for staging moves.
    pub write_url: Option<String>,
    /// Username for staging moves.
    pub username: Option<String>,
    /// Password for staging moves. Usually supplied via `CANTUS_NEXUS_PASSWORD`.
    pub password: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: Option<u64>,
    /// Page cap for version listings.
    pub max_pages: Option<usize>,
    /// Whether staging moves are offered.
    pub move_enabled: bool,
}

impl NexusSection {
    /// Builds the Nexus client configuration.
    pub fn to_config(&self) -> NexusConfig {
        let mut config = NexusConfig::new(&self.read_url)
            .with_max_pages(self.max_pages.unwrap_or(DEFAULT_MAX_PAGES))
            .with_move_enabled(self.move_enabled);

        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(write_url) = &self.write_url {
            config = config.with_write_url(write_url);
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            config = config.with_credentials(NexusCredentials::new(username, password));
        }
        config
    }
}

/// Cluster API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenShiftSection {
    /// Cluster API base URL.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// How long group lookups are reused.
    pub cache_ttl_secs: u64,
}

impl Default for OpenShiftSection {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            timeout_secs: 5,
            cache_ttl_secs: 300,
        }
    }
}

impl OpenShiftSection {
    /// Builds the group cache configuration.
    pub const fn cache_config(&self) -> GroupCacheConfig {
        GroupCacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }
}

impl CantusConfig {
    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Checks the settings commands rely on.
    ///
    /// # Errors
    ///
    /// Returns an error if no default registry is set, or if moves are
    /// enabled without a Nexus write URL and credentials.
    pub fn validate(&self) -> Result<()> {
        if self.registry.default_registry.trim().is_empty() {
            bail!("registry.defaultRegistry must be set");
        }

        let budget = Duration::from_millis(self.registry_client.retry_budget_ms);
        if budget.is_zero() || budget >= REGISTRY_TIMEOUT {
            bail!(
                "registryClient.retryBudgetMs must be between 1 and {} ms",
                REGISTRY_TIMEOUT.as_millis() - 1
            );
        }

        if let Some(nexus) = &self.nexus {
            if nexus.read_url.trim().is_empty() {
                bail!("nexus.readUrl must be set");
            }
            if nexus.move_enabled {
                if nexus.write_url.is_none() {
                    bail!("nexus.moveEnabled requires nexus.writeUrl");
                }
                if nexus.username.is_none() || nexus.password.is_none() {
                    bail!("nexus.moveEnabled requires nexus.username and a password");
                }
            }
            nexus
                .to_config()
                .validate()
                .context("Invalid nexus configuration")?;
        }

        if let Some(openshift) = &self.openshift {
            if openshift.api_url.trim().is_empty() {
                bail!("openshift.apiUrl must be set");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r"
registry:
  defaultRegistry: docker.example.com
  allowedRegistries:
    - docker.example.com
    - docker-registry.default.svc:5000
  internalRegistries:
    - docker-registry.default.svc:5000
registryClient:
  maxAttempts: 5
nexus:
  readUrl: https://nexus.example.com
  writeUrl: https://nexus-write.example.com
  username: mover
  password: secret
  moveEnabled: true
openshift:
  apiUrl: https://api.cluster.example.com:6443
",
        );

        let config = CantusConfig::load(file.path()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.registry.default_registry, "docker.example.com");
        assert_eq!(config.registry.allowed_registries.len(), 2);
        assert_eq!(config.registry_client.max_attempts, 5);
        assert_eq!(config.registry_client.timeout_ms, 2500);

        let nexus = config.nexus.unwrap().to_config();
        assert!(nexus.move_configured());
        assert_eq!(nexus.max_pages, DEFAULT_MAX_PAGES);

        let openshift = config.openshift.unwrap();
        assert_eq!(openshift.cache_config().ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_minimal_config() {
        let file = write_config("registry:\n  defaultRegistry: docker.example.com\n");

        let config = CantusConfig::load(file.path()).unwrap();
        config.validate().unwrap();
        assert!(config.nexus.is_none());

        let client = config.registry_client.to_config();
        assert_eq!(client.retry.max_attempts, 3);
        assert_eq!(client.timeout, cantus_registry::DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(client.retry.budget, cantus_registry::DEFAULT_RETRY_BUDGET);
    }

    #[test]
    fn test_retry_budget_must_fit_registry_deadline() {
        let file = write_config(
            "registry:\n  defaultRegistry: docker.example.com\nregistryClient:\n  retryBudgetMs: 5000\n",
        );
        let config = CantusConfig::load(file.path()).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retryBudgetMs"));
    }

    #[test]
    fn test_missing_default_registry_rejected() {
        let file = write_config("registry:\n  allowedRegistries: [docker.example.com]\n");
        let config = CantusConfig::load(file.path()).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("defaultRegistry"));
    }

    #[test]
    fn test_move_without_credentials_rejected() {
        let file = write_config(
            r"
registry:
  defaultRegistry: docker.example.com
nexus:
  readUrl: https://nexus.example.com
  writeUrl: https://nexus.example.com
  moveEnabled: true
",
        );
        let config = CantusConfig::load(file.path()).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("moveEnabled"));
    }

    #[test]
    fn test_move_without_write_url_rejected() {
        let file = write_config(
            r"
registry:
  defaultRegistry: docker.example.com
nexus:
  readUrl: https://nexus.example.com
  username: mover
  password: secret
  moveEnabled: true
",
        );
        let config = CantusConfig::load(file.path()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = CantusConfig::load(Path::new("/nonexistent/cantus.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("registry: [not, a, map]\n");
        assert!(CantusConfig::load(file.path()).is_err());
    }
}
