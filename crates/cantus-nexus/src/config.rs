//! Configuration types for the Nexus client.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cantus_core::{CantusError, Result};
use url::Url;

/// Default cap on the number of search pages followed for one listing.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Default per-request timeout for Nexus calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Nexus connection settings.
#[derive(Debug, Clone)]
pub struct NexusConfig {
    /// Base URL used for searches.
    pub read_url: String,

    /// Base URL used for staging moves.
    pub write_url: Option<String>,

    /// Credentials for staging moves.
    pub credentials: Option<NexusCredentials>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Maximum number of pages followed by a version listing.
    pub max_pages: usize,

    /// Whether staging moves are offered at all.
    pub move_enabled: bool,
}

impl NexusConfig {
    /// Creates a read-only configuration for the given search URL.
    pub fn new(read_url: impl Into<String>) -> Self {
        Self {
            read_url: read_url.into(),
            write_url: None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            max_pages: DEFAULT_MAX_PAGES,
            move_enabled: false,
        }
    }

    /// Sets the URL used for staging moves.
    #[must_use]
    pub fn with_write_url(mut self, write_url: impl Into<String>) -> Self {
        self.write_url = Some(write_url.into());
        self
    }

    /// Sets the move credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: NexusCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the page cap for version listings.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Enables or disables staging moves.
    #[must_use]
    pub const fn with_move_enabled(mut self, enabled: bool) -> Self {
        self.move_enabled = enabled;
        self
    }

    /// Returns true if moves are enabled and everything they need is present.
    #[must_use]
    pub const fn move_configured(&self) -> bool {
        self.move_enabled && self.write_url.is_some() && self.credentials.is_some()
    }

    /// Checks that the configured URLs parse.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending URL.
    pub fn validate(&self) -> Result<()> {
        parse_base(&self.read_url)?;
        if let Some(write_url) = &self.write_url {
            parse_base(write_url)?;
        }
        if self.max_pages == 0 {
            return Err(CantusError::validation("max_pages must be at least 1"));
        }
        Ok(())
    }
}

/// Username and password for the Nexus staging API.
#[derive(Clone, PartialEq, Eq)]
pub struct NexusCredentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl NexusCredentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn basic_auth_header(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for NexusCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NexusCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parses a base URL and joins `path` onto it, keeping any base path.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url> {
    let base = parse_base(base)?;
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| CantusError::validation(format!("invalid Nexus URL '{joined}': {e}")))
}

fn parse_base(base: &str) -> Result<Url> {
    let url = Url::parse(base)
        .map_err(|e| CantusError::validation(format!("invalid Nexus URL '{base}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(CantusError::validation(format!("invalid Nexus URL '{base}'")));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NexusConfig::new("https://nexus.example.com");
        assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
        assert!(!config.move_enabled);
        assert!(!config.move_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_move_configured_requires_everything() {
        let config = NexusConfig::new("https://nexus.example.com").with_move_enabled(true);
        assert!(!config.move_configured());

        let config = config.with_write_url("https://nexus-write.example.com");
        assert!(!config.move_configured());

        let config = config.with_credentials(NexusCredentials::new("mover", "secret"));
        assert!(config.move_configured());
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(NexusConfig::new("not a url").validate().is_err());
        assert!(NexusConfig::new("https://nexus.example.com")
            .with_write_url("::")
            .validate()
            .is_err());
        assert!(NexusConfig::new("https://nexus.example.com")
            .with_max_pages(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = endpoint("https://example.com/nexus/", "service/rest/v1/search").unwrap();
        assert_eq!(url.as_str(), "https://example.com/nexus/service/rest/v1/search");

        let url = endpoint("https://example.com", "service/rest/v1/search").unwrap();
        assert_eq!(url.as_str(), "https://example.com/service/rest/v1/search");
    }

    #[test]
    fn test_basic_auth_header() {
        let credentials = NexusCredentials::new("Aladdin", "open sesame");
        assert_eq!(
            credentials.basic_auth_header(),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", NexusCredentials::new("mover", "secret"));
        assert!(debug.contains("mover"));
        assert!(!debug.contains("secret"));
    }
}
