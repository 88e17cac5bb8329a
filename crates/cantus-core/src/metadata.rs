//! Registry metadata: which scheme and authentication a registry host uses.

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;

/// URL scheme used to reach a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiScheme {
    /// Plain HTTP, used for cluster-internal registries.
    Http,
    /// HTTPS.
    Https,
}

impl ApiScheme {
    /// Returns the scheme as used in URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for ApiScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How requests to a registry are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationMethod {
    /// Anonymous access.
    None,
    /// The caller's cluster-issued bearer token is forwarded.
    BearerToken,
}

/// Derived, immutable facts about a registry host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryMetadata {
    /// Host (and optional port) of the registry.
    pub registry_host: String,
    /// Scheme used to reach it.
    pub api_scheme: ApiScheme,
    /// Authentication applied to requests.
    pub authentication_method: AuthenticationMethod,
    /// Whether the host is in the internal registry list.
    pub is_internal: bool,
}

impl RegistryMetadata {
    /// Metadata for a cluster-internal registry.
    #[must_use]
    pub fn internal(registry_host: impl Into<String>) -> Self {
        Self {
            registry_host: registry_host.into(),
            api_scheme: ApiScheme::Http,
            authentication_method: AuthenticationMethod::BearerToken,
            is_internal: true,
        }
    }

    /// Metadata for an external registry.
    #[must_use]
    pub fn external(registry_host: impl Into<String>) -> Self {
        Self {
            registry_host: registry_host.into(),
            api_scheme: ApiScheme::Https,
            authentication_method: AuthenticationMethod::None,
            is_internal: false,
        }
    }

    /// Returns the base URL of the registry, e.g. `https://docker.example.com`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.api_scheme, self.registry_host)
    }
}

/// Maps registry hosts to [`RegistryMetadata`] using the internal host list.
///
/// The mapping never performs I/O. Results are memoised per host.
#[derive(Debug, Default)]
pub struct RegistryMetadataResolver {
    internal: HashSet<String>,
    cache: RwLock<HashMap<String, RegistryMetadata>>,
}

impl RegistryMetadataResolver {
    /// Creates a resolver treating `internal_registries` as internal.
    pub fn new<I, S>(internal_registries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            internal: internal_registries.into_iter().map(Into::into).collect(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the metadata for `registry_host`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cantus_core::{ApiScheme, AuthenticationMethod, RegistryMetadataResolver};
    ///
    /// let resolver = RegistryMetadataResolver::new(["docker-registry.default.svc:5000"]);
    ///
    /// let internal = resolver.resolve("docker-registry.default.svc:5000");
    /// assert_eq!(internal.api_scheme, ApiScheme::Http);
    /// assert_eq!(internal.authentication_method, AuthenticationMethod::BearerToken);
    ///
    /// let external = resolver.resolve("docker.example.com");
    /// assert_eq!(external.api_scheme, ApiScheme::Https);
    /// ```
    pub fn resolve(&self, registry_host: &str) -> RegistryMetadata {
        if let Some(metadata) = self.cache.read().get(registry_host) {
            return metadata.clone();
        }

        let metadata = if self.internal.contains(registry_host) {
            RegistryMetadata::internal(registry_host)
        } else {
            RegistryMetadata::external(registry_host)
        };

        self.cache
            .write()
            .entry(registry_host.to_string())
            .or_insert(metadata)
            .clone()
    }
}
