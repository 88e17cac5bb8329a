//! Static registry settings consumed by the locator and metadata resolvers.

use serde::Deserialize;

/// Registry hosts known to the integration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    /// Registry used when a locator names no registry (e.g., "docker.example.com").
    pub default_registry: String,

    /// Hosts a caller may name explicitly.
    pub allowed_registries: Vec<String>,

    /// Cluster-internal hosts, reached over plain HTTP with the caller's token.
    pub internal_registries: Vec<String>,
}

impl RegistrySettings {
    /// Creates settings with the given default registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use cantus_core::RegistrySettings;
    ///
    /// let settings = RegistrySettings::new("docker.example.com")
    ///     .with_allowed_registry("docker.example.com")
    ///     .with_internal_registry("docker-registry.default.svc:5000");
    /// assert_eq!(settings.default_registry, "docker.example.com");
    /// ```
    #[must_use]
    pub fn new(default_registry: impl Into<String>) -> Self {
        Self {
            default_registry: default_registry.into(),
            allowed_registries: Vec::new(),
            internal_registries: Vec::new(),
        }
    }

    /// Adds a host callers may name explicitly.
    #[must_use]
    pub fn with_allowed_registry(mut self, host: impl Into<String>) -> Self {
        self.allowed_registries.push(host.into());
        self
    }

    /// Adds a cluster-internal host.
    #[must_use]
    pub fn with_internal_registry(mut self, host: impl Into<String>) -> Self {
        self.internal_registries.push(host.into());
        self
    }

    /// Returns true if `host` may be named explicitly by a caller.
    #[must_use]
    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed_registries.iter().any(|allowed| allowed == host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_allowed_is_exact() {
        let settings = RegistrySettings::new("default.example.com")
            .with_allowed_registry("docker.example.com");

        assert!(settings.is_allowed("docker.example.com"));
        assert!(!settings.is_allowed("docker.example.com:443"));
        assert!(!settings.is_allowed("default.example.com"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "defaultRegistry": "docker.example.com",
            "allowedRegistries": ["docker.example.com", "other.example.com"],
            "internalRegistries": ["docker-registry.default.svc:5000"]
        }"#;
        let settings: RegistrySettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.allowed_registries.len(), 2);
        assert_eq!(
            settings.internal_registries,
            vec!["docker-registry.default.svc:5000".to_string()]
        );
    }
}
