//! Image locators: `registry/namespace/name[/tag]` strings resolved into a
//! validated, registry-aware [`RepositoryLocator`].

use std::fmt;

use crate::batch::BatchOutcome;
use crate::config::RegistrySettings;
use crate::error::{CantusError, Result};
use crate::metadata::{ApiScheme, RegistryMetadata, RegistryMetadataResolver};

/// A validated reference to an image repository, optionally at a tag.
///
/// Created per request and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    metadata: RegistryMetadata,
    namespace: String,
    image_name: String,
    image_tag: Option<String>,
    caller_token: Option<String>,
}

impl RepositoryLocator {
    /// Returns the registry metadata this locator resolved to.
    #[must_use]
    pub const fn metadata(&self) -> &RegistryMetadata {
        &self.metadata
    }

    /// Returns the registry host.
    #[must_use]
    pub fn registry_host(&self) -> &str {
        &self.metadata.registry_host
    }

    /// Returns the scheme used to reach the registry.
    #[must_use]
    pub const fn api_scheme(&self) -> ApiScheme {
        self.metadata.api_scheme
    }

    /// Returns the image namespace (also called the image group).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the image name.
    #[must_use]
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Returns the tag, if the locator named one.
    #[must_use]
    pub fn image_tag(&self) -> Option<&str> {
        self.image_tag.as_deref()
    }

    /// Returns the caller's bearer token, passed through unchanged.
    #[must_use]
    pub fn caller_token(&self) -> Option<&str> {
        self.caller_token.as_deref()
    }

    /// Returns the tag or fails with a validation error if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CantusError::Validation`] when the locator has no tag.
    pub fn require_tag(&self) -> Result<&str> {
        self.image_tag().ok_or_else(|| {
            CantusError::validation(format!(
                "image tag is required for {}",
                self.default_repo_path()
            ))
        })
    }

    /// Returns `namespace/name`.
    #[must_use]
    pub fn default_repo_path(&self) -> String {
        format!("{}/{}", self.namespace, self.image_name)
    }

    /// Returns `namespace/name/tag`, or `None` when the locator has no tag.
    #[must_use]
    pub fn manifest_repo_path(&self) -> Option<String> {
        self.image_tag
            .as_ref()
            .map(|tag| format!("{}/{}/{tag}", self.namespace, self.image_name))
    }

    /// Returns a copy of this locator pointing at another tag.
    #[must_use]
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            image_tag: Some(tag.into()),
            ..self.clone()
        }
    }
}

// The caller token must never end up in logs.
impl fmt::Debug for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryLocator")
            .field("registry_host", &self.metadata.registry_host)
            .field("api_scheme", &self.metadata.api_scheme)
            .field("namespace", &self.namespace)
            .field("image_name", &self.image_name)
            .field("image_tag", &self.image_tag)
            .field("caller_token", &self.caller_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry_host(), self.default_repo_path())?;
        if let Some(tag) = &self.image_tag {
            write!(f, ":{tag}")?;
        }
        Ok(())
    }
}

/// Parses and validates locator strings against the registry settings.
#[derive(Debug)]
pub struct LocatorResolver {
    settings: RegistrySettings,
    metadata: RegistryMetadataResolver,
}

impl LocatorResolver {
    /// Creates a resolver for the given settings.
    #[must_use]
    pub fn new(settings: RegistrySettings) -> Self {
        let metadata = RegistryMetadataResolver::new(settings.internal_registries.iter().cloned());
        Self { settings, metadata }
    }

    /// Returns the settings this resolver validates against.
    #[must_use]
    pub const fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Resolves a `registry-or-empty/namespace/name[/tag]` string.
    ///
    /// An empty first segment selects the default registry. A non-empty one
    /// must be on the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`CantusError::Validation`] if the string does not have 3 or 4
    /// segments, if namespace, name or tag is empty, or if the registry is not
    /// allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use cantus_core::{LocatorResolver, RegistrySettings};
    ///
    /// let resolver = LocatorResolver::new(RegistrySettings::new("docker.example.com"));
    /// let locator = resolver.resolve("/aurora/console/4.2.1", None).unwrap();
    ///
    /// assert_eq!(locator.registry_host(), "docker.example.com");
    /// assert_eq!(locator.manifest_repo_path().as_deref(), Some("aurora/console/4.2.1"));
    /// ```
    pub fn resolve(&self, locator: &str, caller_token: Option<&str>) -> Result<RepositoryLocator> {
        self.resolve_with_registry(locator, caller_token, None)
    }

    /// Resolves a locator string, with an explicit registry override.
    ///
    /// A non-empty `registry_override` takes precedence over the locator's
    /// first segment, which is then ignored without being checked. The override
    /// is validated against the allow-list the same way.
    ///
    /// # Errors
    ///
    /// Same as [`LocatorResolver::resolve`].
    pub fn resolve_with_registry(
        &self,
        locator: &str,
        caller_token: Option<&str>,
        registry_override: Option<&str>,
    ) -> Result<RepositoryLocator> {
        let segments: Vec<&str> = locator.split('/').collect();

        let (registry, namespace, image_name, image_tag) = match segments.as_slice() {
            [registry, namespace, name] => (*registry, *namespace, *name, None),
            [registry, namespace, name, tag] => (*registry, *namespace, *name, Some(*tag)),
            _ => {
                return Err(CantusError::validation(format!(
                    "invalid locator '{locator}': expected registry/namespace/name[/tag]"
                )))
            }
        };

        if namespace.is_empty() || image_name.is_empty() {
            return Err(CantusError::validation(format!(
                "invalid locator '{locator}': namespace and name must not be empty"
            )));
        }

        if image_tag.is_some_and(str::is_empty) {
            return Err(CantusError::validation(format!(
                "invalid locator '{locator}': tag must not be empty"
            )));
        }

        let requested = registry_override
            .filter(|r| !r.is_empty())
            .or_else(|| Some(registry).filter(|r| !r.is_empty()));

        let registry_host = match requested {
            Some(host) if self.settings.is_allowed(host) => host,
            Some(host) => {
                tracing::debug!(registry = host, "Rejected registry override");
                return Err(CantusError::validation(format!(
                    "invalid registry URL '{host}'"
                )));
            }
            None => self.settings.default_registry.as_str(),
        };

        Ok(RepositoryLocator {
            metadata: self.metadata.resolve(registry_host),
            namespace: namespace.to_string(),
            image_name: image_name.to_string(),
            image_tag: image_tag.map(str::to_string),
            caller_token: caller_token.map(str::to_string),
        })
    }

    /// Resolves several locator strings, keeping each failure with its input.
    pub fn resolve_all<'a, I>(&self, locators: I, caller_token: Option<&str>) -> BatchOutcome<RepositoryLocator>
    where
        I: IntoIterator<Item = &'a str>,
    {
        locators
            .into_iter()
            .map(|locator| (locator.to_string(), self.resolve(locator, caller_token)))
            .collect()
    }
}
