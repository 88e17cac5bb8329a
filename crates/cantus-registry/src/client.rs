//! Docker Registry HTTP API V2 client.
//!
//! Every operation takes a [`RepositoryLocator`], which decides the registry,
//! the scheme and whether the caller's token is forwarded.

use cantus_core::{
    AuthenticationMethod, BatchOutcome, CantusError, RepositoryLocator, Result,
};
use futures::future::join_all;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};

use crate::config::RegistryClientConfig;
use crate::manifest::{
    ImageDetails, ManifestResponse, MediaType, TagList, DIGEST_HEADER, UPLOAD_UUID_HEADER,
};
use crate::retry::with_retry;

/// Client for Docker Registry V2 compatible registries.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    config: RegistryClientConfig,
    http: reqwest::Client,
}

impl RegistryClient {
    /// Creates a new registry client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cantus_registry::{RegistryClient, RegistryClientConfig};
    ///
    /// let client = RegistryClient::new(RegistryClientConfig::default())?;
    /// # Ok::<(), cantus_core::CantusError>(())
    /// ```
    pub fn new(config: RegistryClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| CantusError::unknown("cantus-registry", e))?;

        Ok(Self { config, http })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryClientConfig {
        &self.config
    }

    /// Fetches the schema 2 manifest for the locator's tag.
    ///
    /// # Errors
    ///
    /// Fails with a protocol violation if the registry answers with any
    /// content type other than [`MediaType::MANIFEST_V2`] or without a
    /// `Docker-Content-Digest` header, and with a classified upstream error
    /// for 4xx/5xx responses. Transient failures are retried.
    pub async fn get_manifest(&self, locator: &RepositoryLocator) -> Result<ManifestResponse> {
        let tag = locator.require_tag()?;
        let url = Self::url(locator, &format!("manifests/{tag}"));
        let url = url.as_str();

        with_retry(&self.config.retry, "get_manifest", locator.registry_host(), move || {
            self.fetch_manifest(locator, url)
        })
        .await
    }

    async fn fetch_manifest(
        &self,
        locator: &RepositoryLocator,
        url: &str,
    ) -> Result<ManifestResponse> {
        let registry = locator.registry_host();
        let response = self
            .send(
                self.request(Method::GET, locator, url)
                    .header(ACCEPT, MediaType::MANIFEST_V2),
                registry,
            )
            .await?;
        let response = Self::check(response, registry).await?;

        let content_type = header(&response, CONTENT_TYPE.as_str());
        if content_type.as_deref() != Some(MediaType::MANIFEST_V2) {
            tracing::warn!(
                registry,
                repository = %locator.default_repo_path(),
                content_type = content_type.as_deref().unwrap_or("<none>"),
                "Registry returned unsupported manifest format"
            );
            return Err(CantusError::protocol(
                format!(
                    "unsupported manifest format '{}', only {} is accepted",
                    content_type.unwrap_or_default(),
                    MediaType::MANIFEST_V2
                ),
                registry,
            ));
        }

        let digest = header(&response, DIGEST_HEADER).ok_or_else(|| {
            CantusError::protocol(format!("response is missing the {DIGEST_HEADER} header"), registry)
        })?;

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CantusError::from_transport(e, registry))?;
        let body = if bytes.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&bytes).map_err(|e| {
                CantusError::protocol(format!("malformed manifest body: {e}"), registry)
            })?)
        };

        Ok(ManifestResponse {
            content_type: MediaType::MANIFEST_V2.to_string(),
            digest,
            body,
            headers,
        })
    }

    /// Lists all tags of the locator's repository.
    ///
    /// An empty body, or a body whose `tags` is null, yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a classified upstream error for 4xx/5xx responses.
    pub async fn get_tags(&self, locator: &RepositoryLocator) -> Result<Vec<String>> {
        let registry = locator.registry_host();
        let url = Self::url(locator, "tags/list");

        let response = self
            .send(self.request(Method::GET, locator, &url), registry)
            .await?;
        let response = Self::check(response, registry).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CantusError::from_transport(e, registry))?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let list: TagList =
            serde_json::from_slice(&bytes).map_err(|e| CantusError::unknown(registry, e))?;
        Ok(list.tags.unwrap_or_default())
    }

    /// Checks whether a blob exists.
    ///
    /// # Errors
    ///
    /// A 404 is `Ok(false)`; any other non-2xx status is an error.
    pub async fn blob_exists(&self, locator: &RepositoryLocator, digest: &str) -> Result<bool> {
        let registry = locator.registry_host();
        let url = Self::url(locator, &format!("blobs/{digest}"));
        let url = url.as_str();

        with_retry(&self.config.retry, "blob_exists", registry, move || async move {
            let response = self
                .send(self.request(Method::HEAD, locator, url), registry)
                .await?;

            if response.status() == StatusCode::NOT_FOUND {
                return Ok(false);
            }
            Self::check(response, registry).await.map(|_| true)
        })
        .await
    }

    /// Downloads a blob.
    ///
    /// # Errors
    ///
    /// Returns a classified upstream error for 4xx/5xx responses.
    pub async fn get_blob(&self, locator: &RepositoryLocator, digest: &str) -> Result<Vec<u8>> {
        let registry = locator.registry_host();
        let url = Self::url(locator, &format!("blobs/{digest}"));
        let url = url.as_str();

        with_retry(&self.config.retry, "get_blob", registry, move || async move {
            let response = self
                .send(self.request(Method::GET, locator, url), registry)
                .await?;
            let response = Self::check(response, registry).await?;

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| CantusError::from_transport(e, registry))
        })
        .await
    }

    /// Downloads and parses an image config blob.
    ///
    /// # Errors
    ///
    /// Fails like [`RegistryClient::get_blob`], and with a protocol violation
    /// if the blob is empty or not JSON.
    pub async fn get_config(
        &self,
        locator: &RepositoryLocator,
        digest: &str,
    ) -> Result<serde_json::Value> {
        let registry = locator.registry_host();
        let bytes = self.get_blob(locator, digest).await?;

        if bytes.is_empty() {
            return Err(CantusError::protocol(
                format!("config blob {digest} is empty"),
                registry,
            ));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            CantusError::protocol(format!("config blob {digest} is not JSON: {e}"), registry)
        })
    }

    /// Fetches the manifest and config of the locator's tag and extracts
    /// build information.
    ///
    /// # Errors
    ///
    /// Fails like [`RegistryClient::get_manifest`] and
    /// [`RegistryClient::get_config`].
    pub async fn get_image_details(&self, locator: &RepositoryLocator) -> Result<ImageDetails> {
        let response = self.get_manifest(locator).await?;
        let manifest = response.manifest(locator.registry_host())?;
        let config = self.get_config(locator, &manifest.config.digest).await?;

        Ok(ImageDetails::from_parts(&response.digest, &manifest, &config))
    }

    /// Starts a blob upload session and returns its id.
    ///
    /// # Errors
    ///
    /// Fails with a protocol violation if the response has no
    /// `Docker-Upload-UUID` header, even when the status is 2xx.
    pub async fn initiate_upload(&self, locator: &RepositoryLocator) -> Result<String> {
        let registry = locator.registry_host();
        let url = Self::url(locator, "blobs/uploads/");
        let url = url.as_str();

        with_retry(&self.config.retry, "initiate_upload", registry, move || async move {
            let response = self
                .send(self.request(Method::POST, locator, url), registry)
                .await?;
            let response = Self::check(response, registry).await?;

            header(&response, UPLOAD_UUID_HEADER).ok_or_else(|| {
                CantusError::protocol(
                    format!("response is missing the {UPLOAD_UUID_HEADER} header"),
                    registry,
                )
            })
        })
        .await
    }

    /// Completes an upload session with the whole layer in one request.
    ///
    /// Returns `true` if the registry created the blob (201).
    ///
    /// # Errors
    ///
    /// Returns a classified upstream error for 4xx/5xx responses.
    pub async fn upload_layer(
        &self,
        locator: &RepositoryLocator,
        session_id: &str,
        digest: &str,
        data: &[u8],
    ) -> Result<bool> {
        let registry = locator.registry_host();
        let url = format!(
            "{}?digest={digest}",
            Self::url(locator, &format!("blobs/uploads/{session_id}"))
        );
        let url = url.as_str();

        with_retry(&self.config.retry, "upload_layer", registry, move || async move {
            let response = self
                .send(
                    self.request(Method::PUT, locator, url)
                        .header(CONTENT_TYPE, MediaType::OCTET_STREAM)
                        .body(data.to_vec()),
                    registry,
                )
                .await?;
            let response = Self::check(response, registry).await?;
            Ok(Self::created(&response, locator, "upload_layer"))
        })
        .await
    }

    /// Pushes a manifest for the locator's tag.
    ///
    /// Returns `true` if the registry created the manifest (201).
    ///
    /// # Errors
    ///
    /// Returns a classified upstream error for 4xx/5xx responses, or a
    /// validation error if the locator has no tag.
    pub async fn put_manifest(
        &self,
        locator: &RepositoryLocator,
        manifest: &[u8],
        content_type: &str,
    ) -> Result<bool> {
        let registry = locator.registry_host();
        let tag = locator.require_tag()?;
        let url = Self::url(locator, &format!("manifests/{tag}"));
        let url = url.as_str();

        with_retry(&self.config.retry, "put_manifest", registry, move || async move {
            let response = self
                .send(
                    self.request(Method::PUT, locator, url)
                        .header(CONTENT_TYPE, content_type)
                        .body(manifest.to_vec()),
                    registry,
                )
                .await?;
            let response = Self::check(response, registry).await?;
            Ok(Self::created(&response, locator, "put_manifest"))
        })
        .await
    }

    /// Fetches manifests for several locators concurrently.
    ///
    /// Each locator gets its own result; a failure never affects the others.
    pub async fn get_manifests(
        &self,
        locators: &[RepositoryLocator],
    ) -> BatchOutcome<ManifestResponse> {
        let results = join_all(locators.iter().map(move |locator| async move {
            (locator.to_string(), self.get_manifest(locator).await)
        }))
        .await;

        results.into_iter().collect()
    }

    /// Builds `{scheme}://{host}/v2/{namespace}/{name}/{path}`.
    fn url(locator: &RepositoryLocator, path: &str) -> String {
        format!(
            "{}/v2/{}/{path}",
            locator.metadata().base_url(),
            locator.default_repo_path()
        )
    }

    /// Creates a request, forwarding the caller token where the registry expects it.
    fn request(&self, method: Method, locator: &RepositoryLocator, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);

        match (locator.metadata().authentication_method, locator.caller_token()) {
            (AuthenticationMethod::BearerToken, Some(token)) => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, registry: &str) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| CantusError::from_transport(e, registry))
    }

    /// Passes 2xx responses through and classifies everything else.
    async fn check(response: Response, registry: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.ok().filter(|b| !b.is_empty());
        tracing::debug!(registry, status = status.as_u16(), "Registry returned an error");
        Err(CantusError::from_status(status.as_u16(), registry, body))
    }

    fn created(response: &Response, locator: &RepositoryLocator, operation: &str) -> bool {
        let created = response.status() == StatusCode::CREATED;
        if !created {
            tracing::warn!(
                registry = locator.registry_host(),
                repository = %locator.default_repo_path(),
                operation,
                status = response.status().as_u16(),
                "Registry accepted the request without creating the resource"
            );
        }
        created
    }
}

fn header(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
