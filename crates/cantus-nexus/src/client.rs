//! Nexus search and staging move client.

use async_trait::async_trait;
use cantus_core::{CantusError, Result, NEXUS_SOURCE};
use reqwest::header::AUTHORIZATION;
use reqwest::Response;
use url::Url;

use crate::config::{endpoint, NexusConfig};
use crate::types::{MoveReply, NexusPage};

const SEARCH_PATH: &str = "service/rest/v1/search";
const MOVE_PATH: &str = "service/rest/v1/staging/move";

/// The Nexus operations Cantus depends on.
#[async_trait]
pub trait NexusApi: Send + Sync {
    /// Runs a single-page search for docker components.
    async fn search(
        &self,
        repository: &str,
        name: &str,
        version: Option<&str>,
        sha256: Option<&str>,
    ) -> Result<NexusPage>;

    /// Fetches one page of the versions of `namespace/name`.
    async fn search_versions(
        &self,
        namespace: &str,
        name: &str,
        repository: &str,
        continuation_token: Option<&str>,
    ) -> Result<NexusPage>;

    /// Issues a staging move.
    ///
    /// Server errors are returned as classified failures carrying the body;
    /// every other status is handed back for the caller to interpret.
    async fn move_component(
        &self,
        from_repository: &str,
        to_repository: &str,
        name: &str,
        version: &str,
        sha256: &str,
    ) -> Result<MoveReply>;
}

/// HTTP implementation of [`NexusApi`].
#[derive(Debug, Clone)]
pub struct NexusClient {
    config: NexusConfig,
    http: reqwest::Client,
}

impl NexusClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: NexusConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("cantus-nexus/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CantusError::unknown(NEXUS_SOURCE, e))?;

        Ok(Self { config, http })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &NexusConfig {
        &self.config
    }

    fn search_url(&self, params: &[(&str, Option<&str>)]) -> Result<Url> {
        let mut url = endpoint(&self.config.read_url, SEARCH_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                if let Some(value) = value {
                    query.append_pair(key, value);
                }
            }
        }
        Ok(url)
    }

    async fn get_page(&self, url: Url) -> Result<NexusPage> {
        tracing::debug!(url = %url, "Searching Nexus");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CantusError::from_transport(e, NEXUS_SOURCE))?;

        let status = response.status();
        let body = body_text(response).await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Nexus search failed");
            return Err(CantusError::from_status(
                status.as_u16(),
                NEXUS_SOURCE,
                Some(body).filter(|b| !b.is_empty()),
            ));
        }

        if body.trim().is_empty() {
            return Ok(NexusPage::default());
        }
        serde_json::from_str(&body).map_err(|e| CantusError::unknown(NEXUS_SOURCE, e))
    }
}

#[async_trait]
impl NexusApi for NexusClient {
    async fn search(
        &self,
        repository: &str,
        name: &str,
        version: Option<&str>,
        sha256: Option<&str>,
    ) -> Result<NexusPage> {
        let url = self.search_url(&[
            ("name", Some(name)),
            ("sort", Some("version")),
            ("repository", Some(repository)),
            ("version", version),
            ("sha256", sha256),
            ("format", Some("docker")),
        ])?;
        self.get_page(url).await
    }

    async fn search_versions(
        &self,
        namespace: &str,
        name: &str,
        repository: &str,
        continuation_token: Option<&str>,
    ) -> Result<NexusPage> {
        let image = format!("{namespace}/{name}");
        let url = self.search_url(&[
            ("name", Some(image.as_str())),
            ("sort", Some("version")),
            ("repository", Some(repository)),
            ("continuationToken", continuation_token),
            ("format", Some("docker")),
        ])?;
        self.get_page(url).await
    }

    async fn move_component(
        &self,
        from_repository: &str,
        to_repository: &str,
        name: &str,
        version: &str,
        sha256: &str,
    ) -> Result<MoveReply> {
        let (Some(write_url), Some(credentials)) =
            (self.config.write_url.as_deref(), self.config.credentials.as_ref())
        else {
            return Err(CantusError::disabled("Nexus move"));
        };

        let mut url = endpoint(write_url, &format!("{MOVE_PATH}/{to_repository}"))?;
        url.query_pairs_mut()
            .append_pair("repository", from_repository)
            .append_pair("name", name)
            .append_pair("version", version)
            .append_pair("sha256", sha256)
            .append_pair("format", "docker");

        tracing::debug!(url = %url, "Moving component in Nexus");

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, credentials.basic_auth_header())
            .send()
            .await
            .map_err(|e| CantusError::from_transport(e, NEXUS_SOURCE))?;

        let status = response.status();
        let body = body_text(response).await?;

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), body = %body, "Nexus move failed");
            return Err(CantusError::from_status(
                status.as_u16(),
                NEXUS_SOURCE,
                Some(body).filter(|b| !b.is_empty()),
            ));
        }

        Ok(MoveReply {
            status: status.as_u16(),
            body,
        })
    }
}

async fn body_text(response: Response) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| CantusError::from_transport(e, NEXUS_SOURCE))
}
