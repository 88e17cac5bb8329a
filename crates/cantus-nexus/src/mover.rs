//! Move orchestration: find exactly one image, move it, reconcile the reply.

use std::sync::Arc;

use async_trait::async_trait;
use cantus_core::{CantusError, Result, NEXUS_SOURCE};

use crate::client::NexusApi;
use crate::config::NexusConfig;
use crate::types::{ImageRef, MoveReply, MoveRequest, MoveResponse, MoveOutcome, NexusItem};

/// Name reported by [`CantusError::IntegrationDisabled`] for moves.
pub const MOVE_INTEGRATION: &str = "Nexus move";

/// Moves images between Nexus repositories.
#[async_trait]
pub trait MoveService: Send + Sync {
    /// Finds the one component matching all four fields.
    async fn get_single_image(
        &self,
        repository: &str,
        name: &str,
        version: &str,
        sha256: &str,
    ) -> Result<NexusItem>;

    /// Looks the image up, moves it and reports the result.
    async fn move_image(&self, request: &MoveRequest) -> Result<MoveOutcome>;
}

/// Picks the move implementation for `config`.
///
/// Returns the Nexus-backed service when moves are enabled and a write URL
/// and credentials are configured, and [`DisabledMoveService`] otherwise.
pub fn move_service(config: &NexusConfig, api: Arc<dyn NexusApi>) -> Arc<dyn MoveService> {
    if config.move_configured() {
        Arc::new(NexusMoveService::new(api))
    } else {
        if config.move_enabled {
            tracing::warn!("Nexus move is enabled but write URL or credentials are missing");
        }
        Arc::new(DisabledMoveService)
    }
}

/// [`MoveService`] backed by the Nexus staging API.
pub struct NexusMoveService {
    api: Arc<dyn NexusApi>,
}

impl NexusMoveService {
    /// Creates a move service over `api`.
    pub fn new(api: Arc<dyn NexusApi>) -> Self {
        Self { api }
    }

    fn reconcile(request: &MoveRequest, reply: MoveReply) -> Result<MoveOutcome> {
        let parsed: Option<MoveResponse> = serde_json::from_str(&reply.body).ok();

        if !reply.is_success() {
            let message = parsed
                .and_then(|r| r.message)
                .or_else(|| Some(reply.body.trim().to_string()).filter(|b| !b.is_empty()))
                .unwrap_or_else(|| {
                    CantusError::from_status(reply.status, NEXUS_SOURCE, None).message()
                });

            tracing::warn!(
                name = %request.name,
                version = %request.version,
                status = reply.status,
                message = %message,
                "Nexus refused move"
            );
            return Ok(MoveOutcome {
                success: false,
                message,
                status: Some(reply.status),
                resulting_image: None,
            });
        }

        let response = parsed.ok_or_else(|| {
            CantusError::protocol("move response is not a valid move document", NEXUS_SOURCE)
        })?;
        let data = response.data.unwrap_or_default();
        let moved = data.components_moved.into_iter().next().ok_or_else(|| {
            CantusError::protocol("move response lists no moved components", NEXUS_SOURCE)
        })?;

        tracing::info!(
            name = %moved.name,
            version = %moved.version,
            from = %request.from_repository,
            to = %data.destination,
            "Moved image"
        );

        Ok(MoveOutcome {
            success: true,
            message: response.message.unwrap_or_default(),
            status: Some(reply.status),
            resulting_image: Some(ImageRef {
                repository: data.destination,
                name: moved.name,
                version: moved.version,
                sha256: None,
            }),
        })
    }
}

#[async_trait]
impl MoveService for NexusMoveService {
    async fn get_single_image(
        &self,
        repository: &str,
        name: &str,
        version: &str,
        sha256: &str,
    ) -> Result<NexusItem> {
        let page = self
            .api
            .search(repository, name, Some(version), Some(sha256))
            .await?;

        let mut items = page.items.into_iter();
        match (items.next(), items.next()) {
            (Some(item), None) => Ok(item),
            (None, _) => Err(CantusError::protocol(
                format!("no matching image found for {name}:{version} in {repository}"),
                NEXUS_SOURCE,
            )),
            (Some(_), Some(_)) => Err(CantusError::protocol(
                format!("too many matches, expected exactly one for {name}:{version} in {repository}"),
                NEXUS_SOURCE,
            )),
        }
    }

    async fn move_image(&self, request: &MoveRequest) -> Result<MoveOutcome> {
        request.validate()?;

        let image = self
            .get_single_image(
                &request.from_repository,
                &request.name,
                &request.version,
                &request.sha256,
            )
            .await?;

        let sha256 = image
            .assets
            .first()
            .and_then(|asset| asset.checksum.get("sha256"))
            .map_or(request.sha256.as_str(), String::as_str);

        let reply = self
            .api
            .move_component(
                &image.repository,
                &request.to_repository,
                &image.name,
                &image.version,
                sha256,
            )
            .await?;

        Self::reconcile(request, reply)
    }
}

/// [`MoveService`] used when moves are not configured.
///
/// Every call fails with [`CantusError::IntegrationDisabled`] without
/// touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMoveService;

#[async_trait]
impl MoveService for DisabledMoveService {
    async fn get_single_image(
        &self,
        _repository: &str,
        _name: &str,
        _version: &str,
        _sha256: &str,
    ) -> Result<NexusItem> {
        Err(CantusError::disabled(MOVE_INTEGRATION))
    }

    async fn move_image(&self, _request: &MoveRequest) -> Result<MoveOutcome> {
        Err(CantusError::disabled(MOVE_INTEGRATION))
    }
}
