//! Looks up the user and groups behind a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use cantus_core::{CantusError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Source system name for failures raised by the cluster API.
pub const OPENSHIFT_SOURCE: &str = "OpenShift";

const CURRENT_USER_PATH: &str = "apis/user.openshift.io/v1/users/~";

/// A user and the groups it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroups {
    /// User name.
    pub username: String,
    /// Group names.
    pub groups: Vec<String>,
}

impl UserGroups {
    /// Returns true if the user is a member of `group`.
    #[must_use]
    pub fn is_member(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Resolves a caller token to its user and groups.
#[async_trait]
pub trait GroupResolver: Send + Sync {
    /// Looks up the user the token belongs to.
    async fn resolve(&self, token: &str) -> Result<UserGroups>;
}

#[derive(Debug, Deserialize)]
struct OpenShiftUser {
    metadata: OpenShiftMetadata,
    #[serde(default)]
    groups: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OpenShiftMetadata {
    name: String,
}

/// [`GroupResolver`] asking the OpenShift user API who the token belongs to.
#[derive(Debug, Clone)]
pub struct OpenShiftGroupResolver {
    api_url: String,
    http: reqwest::Client,
}

impl OpenShiftGroupResolver {
    /// Creates a resolver for the cluster API at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CantusError::unknown(OPENSHIFT_SOURCE, e))?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self) -> String {
        format!("{}/{CURRENT_USER_PATH}", self.api_url)
    }
}

#[async_trait]
impl GroupResolver for OpenShiftGroupResolver {
    async fn resolve(&self, token: &str) -> Result<UserGroups> {
        let response = self
            .http
            .get(self.url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CantusError::from_transport(e, OPENSHIFT_SOURCE))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CantusError::from_transport(e, OPENSHIFT_SOURCE))?;

        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "User lookup failed");
            return Err(CantusError::from_status(
                status.as_u16(),
                OPENSHIFT_SOURCE,
                Some(body).filter(|b| !b.is_empty()),
            ));
        }

        let user: OpenShiftUser = serde_json::from_str(&body).map_err(|e| {
            CantusError::protocol(format!("malformed user document: {e}"), OPENSHIFT_SOURCE)
        })?;

        Ok(UserGroups {
            username: user.metadata.name,
            groups: user.groups.unwrap_or_default(),
        })
    }
}
