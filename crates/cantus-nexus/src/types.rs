//! Nexus REST API documents and the values derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a Nexus search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NexusPage {
    /// Components on this page, in server order.
    #[serde(default)]
    pub items: Vec<NexusItem>,

    /// Cursor for the next page; absent on the last page.
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// A component returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NexusItem {
    /// Component id.
    #[serde(default)]
    pub id: String,

    /// Repository holding the component.
    #[serde(default)]
    pub repository: String,

    /// Image name, `namespace/name`.
    pub name: String,

    /// Image tag.
    pub version: String,

    /// Assets of the component.
    #[serde(default)]
    pub assets: Vec<NexusAsset>,
}

/// An asset of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NexusAsset {
    /// Checksums by algorithm.
    #[serde(default)]
    pub checksum: BTreeMap<String, String>,

    /// Last modification time as sent by Nexus.
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// A version of an image as listed by Nexus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVersion {
    /// The tag.
    pub name: String,

    /// Last modification of the first asset.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ImageVersion {
    /// Projects a search item onto its version and first asset timestamp.
    #[must_use]
    pub fn from_item(item: &NexusItem) -> Self {
        let last_modified = item
            .assets
            .first()
            .and_then(|asset| asset.last_modified.as_deref())
            .and_then(parse_timestamp);

        Self {
            name: item.version.clone(),
            last_modified,
        }
    }
}

/// Nexus writes `2020-03-03T13:37:27.016+0000`; RFC 3339 is accepted too.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value));

    match parsed {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(value, error = %e, "Unparseable lastModified");
            None
        }
    }
}

/// Raw answer to a staging move that was not a server error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReply {
    /// HTTP status.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl MoveReply {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Body of a staging move response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    /// Status reported inside the body.
    #[serde(default)]
    pub status: Option<u16>,

    /// Message from Nexus.
    #[serde(default)]
    pub message: Option<String>,

    /// Move details.
    #[serde(default)]
    pub data: Option<MoveData>,
}

/// `data` section of a staging move response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveData {
    /// Destination repository.
    #[serde(default)]
    pub destination: String,

    /// Components that were moved.
    #[serde(default)]
    pub components_moved: Vec<MovedComponent>,
}

/// One moved component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MovedComponent {
    /// Component name.
    pub name: String,
    /// Component version.
    pub version: String,
}

/// Image coordinates in a Nexus repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    /// Repository.
    pub repository: String,
    /// Image name.
    pub name: String,
    /// Tag.
    pub version: String,
    /// Checksum, when known. The move API does not return it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Result of a move request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    /// Whether the move happened.
    pub success: bool,

    /// Message from Nexus.
    pub message: String,

    /// Upstream status.
    pub status: Option<u16>,

    /// Where the image ended up; only set on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resulting_image: Option<ImageRef>,
}

/// Identifies the image to move and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Repository currently holding the image.
    pub from_repository: String,
    /// Destination repository.
    pub to_repository: String,
    /// Image name, `namespace/name`.
    pub name: String,
    /// Tag.
    pub version: String,
    /// Expected SHA-256 of the image.
    pub sha256: String,
}

impl MoveRequest {
    /// Creates a move request.
    pub fn new(
        from_repository: impl Into<String>,
        to_repository: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        sha256: impl Into<String>,
    ) -> Self {
        Self {
            from_repository: from_repository.into(),
            to_repository: to_repository.into(),
            name: name.into(),
            version: version.into(),
            sha256: sha256.into(),
        }
    }

    /// Rejects requests with blank fields.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first blank field.
    pub fn validate(&self) -> cantus_core::Result<()> {
        let fields = [
            ("fromRepository", &self.from_repository),
            ("toRepository", &self.to_repository),
            ("name", &self.name),
            ("version", &self.version),
            ("sha256", &self.sha256),
        ];

        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(cantus_core::CantusError::validation(format!(
                "malformed move request: {field} is required"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_page_deserialization() {
        let page: NexusPage = serde_json::from_str(
            r#"{
                "items": [{
                    "id": "bWF2ZW4tcmVsZWFzZXM6MWM",
                    "repository": "docker-snapshots",
                    "format": "docker",
                    "name": "aurora/console",
                    "version": "4.2.4",
                    "assets": [{
                        "downloadUrl": "https://nexus/repository/x",
                        "checksum": {"sha1": "abc", "sha256": "def"},
                        "lastModified": "2020-03-03T13:37:27.016+0000"
                    }]
                }],
                "continuationToken": "35d4d9a0"
            }"#,
        )
        .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.continuation_token.as_deref(), Some("35d4d9a0"));
        assert_eq!(page.items[0].assets[0].checksum["sha256"], "def");
    }

    #[test]
    fn test_last_page_has_no_token() {
        let page: NexusPage = serde_json::from_str(r#"{"items":[],"continuationToken":null}"#).unwrap();
        assert!(page.continuation_token.is_none());
    }

    #[test]
    fn test_image_version_projection() {
        let item = NexusItem {
            id: "1".to_string(),
            repository: "docker-snapshots".to_string(),
            name: "aurora/console".to_string(),
            version: "4.2.4".to_string(),
            assets: vec![
                NexusAsset {
                    checksum: BTreeMap::new(),
                    last_modified: Some("2020-03-03T13:37:27.016+0000".to_string()),
                },
                NexusAsset {
                    checksum: BTreeMap::new(),
                    last_modified: Some("2021-01-01T00:00:00.000+0000".to_string()),
                },
            ],
        };

        let version = ImageVersion::from_item(&item);
        assert_eq!(version.name, "4.2.4");
        assert_eq!(
            version.last_modified.unwrap().timestamp(),
            Utc.with_ymd_and_hms(2020, 3, 3, 13, 37, 27).unwrap().timestamp()
        );
    }

    #[test]
    fn test_image_version_without_assets() {
        let item = NexusItem {
            id: String::new(),
            repository: String::new(),
            name: "aurora/console".to_string(),
            version: "latest".to_string(),
            assets: Vec::new(),
        };
        assert!(ImageVersion::from_item(&item).last_modified.is_none());
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2020-03-03T13:37:27.016+0000").is_some());
        assert!(parse_timestamp("2020-03-03T13:37:27Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_move_response_deserialization() {
        let response: MoveResponse = serde_json::from_str(
            r#"{
                "status": 200,
                "message": "Move Successful",
                "data": {
                    "destination": "docker-release",
                    "componentsMoved": [{"name": "aurora/console", "group": null, "version": "4.2.4"}]
                }
            }"#,
        )
        .unwrap();

        let data = response.data.unwrap();
        assert_eq!(data.destination, "docker-release");
        assert_eq!(data.components_moved[0].version, "4.2.4");
    }

    #[test]
    fn test_move_request_validation() {
        let request = MoveRequest::new("from", "to", "aurora/console", "4.2.4", "abc");
        assert!(request.validate().is_ok());

        let request = MoveRequest::new("from", "to", "aurora/console", " ", "abc");
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind(), cantus_core::ErrorKind::Validation);
        assert!(err.to_string().contains("version"));
    }
}
