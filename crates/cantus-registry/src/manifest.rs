//! Docker Registry V2 document types.
//!
//! Only schema 2 image manifests are understood. The manifest digest always
//! comes from the `Docker-Content-Digest` response header, never the body.

use std::collections::BTreeMap;

use cantus_core::{CantusError, Result};
use serde::{Deserialize, Serialize};

/// Media types and headers used by the registry API.
#[derive(Debug, Clone, Copy)]
pub struct MediaType;

impl MediaType {
    /// Docker image manifest, schema 2.
    pub const MANIFEST_V2: &'static str = "application/vnd.docker.distribution.manifest.v2+json";

    /// Legacy signed manifest, schema 1. Never accepted.
    pub const MANIFEST_V1_SIGNED: &'static str =
        "application/vnd.docker.distribution.manifest.v1+prettyjws";

    /// Container config blob.
    pub const CONTAINER_CONFIG: &'static str = "application/vnd.docker.container.image.v1+json";

    /// Raw blob upload body.
    pub const OCTET_STREAM: &'static str = "application/octet-stream";
}

/// Response header carrying the manifest digest.
pub const DIGEST_HEADER: &str = "Docker-Content-Digest";

/// Response header carrying the blob upload session id.
pub const UPLOAD_UUID_HEADER: &str = "Docker-Upload-UUID";

/// A fetched manifest with the headers the registry is required to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestResponse {
    /// Value of the `Content-Type` header; always [`MediaType::MANIFEST_V2`].
    pub content_type: String,
    /// Value of the `Docker-Content-Digest` header.
    pub digest: String,
    /// Parsed body, `None` when the registry sent no body.
    pub body: Option<serde_json::Value>,
    /// Every response header in the order received, names lowercased.
    /// Repeated headers appear once per value.
    pub headers: Vec<(String, String)>,
}

impl ManifestResponse {
    /// Returns the first value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns every value of header `name`, in the order received.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parses the body as a schema 2 manifest.
    ///
    /// # Errors
    ///
    /// Returns a protocol violation reported against `registry` if the body is
    /// missing, malformed or not schema version 2.
    pub fn manifest(&self, registry: &str) -> Result<ManifestV2> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| CantusError::protocol("manifest response has no body", registry))?;

        let manifest: ManifestV2 = serde_json::from_value(body.clone()).map_err(|e| {
            CantusError::protocol(format!("malformed v2 manifest: {e}"), registry)
        })?;

        if manifest.schema_version != 2 {
            return Err(CantusError::protocol(
                format!("unsupported manifest schema version {}", manifest.schema_version),
                registry,
            ));
        }

        Ok(manifest)
    }
}

/// Body of `GET /v2/{name}/tags/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TagList {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Schema 2 image manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV2 {
    /// Always 2.
    pub schema_version: u32,

    /// Manifest media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Config blob descriptor.
    pub config: Descriptor,

    /// Layer descriptors, base layer first.
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

/// Content descriptor inside a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced blob.
    pub media_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Content digest.
    pub digest: String,
}

/// Build information extracted from an image's manifest and config blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    /// Manifest digest.
    pub digest: String,
    /// Creation timestamp as written by the builder.
    pub created: Option<String>,
    /// Docker version used to build the image.
    pub docker_version: Option<String>,
    /// Target architecture.
    pub architecture: Option<String>,
    /// Number of layers in the manifest.
    pub layer_count: usize,
    /// `config.Env` entries.
    pub env: BTreeMap<String, String>,
}

impl ImageDetails {
    /// Builds details from a manifest and its parsed config blob.
    #[must_use]
    pub fn from_parts(digest: &str, manifest: &ManifestV2, config: &serde_json::Value) -> Self {
        let text = |key: &str| config.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let env = config
            .pointer("/config/Env")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.as_str()?.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            digest: digest.to_string(),
            created: text("created"),
            docker_version: text("docker_version"),
            architecture: text("architecture"),
            layer_count: manifest.layers.len(),
            env,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest_json() -> serde_json::Value {
        json!({
            "schemaVersion": 2,
            "mediaType": MediaType::MANIFEST_V2,
            "config": {
                "mediaType": MediaType::CONTAINER_CONFIG,
                "size": 7023,
                "digest": "sha256:b5b2b2c507a0944348e0303114d8d93aaaa081732b86451d9bce1f432a537bc7"
            },
            "layers": [
                {
                    "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                    "size": 32654,
                    "digest": "sha256:e692418e4cbaf90ca69d05a66403747baa33ee08806650b51fab815ad7fc331f"
                }
            ]
        })
    }

    #[test]
    fn test_parse_v2_manifest() {
        let response = ManifestResponse {
            content_type: MediaType::MANIFEST_V2.to_string(),
            digest: "sha256:abc".to_string(),
            body: Some(manifest_json()),
            headers: Vec::new(),
        };

        let manifest = response.manifest("r").unwrap();
        assert_eq!(manifest.layers.len(), 1);
        assert!(manifest.config.digest.starts_with("sha256:b5b2"));
    }

    #[test]
    fn test_schema_one_rejected() {
        let mut body = manifest_json();
        body["schemaVersion"] = json!(1);
        let response = ManifestResponse {
            content_type: MediaType::MANIFEST_V2.to_string(),
            digest: "sha256:abc".to_string(),
            body: Some(body),
            headers: Vec::new(),
        };

        let err = response.manifest("r").unwrap_err();
        assert_eq!(err.kind(), cantus_core::ErrorKind::ProtocolViolation);
    }

    #[test]
    fn test_missing_body_rejected() {
        let response = ManifestResponse {
            content_type: MediaType::MANIFEST_V2.to_string(),
            digest: "sha256:abc".to_string(),
            body: None,
            headers: Vec::new(),
        };
        assert!(response.manifest("r").is_err());
    }

    #[test]
    fn test_image_details_from_config() {
        let manifest: ManifestV2 = serde_json::from_value(manifest_json()).unwrap();
        let config = json!({
            "architecture": "amd64",
            "created": "2018-01-02T09:28:32.123Z",
            "docker_version": "1.13.1",
            "config": {
                "Env": [
                    "AURORA_VERSION=4.2.4-b1.5.5-flange-8.152.18",
                    "APP_VERSION=4.2.4",
                    "MALFORMED"
                ]
            }
        });

        let details = ImageDetails::from_parts("sha256:abc", &manifest, &config);

        assert_eq!(details.architecture.as_deref(), Some("amd64"));
        assert_eq!(details.docker_version.as_deref(), Some("1.13.1"));
        assert_eq!(details.layer_count, 1);
        assert_eq!(details.env.len(), 2);
        assert_eq!(details.env["APP_VERSION"], "4.2.4");
    }

    #[test]
    fn test_tag_list_allows_null() {
        let list: TagList = serde_json::from_str(r#"{"name":"ns/name","tags":null}"#).unwrap();
        assert!(list.tags.is_none());
    }

    #[test]
    fn test_header_lookup_keeps_repeated_values() {
        let response = ManifestResponse {
            content_type: MediaType::MANIFEST_V2.to_string(),
            digest: "sha256:abc".to_string(),
            body: None,
            headers: vec![
                ("docker-content-digest".to_string(), "sha256:abc".to_string()),
                ("link".to_string(), "<a>".to_string()),
                ("link".to_string(), "<b>".to_string()),
            ],
        };

        assert_eq!(response.header("Docker-Content-Digest"), Some("sha256:abc"));
        assert_eq!(response.header_values("Link").collect::<Vec<_>>(), vec!["<a>", "<b>"]);
        assert_eq!(response.header("etag"), None);
    }
}
