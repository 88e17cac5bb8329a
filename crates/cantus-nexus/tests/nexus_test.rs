//! Integration tests for the Nexus client against a mock Nexus.

use std::sync::Arc;

use cantus_core::{ErrorKind, NEXUS_SOURCE};
use cantus_nexus::{
    get_all_versions, move_service, MoveRequest, NexusApi, NexusClient, NexusConfig,
    NexusCredentials,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH: &str = "/service/rest/v1/search";

fn config(server: &MockServer) -> NexusConfig {
    NexusConfig::new(server.uri())
        .with_write_url(server.uri())
        .with_credentials(NexusCredentials::new("mover", "secret"))
        .with_move_enabled(true)
}

fn component(version: &str, last_modified: &str) -> serde_json::Value {
    json!({
        "id": format!("id-{version}"),
        "repository": "docker-snapshots",
        "format": "docker",
        "name": "aurora/console",
        "version": version,
        "assets": [{
            "checksum": {"sha256": "abc123"},
            "lastModified": last_modified
        }]
    })
}

#[tokio::test]
async fn test_search_sends_all_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("name", "aurora/console"))
        .and(query_param("sort", "version"))
        .and(query_param("repository", "docker-snapshots"))
        .and(query_param("version", "4.2.4"))
        .and(query_param("sha256", "abc123"))
        .and(query_param("format", "docker"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [component("4.2.4", "2020-03-03T13:37:27.016+0000")],
            "continuationToken": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NexusClient::new(config(&server)).unwrap();
    let page = client
        .search("docker-snapshots", "aurora/console", Some("4.2.4"), Some("abc123"))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert!(page.continuation_token.is_none());
}

#[tokio::test]
async fn test_search_error_classified_as_nexus() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client = NexusClient::new(config(&server)).unwrap();
    let err = client
        .search("docker-snapshots", "aurora/console", None, None)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.message(), "invalid request");
    assert_eq!(err.source_system(), Some(NEXUS_SOURCE));
}

#[tokio::test]
async fn test_version_listing_follows_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("continuationToken", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [component("4.2", "2020-03-04T10:00:00.000+0000")],
            "continuationToken": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("name", "aurora/console"))
        .and(query_param("repository", "docker-snapshots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                component("4", "2020-03-02T10:00:00.000+0000"),
                component("4.2.4", "2020-03-03T13:37:27.016+0000")
            ],
            "continuationToken": "T1"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let client = NexusClient::new(config(&server)).unwrap();
    let versions = get_all_versions(&client, "aurora", "console", "docker-snapshots", 1000)
        .await
        .unwrap();

    let names: Vec<&str> = versions.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["4", "4.2.4", "4.2"]);
    assert!(versions.iter().all(|v| v.last_modified.is_some()));
}

#[tokio::test]
async fn test_move_sends_basic_auth_and_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [component("4.2.4", "2020-03-03T13:37:27.016+0000")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/service/rest/v1/staging/move/docker-release"))
        .and(query_param("repository", "docker-snapshots"))
        .and(query_param("name", "aurora/console"))
        .and(query_param("version", "4.2.4"))
        .and(query_param("sha256", "abc123"))
        .and(query_param("format", "docker"))
        .and(header("Authorization", "Basic bW92ZXI6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "Move Successful",
            "data": {
                "destination": "docker-release",
                "componentsMoved": [{"name": "aurora/console", "version": "4.2.4"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let client = Arc::new(NexusClient::new(config.clone()).unwrap());
    let mover = move_service(&config, client);

    let outcome = mover
        .move_image(&MoveRequest::new(
            "docker-snapshots",
            "docker-release",
            "aurora/console",
            "4.2.4",
            "abc123",
        ))
        .await
        .unwrap();

    assert!(outcome.success);
    let image = outcome.resulting_image.unwrap();
    assert_eq!(image.repository, "docker-release");
    assert_eq!(image.version, "4.2.4");
}

#[tokio::test]
async fn test_move_server_error_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/service/rest/v1/staging/move/docker-release"))
        .respond_with(ResponseTemplate::new(500).set_body_string("staging plugin crashed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = NexusClient::new(config(&server)).unwrap();
    let err = client
        .move_component("docker-snapshots", "docker-release", "aurora/console", "4.2.4", "abc123")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.source_system(), Some(NEXUS_SOURCE));
    match err {
        cantus_core::CantusError::Upstream { body, .. } => {
            assert_eq!(body.as_deref(), Some("staging plugin crashed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_move_client_error_returned_raw() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/service/rest/v1/staging/move/docker-release"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such repository"))
        .mount(&server)
        .await;

    let client = NexusClient::new(config(&server)).unwrap();
    let reply = client
        .move_component("docker-snapshots", "docker-release", "aurora/console", "4.2.4", "abc123")
        .await
        .unwrap();

    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, "no such repository");
    assert!(!reply.is_success());
}

#[tokio::test]
async fn test_disabled_move_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = NexusConfig::new(server.uri());
    let client = Arc::new(NexusClient::new(config.clone()).unwrap());
    let mover = move_service(&config, client);

    let err = mover
        .move_image(&MoveRequest::new("a", "b", "aurora/console", "1", "abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegrationDisabled);
}
