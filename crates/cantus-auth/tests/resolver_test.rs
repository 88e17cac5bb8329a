//! Integration tests for the OpenShift group resolver.

use std::sync::Arc;
use std::time::Duration;

use cantus_auth::{GroupCache, GroupCacheConfig, GroupResolver, OpenShiftGroupResolver, OPENSHIFT_SOURCE};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_PATH: &str = "/apis/user.openshift.io/v1/users/~";

fn resolver(server: &MockServer) -> OpenShiftGroupResolver {
    OpenShiftGroupResolver::new(server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_resolves_user_and_groups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .and(header("Authorization", "Bearer caller-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "User",
            "apiVersion": "user.openshift.io/v1",
            "metadata": {"name": "jdoe"},
            "groups": ["aurora", "paas"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = resolver(&server).resolve("caller-token").await.unwrap();

    assert_eq!(user.username, "jdoe");
    assert_eq!(user.groups, vec!["aurora", "paas"]);
}

#[tokio::test]
async fn test_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("expired").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.message(), "unauthorized");
    assert_eq!(err.source_system(), Some(OPENSHIFT_SOURCE));
}

#[tokio::test]
async fn test_malformed_user_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "Status"})))
        .mount(&server)
        .await;

    let err = resolver(&server).resolve("token").await.unwrap_err();
    assert_eq!(err.kind(), cantus_core::ErrorKind::ProtocolViolation);
}

#[tokio::test]
async fn test_cache_calls_cluster_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"name": "jdoe"},
            "groups": ["aurora"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = GroupCache::new(Arc::new(resolver(&server)), GroupCacheConfig::default());

    for _ in 0..3 {
        let user = cache.get("caller-token").await.unwrap();
        assert!(user.is_member("aurora"));
    }
}
