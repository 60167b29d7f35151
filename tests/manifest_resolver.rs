mod common;

use common::*;
use httpmock::prelude::*;
use layer_puller::registry::StaticToken;
use layer_puller::{DownloadConfig, ImageReference, RegistryClient, RegistryError};
use std::sync::Arc;

#[tokio::test]
async fn test_catalog_follows_manifest_order() {
    let server = MockServer::start_async().await;
    mount_registry(&server).await;

    let catalog = resolver(&server).layer_catalog("amd64").await.unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.total_size(), 350);
    assert_eq!(catalog.extension(), ".tar.gz");
    assert_eq!(catalog.name(), "library-busybox-1.36-amd64");
    let digests: Vec<_> = catalog.layers().iter().map(|l| l.digest.clone()).collect();
    assert_eq!(digests, [layer_digest(0), layer_digest(1), layer_digest(2)]);
    assert_eq!(catalog.layers()[1].url, server.url(blob_path(1)));
}

#[tokio::test]
async fn test_token_and_manifests_fetched_once() {
    let server = MockServer::start_async().await;
    let registry = mount_registry(&server).await;
    let resolver = resolver(&server);

    assert_eq!(resolver.architectures().await.unwrap(), ["amd64", "arm64"]);
    resolver.layer_catalog("amd64").await.unwrap();
    resolver.layer_catalog("amd64").await.unwrap();
    let platforms = resolver.platforms().await.unwrap();
    assert_eq!(platforms[1].variant.as_deref(), Some("v8"));
    resolver
        .create_download_session("amd64", "unused", DownloadConfig::default())
        .await
        .unwrap();

    registry.token.assert_async().await;
    registry.list.assert_async().await;
    registry.amd64.assert_async().await;
}

#[tokio::test]
async fn test_unknown_arch_fails_before_manifest_fetch() {
    let server = MockServer::start_async().await;
    let registry = mount_registry(&server).await;

    let err = resolver(&server).layer_catalog("mips").await.unwrap_err();

    match &err {
        RegistryError::NotFound { arch } => assert_eq!(arch, "mips"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert_eq!(err.to_string(), "no image for arch: mips");
    assert_eq!(registry.amd64.hits_async().await, 0);
}

#[tokio::test]
async fn test_unauthorized_manifest_carries_challenge() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/token");
            then.status(200).json_body(serde_json::json!({ "token": TOKEN }));
        })
        .await;
    let challenge =
        r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/busybox:pull""#;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/library/busybox/manifests/1.36");
            then.status(401)
                .header("www-authenticate", challenge)
                .body(r#"{"errors":[{"code":"UNAUTHORIZED"}]}"#);
        })
        .await;

    let err = resolver(&server).architectures().await.unwrap_err();

    match &err {
        RegistryError::Manifest { status, challenge: Some(value), .. } => {
            assert_eq!(*status, 401);
            assert_eq!(value, challenge);
        }
        other => panic!("expected manifest error with challenge, got {:?}", other),
    }
    assert!(err.to_string().contains("Required Token"));
}

#[tokio::test]
async fn test_token_failure_is_auth_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/token");
            then.status(503).body("try later");
        })
        .await;

    let err = resolver(&server).architectures().await.unwrap_err();
    assert!(matches!(err, RegistryError::Auth { status: 503, .. }), "{:?}", err);
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_static_token_skips_token_endpoint() {
    let server = MockServer::start_async().await;
    let registry = mount_registry(&server).await;

    let client = RegistryClient::new(config(&server)).unwrap();
    let resolver = client.resolver_with_tokens(
        ImageReference::parse("library/busybox:1.36").unwrap(),
        Arc::new(StaticToken::new(TOKEN)),
    );

    assert_eq!(resolver.layer_catalog("amd64").await.unwrap().len(), 3);
    assert_eq!(registry.token.hits_async().await, 0);
}

#[tokio::test]
async fn test_raw_manifests_keep_registry_fields() {
    let server = MockServer::start_async().await;
    let registry = mount_registry(&server).await;
    let resolver = resolver(&server);

    let list = resolver.manifest_list().await.unwrap().raw().clone();
    assert_eq!(list["mediaType"], "application/vnd.docker.distribution.manifest.list.v2+json");
    assert_eq!(list["manifests"][1]["platform"]["variant"], "v8");

    let manifest = resolver.arch_manifest("amd64").await.unwrap();
    let config = &manifest.raw()["config"];
    assert_eq!(config["digest"], "sha256:config");
    assert_eq!(config["mediaType"], "application/vnd.oci.image.config.v1+json");
    assert_eq!(config["size"], 1470);
    assert_eq!(manifest.raw()["layers"].as_array().unwrap().len(), 3);

    registry.list.assert_async().await;
    registry.amd64.assert_async().await;
}
