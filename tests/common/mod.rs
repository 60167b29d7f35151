//! Mock Docker Hub shared by the integration tests

#![allow(dead_code)]

use httpmock::prelude::*;
use layer_puller::{ImageReference, ManifestResolver, RegistryClient, RegistryConfig};
use serde_json::json;

pub const TOKEN: &str = "pull-token";
pub const AMD64_DIGEST: &str = "sha256:amd64manifest";
pub const ARM64_DIGEST: &str = "sha256:arm64manifest";
pub const LAYER_SIZES: [u64; 3] = [100, 200, 50];
pub const GZIP_LAYER: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

pub fn layer_digest(index: usize) -> String {
    format!("sha256:layer{}", index)
}

pub fn blob_path(index: usize) -> String {
    format!("/v2/library/busybox/blobs/{}", layer_digest(index))
}

/// Deterministic content of layer `index`
pub fn layer_bytes(index: usize) -> Vec<u8> {
    (0..LAYER_SIZES[index])
        .map(|j| (index as u64 * 31 + j) as u8)
        .collect()
}

pub fn archive_bytes() -> Vec<u8> {
    (0..LAYER_SIZES.len()).flat_map(layer_bytes).collect()
}

pub fn config(server: &MockServer) -> RegistryConfig {
    RegistryConfig::new(server.url("/v2"))
        .with_token_endpoint(server.url("/token?service=registry&scope=repository:{scope}:pull"))
}

pub fn resolver(server: &MockServer) -> ManifestResolver {
    let client = RegistryClient::new(config(server)).unwrap();
    client.resolver(ImageReference::parse("library/busybox:1.36").unwrap())
}

pub struct Registry<'a> {
    pub token: httpmock::Mock<'a>,
    pub list: httpmock::Mock<'a>,
    pub amd64: httpmock::Mock<'a>,
}

/// Token endpoint, manifest list (amd64, arm64) and the amd64 manifest
pub async fn mount_registry(server: &MockServer) -> Registry<'_> {
    mount_registry_with_layers(server, &LAYER_SIZES).await
}

pub async fn mount_registry_with_layers<'a>(server: &'a MockServer, sizes: &[u64]) -> Registry<'a> {
    let token = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/token")
                .query_param("scope", "repository:library/busybox:pull");
            then.status(200).json_body(json!({ "token": TOKEN, "expires_in": 300 }));
        })
        .await;

    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/library/busybox/manifests/1.36")
                .header("authorization", format!("Bearer {}", TOKEN));
            then.status(200)
                .header("content-type", "application/vnd.docker.distribution.manifest.list.v2+json")
                .json_body(json!({
                    "schemaVersion": 2,
                    "mediaType": "application/vnd.docker.distribution.manifest.list.v2+json",
                    "manifests": [
                        {
                            "mediaType": "application/vnd.oci.image.manifest.v1+json",
                            "size": 528,
                            "digest": AMD64_DIGEST,
                            "platform": { "architecture": "amd64", "os": "linux" }
                        },
                        {
                            "mediaType": "application/vnd.oci.image.manifest.v1+json",
                            "size": 528,
                            "digest": ARM64_DIGEST,
                            "platform": { "architecture": "arm64", "os": "linux", "variant": "v8" }
                        }
                    ]
                }));
        })
        .await;

    let layers: Vec<_> = sizes
        .iter()
        .enumerate()
        .map(|(i, size)| json!({ "mediaType": GZIP_LAYER, "size": size, "digest": layer_digest(i) }))
        .collect();
    let amd64 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("/v2/library/busybox/manifests/{}", AMD64_DIGEST))
                .header("accept", "application/vnd.oci.image.manifest.v1+json");
            then.status(200).json_body(json!({
                "schemaVersion": 2,
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "config": { "mediaType": "application/vnd.oci.image.config.v1+json", "size": 1470, "digest": "sha256:config" },
                "layers": layers
            }));
        })
        .await;

    Registry { token, list, amd64 }
}

/// Blob `index` served from `offset` with a 206
pub async fn mount_blob(server: &MockServer, index: usize, offset: u64) -> httpmock::Mock<'_> {
    let body = layer_bytes(index)[offset as usize..].to_vec();
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(blob_path(index))
                .header("range", format!("bytes={}-", offset))
                .header("authorization", format!("Bearer {}", TOKEN));
            then.status(206).body(body);
        })
        .await
}
