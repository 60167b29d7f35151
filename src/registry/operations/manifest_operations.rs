//! Manifest operations for registry client
//!
//! Implements the two manifest reads needed for a pull:
//! - Manifest list by tag, accepting Docker manifest list and Docker v2 media types
//! - Architecture manifest by digest, accepting the OCI image manifest media type

use crate::config::RegistryConfig;
use crate::error::handlers::HttpErrorHandler;
use crate::error::Result;
use crate::image::manifest::{
    ArchManifest, ManifestList, MEDIA_TYPE_DOCKER_MANIFEST, MEDIA_TYPE_DOCKER_MANIFEST_LIST,
    MEDIA_TYPE_OCI_MANIFEST,
};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ManifestOperations {
    client: Client,
    config: Arc<RegistryConfig>,
}

impl ManifestOperations {
    pub fn new(client: Client, config: Arc<RegistryConfig>) -> Self {
        Self { client, config }
    }

    /// Fetch the multi-platform manifest list for `scope:tag`
    pub async fn fetch_manifest_list(
        &self,
        scope: &str,
        tag: &str,
        token: &str,
    ) -> Result<ManifestList> {
        let accept = [MEDIA_TYPE_DOCKER_MANIFEST, MEDIA_TYPE_DOCKER_MANIFEST_LIST].join(", ");
        let data = self.fetch(scope, tag, token, &accept).await?;
        ManifestList::from_slice(&data)
    }

    /// Fetch the architecture-specific manifest addressed by `digest`
    pub async fn fetch_arch_manifest(
        &self,
        scope: &str,
        digest: &str,
        token: &str,
    ) -> Result<ArchManifest> {
        let data = self.fetch(scope, digest, token, MEDIA_TYPE_OCI_MANIFEST).await?;
        ArchManifest::from_slice(&data)
    }

    async fn fetch(&self, scope: &str, reference: &str, token: &str, accept: &str) -> Result<Vec<u8>> {
        let url = self.config.manifest_url(scope, reference);
        debug!(%url, accept, "fetching manifest");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, accept)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HttpErrorHandler::handle_manifest_error(response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let data = response.bytes().await?;
        debug!(%url, %content_type, bytes = data.len(), "manifest received");
        Ok(data.to_vec())
    }
}
