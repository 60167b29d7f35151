//! Read-through resolution of an image into a layer catalog.
//!
//! Each resolver is scoped to one [`ImageReference`]. The token, the manifest
//! list and every architecture manifest are fetched at most once per resolver
//! and kept for its lifetime; nothing is invalidated.

use crate::config::DownloadConfig;
use crate::download::DownloadSession;
use crate::error::Result;
use crate::image::{ArchManifest, ImageReference, LayerCatalog, LayerDescriptor, ManifestList, Platform};
use crate::registry::auth::TokenSource;
use crate::registry::client::RegistryClient;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

pub struct ManifestResolver {
    image: ImageReference,
    client: RegistryClient,
    tokens: Arc<dyn TokenSource>,
    token: OnceCell<String>,
    manifest_list: OnceCell<ManifestList>,
    arch_manifests: Mutex<HashMap<String, Arc<ArchManifest>>>,
}

impl ManifestResolver {
    pub fn new(image: ImageReference, client: RegistryClient, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            image,
            client,
            tokens,
            token: OnceCell::new(),
            manifest_list: OnceCell::new(),
            arch_manifests: Mutex::new(HashMap::new()),
        }
    }

    pub fn image(&self) -> &ImageReference {
        &self.image
    }

    /// Pull token for this image, requested on first use
    pub async fn token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                debug!(image = %self.image, "requesting token");
                self.tokens.token(&self.image.scope()).await
            })
            .await?;
        Ok(token.as_str())
    }

    /// Manifest list for the image's tag, fetched on first use
    pub async fn manifest_list(&self) -> Result<&ManifestList> {
        self.manifest_list
            .get_or_try_init(|| async {
                let token = self.token().await?;
                let list = self
                    .client
                    .manifest_operations()
                    .fetch_manifest_list(&self.image.scope(), self.image.tag(), token)
                    .await?;
                info!(
                    image = %self.image,
                    platforms = list.manifests.len(),
                    "manifest list resolved"
                );
                Ok(list)
            })
            .await
    }

    pub async fn platforms(&self) -> Result<Vec<Platform>> {
        let list = self.manifest_list().await?;
        Ok(list.platforms().into_iter().cloned().collect())
    }

    /// Architectures available for this tag, in manifest order
    pub async fn architectures(&self) -> Result<Vec<String>> {
        let list = self.manifest_list().await?;
        Ok(list.architectures().into_iter().map(str::to_string).collect())
    }

    /// Manifest of one architecture, fetched on first use.
    ///
    /// Fails with `NotFound` before any request when the manifest list has no
    /// entry for `arch`.
    pub async fn arch_manifest(&self, arch: &str) -> Result<Arc<ArchManifest>> {
        let mut cache = self.arch_manifests.lock().await;
        if let Some(manifest) = cache.get(arch) {
            return Ok(manifest.clone());
        }

        let digest = self.manifest_list().await?.find_arch(arch)?.digest.clone();
        let token = self.token().await?;
        let manifest = self
            .client
            .manifest_operations()
            .fetch_arch_manifest(&self.image.scope(), &digest, token)
            .await?;
        info!(image = %self.image, arch, %digest, layers = manifest.layers.len(), "image manifest resolved");

        let manifest = Arc::new(manifest);
        cache.insert(arch.to_string(), manifest.clone());
        Ok(manifest)
    }

    /// Ordered layer catalog for one architecture
    pub async fn layer_catalog(&self, arch: &str) -> Result<LayerCatalog> {
        let manifest = self.arch_manifest(arch).await?;
        let scope = self.image.scope();
        let layers = manifest
            .layers
            .iter()
            .map(|layer| LayerDescriptor::from_manifest(self.client.config(), &scope, layer))
            .collect();
        Ok(LayerCatalog::new(self.image.clone(), arch, layers))
    }

    /// Download session writing this image's `arch` layers under `directory`
    pub async fn create_download_session(
        &self,
        arch: &str,
        directory: impl Into<PathBuf>,
        config: DownloadConfig,
    ) -> Result<DownloadSession> {
        config.validate()?;
        let catalog = self.layer_catalog(arch).await?;
        let token = self.token().await?.to_string();
        Ok(DownloadSession::new(
            catalog,
            directory,
            self.client.blob_operations(),
            Some(token),
            config,
        ))
    }
}

impl std::fmt::Debug for ManifestResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestResolver")
            .field("image", &self.image)
            .field("token_cached", &self.token.initialized())
            .field("manifest_list_cached", &self.manifest_list.initialized())
            .finish()
    }
}
