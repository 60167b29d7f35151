//! Registry client: one shared HTTP client plus the endpoint configuration,
//! handed out to the token provider and the manifest/blob operations.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::image::ImageReference;
use crate::registry::auth::{AuthTokenProvider, TokenSource};
use crate::registry::operations::{BlobOperations, ManifestOperations};
use crate::registry::resolver::ManifestResolver;
use reqwest::Client;
use std::sync::Arc;

pub struct RegistryClientBuilder {
    config: RegistryConfig,
}

impl RegistryClientBuilder {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.config.skip_tls = skip_tls;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        self.config.validate()?;

        let mut builder = Client::builder().user_agent(self.config.user_agent.clone());
        if self.config.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let http = builder
            .build()
            .map_err(|e| RegistryError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RegistryClient {
            http,
            config: Arc::new(self.config),
        })
    }
}

#[derive(Clone)]
pub struct RegistryClient {
    http: Client,
    config: Arc<RegistryConfig>,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: RegistryConfig) -> RegistryClientBuilder {
        RegistryClientBuilder::new(config)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn token_provider(&self) -> AuthTokenProvider {
        AuthTokenProvider::new(self.http.clone(), self.config.clone())
    }

    pub fn manifest_operations(&self) -> ManifestOperations {
        ManifestOperations::new(self.http.clone(), self.config.clone())
    }

    pub fn blob_operations(&self) -> BlobOperations {
        BlobOperations::new(self.http.clone())
    }

    /// Resolver for one image, authenticating through the registry's token endpoint
    pub fn resolver(&self, image: ImageReference) -> ManifestResolver {
        self.resolver_with_tokens(image, Arc::new(self.token_provider()))
    }

    /// Resolver for one image with a caller-supplied token source
    pub fn resolver_with_tokens(
        &self,
        image: ImageReference,
        tokens: Arc<dyn TokenSource>,
    ) -> ManifestResolver {
        ManifestResolver::new(image, self.clone(), tokens)
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("base_endpoint", &self.config.base_endpoint)
            .field("skip_tls", &self.config.skip_tls)
            .finish()
    }
}
