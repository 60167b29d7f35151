//! Configuration for registry endpoints and download behaviour

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_REGISTRY: &str = "https://registry-1.docker.io/v2";
pub const DEFAULT_TOKEN_ENDPOINT: &str =
    "https://auth.docker.io/token?service=registry.docker.io&scope=repository:{scope}:pull";
pub const DEFAULT_BLOB_PATH: &str = "{scope}/blobs/{digest}";
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Registry endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry API base, e.g. `https://registry-1.docker.io/v2`
    pub base_endpoint: String,
    /// Token endpoint; `{scope}` is replaced with `<repository>/<name>`
    pub token_endpoint: String,
    /// Blob path relative to the base; `{scope}` and `{digest}` are filled in
    pub blob_path: String,
    pub user_agent: String,
    pub skip_tls: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_endpoint: DEFAULT_REGISTRY.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            blob_path: DEFAULT_BLOB_PATH.to_string(),
            user_agent: concat!("layer-puller/", env!("CARGO_PKG_VERSION")).to_string(),
            skip_tls: false,
        }
    }
}

impl RegistryConfig {
    pub fn new(base_endpoint: impl Into<String>) -> Self {
        Self {
            base_endpoint: base_endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_token_endpoint(mut self, token_endpoint: impl Into<String>) -> Self {
        self.token_endpoint = token_endpoint.into();
        self
    }

    pub fn with_blob_path(mut self, blob_path: impl Into<String>) -> Self {
        self.blob_path = blob_path.into();
        self
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("registry address", &self.base_endpoint),
            ("token endpoint", &self.token_endpoint),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(RegistryError::Validation(format!(
                    "Invalid {}: {}. Must start with http:// or https://",
                    name, value
                )));
            }
            Url::parse(value)?;
        }

        if !self.token_endpoint.contains("{scope}") {
            return Err(RegistryError::Validation(
                "Token endpoint must contain a {scope} placeholder".to_string(),
            ));
        }
        if !self.blob_path.contains("{digest}") {
            return Err(RegistryError::Validation(
                "Blob path must contain a {digest} placeholder".to_string(),
            ));
        }

        Ok(())
    }

    /// Token URL for one image scope (`<repository>/<name>`)
    pub fn token_url(&self, scope: &str) -> String {
        self.token_endpoint.replace("{scope}", scope)
    }

    /// `<base>/<scope>/manifests/<reference>`
    pub fn manifest_url(&self, scope: &str, reference: &str) -> String {
        format!("{}/{}/manifests/{}", self.base(), scope, reference)
    }

    /// `<base>/<blob path filled with scope and digest>`
    pub fn blob_url(&self, scope: &str, digest: &str) -> String {
        let path = self
            .blob_path
            .replace("{scope}", scope)
            .replace("{digest}", digest);
        format!("{}/{}", self.base(), path.trim_start_matches('/'))
    }

    fn base(&self) -> &str {
        self.base_endpoint.trim_end_matches('/')
    }

    /// Create config from environment variables and defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LAYER_PULLER_REGISTRY") {
            config.base_endpoint = val;
        }
        if let Ok(val) = std::env::var("LAYER_PULLER_TOKEN_URL") {
            config.token_endpoint = val;
        }
        if let Ok(val) = std::env::var("LAYER_PULLER_SKIP_TLS") {
            config.skip_tls = val.to_lowercase() == "true" || val == "1";
        }

        config
    }
}

/// Download engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Bytes written per chunk while streaming a layer
    pub chunk_size: usize,
    /// Continue from an existing partial file instead of starting over
    pub resume: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            resume: true,
        }
    }
}

impl DownloadConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RegistryError::Validation(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var("LAYER_PULLER_CHUNK_SIZE") {
            if let Ok(chunk_size) = val.parse() {
                config.chunk_size = chunk_size;
            }
        }
        config
    }
}

/// Application configuration, built once at the CLI boundary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub download: DownloadConfig,
    pub verbose: bool,
    pub quiet: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            registry: RegistryConfig::from_env(),
            download: DownloadConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.download.validate()
    }
}
