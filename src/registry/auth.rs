//! Bearer token acquisition for registry access

use crate::config::RegistryConfig;
use crate::error::handlers::HttpErrorHandler;
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Supplies a bearer token scoped to one image (`<repository>/<name>`)
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self, scope: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Requests pull tokens from the registry's token endpoint
#[derive(Debug, Clone)]
pub struct AuthTokenProvider {
    client: Client,
    config: Arc<RegistryConfig>,
}

impl AuthTokenProvider {
    pub fn new(client: Client, config: Arc<RegistryConfig>) -> Self {
        Self { client, config }
    }

    pub async fn request_access_token(&self, scope: &str) -> Result<String> {
        let url = self.config.token_url(scope);
        debug!(%url, "requesting access token");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(HttpErrorHandler::handle_auth_error(response).await);
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse token response: {}", e)))?;

        let token = body.token.or(body.access_token).ok_or_else(|| {
            RegistryError::Parse("Token response has no token field".to_string())
        })?;
        debug!(scope, length = token.len(), "access token obtained");
        Ok(token)
    }
}

#[async_trait]
impl TokenSource for AuthTokenProvider {
    async fn token(&self, scope: &str) -> Result<String> {
        self.request_access_token(scope).await
    }
}

/// A pre-issued token used as-is for every scope
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self, _scope: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}
