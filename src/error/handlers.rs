//! Standardized mapping from HTTP responses and transport failures to [`RegistryError`]

use crate::error::RegistryError;
use reqwest::header::WWW_AUTHENTICATE;
use reqwest::{Response, StatusCode};

/// Standard error handler for non-success HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Token endpoint failure: status and body
    pub async fn handle_auth_error(response: Response) -> RegistryError {
        let status = response.status();
        let body = Self::read_body(response).await;
        RegistryError::Auth {
            status: status.as_u16(),
            body,
        }
    }

    /// Manifest endpoint failure; a 401 keeps the `Www-Authenticate` challenge verbatim
    pub async fn handle_manifest_error(response: Response) -> RegistryError {
        let status = response.status();
        let challenge = if status == StatusCode::UNAUTHORIZED {
            response
                .headers()
                .get(WWW_AUTHENTICATE)
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        } else {
            None
        };
        let body = Self::read_body(response).await;
        RegistryError::Manifest {
            status: status.as_u16(),
            body,
            challenge,
        }
    }

    /// Blob endpoint failure
    pub async fn handle_blob_error(response: Response, digest: &str) -> RegistryError {
        let status = response.status();
        let body = Self::read_body(response).await;
        let message = match status.as_u16() {
            401 => format!("Unauthorized to pull blob {}: {}", digest, body),
            403 => format!("Forbidden: insufficient permissions for blob {}: {}", digest, body),
            404 => format!("Blob {} not found: {}", digest, body),
            416 => format!("Requested range not satisfiable for blob {}: {}", digest, body),
            429 => format!("Rate limited while pulling blob {}: {}", digest, body),
            502 | 503 => format!("Registry unavailable while pulling blob {}: {}", digest, body),
            _ => format!("Failed to pull blob {} (status {}): {}", digest, status, body),
        };
        RegistryError::Transport(message)
    }

    async fn read_body(response: Response) -> String {
        response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string())
    }
}

/// Network error categorization
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> RegistryError {
        let message = if error.is_timeout() {
            format!("{} timeout: {}", context, error)
        } else if error.is_connect() {
            format!("Connection error during {}: {}", context, error)
        } else if error.is_body() || error.is_decode() {
            format!("Response body error during {}: {}", context, error)
        } else if error.to_string().contains("certificate") {
            format!("TLS certificate error during {}: {}", context, error)
        } else {
            format!("{} network error: {}", context, error)
        };
        RegistryError::Transport(message)
    }
}
