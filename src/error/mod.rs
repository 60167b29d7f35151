//! Error types and handlers for registry and download operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Token endpoint answered with a non-success status
    #[error("Failed to get token: {status}: {body}")]
    Auth { status: u16, body: String },

    /// Manifest endpoint answered with a non-success status
    #[error("{}", manifest_message(.status, .body, .challenge))]
    Manifest {
        status: u16,
        body: String,
        /// `Www-Authenticate` header of a 401 response, verbatim
        challenge: Option<String>,
    },

    /// The manifest list has no entry for the requested architecture
    #[error("no image for arch: {arch}")]
    NotFound { arch: String },

    /// Network failure or bad response while talking to the registry
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The transfer was stopped through its cancel token
    #[error("Download cancelled after {downloaded} bytes")]
    Cancelled { downloaded: u64 },

    #[error("Sandbox error: {0}")]
    Sandbox(String),
}

fn manifest_message(status: &u16, body: &str, challenge: &Option<String>) -> String {
    match challenge {
        Some(challenge) if *status == 401 => {
            format!("Failed to get manifests: Required Token: {}", challenge)
        }
        _ => format!("Failed to get manifest: {}: {}", status, body),
    }
}

impl RegistryError {
    /// HTTP status carried by registry-side failures
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Auth { status, .. } | RegistryError::Manifest { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "registry request")
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_unauthorized_carries_challenge() {
        let challenge = r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/ubuntu:pull",error="insufficient_scope""#;
        let err = RegistryError::Manifest {
            status: 401,
            body: "{}".to_string(),
            challenge: Some(challenge.to_string()),
        };
        assert!(err.to_string().contains(challenge));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_manifest_other_status_carries_body() {
        let err = RegistryError::Manifest {
            status: 404,
            body: "MANIFEST_UNKNOWN".to_string(),
            challenge: None,
        };
        assert_eq!(err.to_string(), "Failed to get manifest: 404: MANIFEST_UNKNOWN");
    }

    #[test]
    fn test_not_found_message() {
        let err = RegistryError::NotFound {
            arch: "mips".to_string(),
        };
        assert_eq!(err.to_string(), "no image for arch: mips");
        assert_eq!(err.status(), None);
    }
}
