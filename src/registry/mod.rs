//! Registry module for Docker registry interactions
//!
//! This module provides token acquisition, manifest resolution and ranged blob
//! access against the Docker Registry HTTP API v2.

pub mod auth;
pub mod client;
pub mod operations;
pub mod resolver;

pub use auth::{AuthTokenProvider, StaticToken, TokenSource};
pub use client::{RegistryClient, RegistryClientBuilder};
pub use operations::{BlobOperations, ManifestOperations};
pub use resolver::ManifestResolver;
