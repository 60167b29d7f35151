//! Layer Puller Library
//!
//! Resolves a Docker image through the registry HTTP API (token, manifest
//! list, per-architecture manifest) and downloads its layers, in order, into
//! one resumable archive while reporting progress through event channels.
//!
//! ```no_run
//! use layer_puller::{DownloadConfig, ImageReference, RegistryClient, RegistryConfig};
//!
//! # async fn pull() -> layer_puller::Result<()> {
//! let client = RegistryClient::new(RegistryConfig::default())?;
//! let resolver = client.resolver(ImageReference::parse("library/ubuntu:22.04")?);
//! let session = resolver
//!     .create_download_session("amd64", "images", DownloadConfig::default())
//!     .await?;
//! session.updated().subscribe(|s| println!("{:.1}%", s.progress() * 100.0));
//! session.start(true).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod image;
pub mod logging;
pub mod registry;
pub mod sandbox;

pub use config::{AppConfig, DownloadConfig, RegistryConfig};
pub use download::{DownloadSession, EventChannel, StartOutcome, SubscriptionId};
pub use error::{RegistryError, Result};
pub use image::{ImageReference, LayerCatalog, LayerDescriptor};
pub use logging::Logger;
pub use registry::{ManifestResolver, RegistryClient};
