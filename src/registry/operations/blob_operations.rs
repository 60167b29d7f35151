//! Blob operations for registry client
//!
//! Implements ranged blob download (`GET /v2/{name}/blobs/{digest}` with
//! `Range: bytes=<offset>-`). The response is handed back unread so the
//! caller can stream the body to disk.

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::Result;
use crate::image::LayerDescriptor;
use reqwest::header::RANGE;
use reqwest::{Client, Response};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BlobOperations {
    client: Client,
}

impl BlobOperations {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Request the bytes of `layer` starting at `offset`.
    ///
    /// Any 2xx response is returned; a 200 means the registry ignored the
    /// range and the body starts at byte 0 of the blob.
    pub async fn fetch_range(
        &self,
        layer: &LayerDescriptor,
        offset: u64,
        token: Option<&str>,
    ) -> Result<Response> {
        debug!(digest = %layer.digest, offset, size = layer.size, "requesting blob range");

        let mut request = self
            .client
            .get(&layer.url)
            .header(RANGE, format!("bytes={}-", offset));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "blob pull"))?;

        if !response.status().is_success() {
            return Err(HttpErrorHandler::handle_blob_error(response, &layer.digest).await);
        }

        debug!(
            digest = %layer.digest,
            status = response.status().as_u16(),
            content_length = ?response.content_length(),
            "blob response"
        );
        Ok(response)
    }
}
