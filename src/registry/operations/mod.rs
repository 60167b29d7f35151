//! Registry operations, one module per Docker Registry v2 endpoint family
//!
//! - manifests: `GET /v2/{name}/manifests/{reference}`
//! - blobs: `GET /v2/{name}/blobs/{digest}` with `Range` support

pub mod blob_operations;
pub mod manifest_operations;

pub use blob_operations::BlobOperations;
pub use manifest_operations::ManifestOperations;
