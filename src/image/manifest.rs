//! Registry manifest documents: the multi-platform manifest list and the
//! per-architecture image manifest.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// One entry of the manifest list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformManifest {
    pub digest: String,
    #[serde(default)]
    pub media_type: String,
    pub platform: Platform,
    #[serde(default)]
    pub size: u64,
}

/// Maps platforms to architecture-specific manifest digests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestList {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    pub manifests: Vec<PlatformManifest>,
    /// Document as the registry sent it, unknown fields included
    #[serde(skip)]
    raw: Value,
}

impl ManifestList {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let raw: Value = serde_json::from_slice(data)
            .map_err(|e| RegistryError::Parse(format!("Invalid manifest list: {}", e)))?;
        let mut list: Self = serde_json::from_value(raw.clone())
            .map_err(|e| RegistryError::Parse(format!("Invalid manifest list: {}", e)))?;
        list.raw = raw;
        Ok(list)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn platforms(&self) -> Vec<&Platform> {
        self.manifests.iter().map(|m| &m.platform).collect()
    }

    /// Architectures in manifest order
    pub fn architectures(&self) -> Vec<&str> {
        self.manifests
            .iter()
            .map(|m| m.platform.architecture.as_str())
            .collect()
    }

    /// First entry whose platform architecture equals `arch`
    pub fn find_arch(&self, arch: &str) -> Result<&PlatformManifest> {
        self.manifests
            .iter()
            .find(|m| m.platform.architecture == arch)
            .ok_or_else(|| RegistryError::NotFound {
                arch: arch.to_string(),
            })
    }
}

/// Layer entry as it appears in an image manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLayer {
    pub media_type: String,
    pub size: u64,
    pub digest: String,
}

/// Per-architecture image manifest; `layers` order is authoritative
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchManifest {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub layers: Vec<ManifestLayer>,
    #[serde(skip)]
    raw: Value,
}

impl ArchManifest {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let raw: Value = serde_json::from_slice(data)
            .map_err(|e| RegistryError::Parse(format!("Invalid image manifest: {}", e)))?;
        let mut manifest: Self = serde_json::from_value(raw.clone())
            .map_err(|e| RegistryError::Parse(format!("Invalid image manifest: {}", e)))?;
        manifest.raw = raw;
        Ok(manifest)
    }

    /// Document as the registry sent it, `config` and annotations included
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.list.v2+json",
        "manifests": [
            {
                "digest": "sha256:3a6c58f84a3ca8af9a5bcd",
                "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                "platform": { "architecture": "amd64", "os": "linux" },
                "size": 528
            },
            {
                "digest": "sha256:7c1a2b9d0e",
                "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                "platform": { "architecture": "arm64", "os": "linux", "variant": "v8" },
                "size": 528
            }
        ]
    }"#;

    #[test]
    fn test_manifest_list_lookup() {
        let list = ManifestList::from_slice(LIST.as_bytes()).unwrap();
        assert_eq!(list.architectures(), vec!["amd64", "arm64"]);
        assert_eq!(list.find_arch("arm64").unwrap().digest, "sha256:7c1a2b9d0e");
        assert_eq!(list.platforms()[1].variant.as_deref(), Some("v8"));

        match list.find_arch("mips") {
            Err(RegistryError::NotFound { arch }) => assert_eq!(arch, "mips"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_arch_manifest_layers_keep_order() {
        let json = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "config": { "mediaType": "application/vnd.oci.image.config.v1+json", "size": 2, "digest": "sha256:c" },
            "layers": [
                { "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip", "size": 29547485, "digest": "sha256:a4" },
                { "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip", "size": 12, "digest": "sha256:b5" }
            ]
        }"#;
        let manifest = ArchManifest::from_slice(json.as_bytes()).unwrap();
        let digests: Vec<_> = manifest.layers.iter().map(|l| l.digest.as_str()).collect();
        assert_eq!(digests, vec!["sha256:a4", "sha256:b5"]);
        assert_eq!(manifest.layers[0].size, 29547485);
        assert_eq!(manifest.raw()["config"]["digest"], "sha256:c");
    }

    #[test]
    fn test_raw_list_keeps_unknown_fields() {
        let json = r#"{
            "schemaVersion": 2,
            "manifests": [
                {
                    "digest": "sha256:aa",
                    "platform": { "architecture": "amd64", "os": "linux", "os.version": "10.0" },
                    "annotations": { "vnd.docker.reference.type": "attestation-manifest" }
                }
            ]
        }"#;
        let list = ManifestList::from_slice(json.as_bytes()).unwrap();
        let entry = &list.raw()["manifests"][0];
        assert_eq!(entry["annotations"]["vnd.docker.reference.type"], "attestation-manifest");
        assert_eq!(entry["platform"]["os.version"], "10.0");
        assert!(serde_json::to_value(&list).unwrap()["manifests"][0].get("annotations").is_none());
    }

    #[test]
    fn test_invalid_manifest_is_parse_error() {
        assert!(matches!(
            ManifestList::from_slice(b"{\"layers\": []}"),
            Err(RegistryError::Parse(_))
        ));
    }
}
