use crate::config::RegistryConfig;
use crate::image::manifest::ManifestLayer;
use serde::Serialize;

pub const EXTENSION_TAR_GZ: &str = ".tar.gz";
pub const EXTENSION_TAR: &str = ".tar";

/// One layer of an architecture manifest, with its derived blob URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub media_type: String,
    pub size: u64,
    pub digest: String,
    pub url: String,
}

impl LayerDescriptor {
    pub fn from_manifest(config: &RegistryConfig, scope: &str, layer: &ManifestLayer) -> Self {
        Self {
            media_type: layer.media_type.clone(),
            size: layer.size,
            digest: layer.digest.clone(),
            url: config.blob_url(scope, &layer.digest),
        }
    }

    /// Archive extension implied by the media type suffix
    pub fn extension(&self) -> &'static str {
        extension_for(&self.media_type)
    }
}

/// `.tar.gz` when the last four characters of the media type spell `gzip`
pub fn extension_for(media_type: &str) -> &'static str {
    let start = media_type
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(0);
    if media_type[start..].eq_ignore_ascii_case("gzip") {
        EXTENSION_TAR_GZ
    } else {
        EXTENSION_TAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_media_type() {
        assert_eq!(extension_for("application/vnd.docker.image.rootfs.diff.tar.gzip"), ".tar.gz");
        assert_eq!(extension_for("application/vnd.oci.image.layer.v1.tar+gzip"), ".tar.gz");
        assert_eq!(extension_for("application/vnd.oci.image.layer.v1.tar+GZIP"), ".tar.gz");
        assert_eq!(extension_for("application/vnd.oci.image.layer.v1.tar"), ".tar");
        assert_eq!(extension_for("application/vnd.oci.image.layer.v1.tar+zstd"), ".tar");
        assert_eq!(extension_for("gzip+json"), ".tar");
        assert_eq!(extension_for("zip"), ".tar");
        assert_eq!(extension_for(""), ".tar");
    }

    #[test]
    fn test_blob_url_is_derived() {
        let config = RegistryConfig::new("http://127.0.0.1:5000/v2");
        let layer = ManifestLayer {
            media_type: "application/vnd.oci.image.layer.v1.tar+gzip".to_string(),
            size: 10,
            digest: "sha256:abc".to_string(),
        };
        let descriptor = LayerDescriptor::from_manifest(&config, "library/alpine", &layer);
        assert_eq!(descriptor.url, "http://127.0.0.1:5000/v2/library/alpine/blobs/sha256:abc");
        assert_eq!(descriptor.extension(), ".tar.gz");
    }
}
