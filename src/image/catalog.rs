//! Ordered layer catalog for one (image, architecture) pair.
//!
//! The output archive is the raw concatenation of every layer blob in catalog
//! order, so a byte offset into the archive maps to exactly one layer and an
//! offset inside it. [`LayerCatalog::locate`] computes that mapping.

use crate::image::layer::{EXTENSION_TAR, LayerDescriptor};
use crate::image::reference::ImageReference;

#[derive(Debug, Clone)]
pub struct LayerCatalog {
    image: ImageReference,
    arch: String,
    layers: Vec<LayerDescriptor>,
}

/// Position of the next byte to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerPosition<'a> {
    pub index: usize,
    pub layer: &'a LayerDescriptor,
    /// Bytes of this layer already present in the archive
    pub offset: u64,
}

impl<'a> LayerPosition<'a> {
    /// Bytes still missing from this layer
    pub fn remaining(&self) -> u64 {
        self.layer.size - self.offset
    }
}

impl LayerCatalog {
    pub fn new(image: ImageReference, arch: impl Into<String>, layers: Vec<LayerDescriptor>) -> Self {
        Self {
            image,
            arch: arch.into(),
            layers,
        }
    }

    pub fn image(&self) -> &ImageReference {
        &self.image
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Sum of all layer sizes
    pub fn total_size(&self) -> u64 {
        self.layers.iter().map(|layer| layer.size).sum()
    }

    /// Taken from the first layer and assumed for the whole archive
    pub fn extension(&self) -> &'static str {
        self.layers
            .first()
            .map(LayerDescriptor::extension)
            .unwrap_or(EXTENSION_TAR)
    }

    /// `<repository>-<name>-<tag>-<arch>`
    pub fn name(&self) -> String {
        self.image.file_stem(&self.arch)
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.name(), self.extension())
    }

    /// Map an archive byte count to the layer holding the next byte.
    ///
    /// The first layer whose cumulative size exceeds `downloaded` is current;
    /// returns `None` once `downloaded` reaches the total.
    pub fn locate(&self, downloaded: u64) -> Option<LayerPosition<'_>> {
        let mut sum = 0u64;
        for (index, layer) in self.layers.iter().enumerate() {
            sum += layer.size;
            if sum > downloaded {
                let remaining = sum - downloaded;
                return Some(LayerPosition {
                    index,
                    layer,
                    offset: layer.size - remaining,
                });
            }
        }
        None
    }
}
