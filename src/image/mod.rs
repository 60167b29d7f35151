//! Image model: references, manifest documents and the layer catalog
//!
//! [`ImageReference`] names an image, [`ManifestList`] and [`ArchManifest`] are
//! the registry documents describing it, and [`LayerCatalog`] is the ordered
//! list of [`LayerDescriptor`]s the download engine concatenates into one
//! archive.

pub mod catalog;
pub mod layer;
pub mod manifest;
pub mod reference;

pub use catalog::{LayerCatalog, LayerPosition};
pub use layer::LayerDescriptor;
pub use manifest::{ArchManifest, ManifestLayer, ManifestList, Platform, PlatformManifest};
pub use reference::ImageReference;
