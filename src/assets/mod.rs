// Custom Asset Module
//
// Provides the asset side of the resource manager:
// - Lazily loaded, lock-protected assets
// - Typed payloads for each asset type
// - The external asset library capability
// - A background loader worker pool

pub mod asset;
pub mod filesystem;
pub mod library;
pub mod loader;
pub mod payload;

pub use asset::CustomAsset;
pub use filesystem::{FilesystemAssetLibrary, TextureDecoder};
pub use library::{AssetLibrary, LoadInfo, LoadedAsset};
pub use loader::{AssetLoader, LoadResult, LoadResults};
pub use payload::{
    AssetPayload, AssetPayloadType, MaterialData, MaterialProperty, MeshData, MipLevel,
    RenderTargetData, RenderTargetFormat, ShaderData, TextureData, TextureKind, TextureSlice,
};

use std::fmt;

/// Stable external key of an asset (e.g. a texture path key)
pub type AssetId = String;

/// Dense internal proxy for an [`AssetId`]
///
/// Handles are handed out in creation order starting at zero and are never
/// reused while the owning manager is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetHandle(u64);

impl AssetHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    /// Slot of this handle in dense per-handle tables
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of payload an asset materializes into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetType {
    Texture,
    Material,
    Mesh,
    Shader,
    RenderTarget,
}

impl AssetType {
    pub fn name(&self) -> &'static str {
        match self {
            AssetType::Texture => "Texture",
            AssetType::Material => "Material",
            AssetType::Mesh => "Mesh",
            AssetType::Shader => "Shader",
            AssetType::RenderTarget => "RenderTarget",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_index_matches_id() {
        let handle = AssetHandle::new(42);
        assert_eq!(handle.id(), 42);
        assert_eq!(handle.index(), 42);
        assert_eq!(handle.to_string(), "#42");
    }

    #[test]
    fn test_asset_type_names() {
        assert_eq!(AssetType::RenderTarget.to_string(), "RenderTarget");
        assert_eq!(AssetType::Texture.name(), "Texture");
    }
}
