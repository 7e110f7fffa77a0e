use crate::assets::payload::{MaterialData, MeshData, RenderTargetData, ShaderData, TextureData};
use crate::assets::AssetType;
use crate::error::{AssetError, Result};
use std::time::{Instant, SystemTime};

/// Outcome metadata of a single library load
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadInfo {
    /// Approximate in-memory size of the produced payload; zero means failure
    pub bytes_loaded: usize,
    /// When the data was produced; reported as the asset's last-load time
    pub load_time: Instant,
}

impl LoadInfo {
    /// Load info stamped with the current time
    pub fn now(bytes_loaded: usize) -> Self {
        Self {
            bytes_loaded,
            load_time: Instant::now(),
        }
    }
}

/// Payload plus its load info, as returned by an [`AssetLibrary`]
#[derive(Clone, Debug)]
pub struct LoadedAsset<T> {
    pub info: LoadInfo,
    pub data: T,
}

impl<T> LoadedAsset<T> {
    pub fn new(data: T, bytes_loaded: usize) -> Self {
        Self {
            info: LoadInfo::now(bytes_loaded),
            data,
        }
    }
}

/// Capability that materializes asset ids into typed payloads
///
/// Called from loader worker threads. Implementations must tolerate
/// concurrent calls for *different* asset ids; the loader never loads the
/// same id on two threads at once.
///
/// Every `load_*` defaults to [`AssetError::Unsupported`], so a library only
/// implements the types it can produce.
pub trait AssetLibrary: Send + Sync {
    fn load_texture(&self, asset_id: &str) -> Result<LoadedAsset<TextureData>> {
        Err(unsupported(AssetType::Texture, asset_id))
    }

    fn load_material(&self, asset_id: &str) -> Result<LoadedAsset<MaterialData>> {
        Err(unsupported(AssetType::Material, asset_id))
    }

    fn load_mesh(&self, asset_id: &str) -> Result<LoadedAsset<MeshData>> {
        Err(unsupported(AssetType::Mesh, asset_id))
    }

    fn load_shader(&self, asset_id: &str) -> Result<LoadedAsset<ShaderData>> {
        Err(unsupported(AssetType::Shader, asset_id))
    }

    fn load_render_target(&self, asset_id: &str) -> Result<LoadedAsset<RenderTargetData>> {
        Err(unsupported(AssetType::RenderTarget, asset_id))
    }

    /// Last on-disk modification time, if the library can tell
    fn last_asset_write_time(&self, asset_id: &str) -> Option<SystemTime>;
}

fn unsupported(asset_type: AssetType, asset_id: &str) -> AssetError {
    AssetError::Unsupported {
        asset_type,
        asset_id: asset_id.to_string(),
    }
}
