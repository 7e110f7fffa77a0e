use crate::assets::library::{AssetLibrary, LoadInfo, LoadedAsset};
use crate::assets::payload::{MaterialData, RenderTargetData, ShaderData, TextureData};
use crate::assets::{AssetId, AssetType};
use crate::error::{AssetError, Result};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Decodes encoded image bytes (DDS, PNG, ...) into texture data
pub trait TextureDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<TextureData>;
}

/// Asset library reading assets straight from files under a root directory
///
/// Shaders load as UTF-8 text, materials and render targets as JSON.
/// Textures need a [`TextureDecoder`]; meshes are not supported.
pub struct FilesystemAssetLibrary {
    root: PathBuf,
    paths: RwLock<AHashMap<AssetId, PathBuf>>,
    texture_decoder: Option<Arc<dyn TextureDecoder>>,
}

impl FilesystemAssetLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: RwLock::new(AHashMap::new()),
            texture_decoder: None,
        }
    }

    pub fn with_texture_decoder(mut self, decoder: Arc<dyn TextureDecoder>) -> Self {
        self.texture_decoder = Some(decoder);
        self
    }

    /// Map `asset_id` to a file, relative to the library root
    pub fn set_asset_path(&self, asset_id: impl Into<AssetId>, path: impl Into<PathBuf>) {
        self.paths.write().insert(asset_id.into(), path.into());
    }

    /// Map every file with `extension` in `directory` to an id of its file stem
    ///
    /// Returns the number of assets registered.
    pub fn register_directory(&self, directory: impl AsRef<Path>, extension: &str) -> Result<usize> {
        let directory = directory.as_ref();
        let full = self.root.join(directory);
        let entries = fs::read_dir(&full).map_err(|e| {
            AssetError::Io(format!("Failed to read directory {}: {e}", full.display()))
        })?;

        let mut registered = 0;
        let mut paths = self.paths.write();
        for entry in entries {
            let path = entry
                .map_err(|e| AssetError::Io(format!("Failed to read entry: {e}")))?
                .path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != extension) {
                continue;
            }
            let (Some(stem), Some(name)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.file_name(),
            ) else {
                continue;
            };
            paths.insert(stem.to_string(), directory.join(name));
            registered += 1;
        }

        Ok(registered)
    }

    pub fn asset_count(&self) -> usize {
        self.paths.read().len()
    }

    fn resolve(&self, asset_id: &str) -> Result<PathBuf> {
        self.paths
            .read()
            .get(asset_id)
            .map(|path| self.root.join(path))
            .ok_or_else(|| AssetError::NotFound(asset_id.to_string()))
    }

    fn read_bytes(&self, asset_id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(asset_id)?;
        fs::read(&path).map_err(|e| {
            AssetError::Io(format!("Failed to load file {}: {e}", path.display()))
        })
    }

    fn read_text(&self, asset_id: &str) -> Result<String> {
        let path = self.resolve(asset_id)?;
        fs::read_to_string(&path).map_err(|e| {
            AssetError::Io(format!("Failed to load file {}: {e}", path.display()))
        })
    }
}

/// Stamped with the time the read started, so an edit landing mid-load is
/// newer than the data and gets reloaded.
fn loaded<T>(data: T, bytes_loaded: usize, started: Instant) -> LoadedAsset<T> {
    LoadedAsset {
        info: LoadInfo {
            bytes_loaded,
            load_time: started,
        },
        data,
    }
}

impl AssetLibrary for FilesystemAssetLibrary {
    fn load_texture(&self, asset_id: &str) -> Result<LoadedAsset<TextureData>> {
        let started = Instant::now();
        let decoder = self.texture_decoder.as_ref().ok_or_else(|| AssetError::Unsupported {
            asset_type: AssetType::Texture,
            asset_id: asset_id.to_string(),
        })?;
        let data = decoder.decode(&self.read_bytes(asset_id)?)?;
        let size = data.memory_size();
        Ok(loaded(data, size, started))
    }

    fn load_material(&self, asset_id: &str) -> Result<LoadedAsset<MaterialData>> {
        let started = Instant::now();
        let data: MaterialData = serde_json::from_str(&self.read_text(asset_id)?)?;
        let size = data.memory_size();
        Ok(loaded(data, size, started))
    }

    fn load_shader(&self, asset_id: &str) -> Result<LoadedAsset<ShaderData>> {
        let started = Instant::now();
        let data = ShaderData {
            source: self.read_text(asset_id)?,
        };
        let size = data.memory_size();
        Ok(loaded(data, size, started))
    }

    fn load_render_target(&self, asset_id: &str) -> Result<LoadedAsset<RenderTargetData>> {
        let started = Instant::now();
        let data: RenderTargetData = serde_json::from_str(&self.read_text(asset_id)?)?;
        if data.width == 0 || data.height == 0 {
            return Err(AssetError::Parse(format!(
                "Render target '{asset_id}' has zero size"
            )));
        }
        let size = data.memory_size();
        Ok(loaded(data, size, started))
    }

    fn last_asset_write_time(&self, asset_id: &str) -> Option<SystemTime> {
        let path = self.resolve(asset_id).ok()?;
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}
