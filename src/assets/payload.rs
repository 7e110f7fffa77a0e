use crate::assets::library::{AssetLibrary, LoadedAsset};
use crate::assets::{AssetId, AssetType};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ties a typed payload to its asset type tag and its library call
pub trait AssetPayloadType: Send + Sync + Sized + 'static {
    const ASSET_TYPE: AssetType;

    /// Materialize this payload through the owning library
    fn load_from(library: &dyn AssetLibrary, asset_id: &str) -> Result<LoadedAsset<Self>>;

    fn into_payload(data: Arc<Self>) -> AssetPayload;

    /// Returns the typed data if `payload` holds this type
    fn from_payload(payload: &AssetPayload) -> Option<Arc<Self>>;
}

/// Type-erased payload held by a [`CustomAsset`](crate::assets::CustomAsset)
#[derive(Clone, Debug)]
pub enum AssetPayload {
    Texture(Arc<TextureData>),
    Material(Arc<MaterialData>),
    Mesh(Arc<MeshData>),
    Shader(Arc<ShaderData>),
    RenderTarget(Arc<RenderTargetData>),
}

impl AssetPayload {
    pub fn asset_type(&self) -> AssetType {
        match self {
            AssetPayload::Texture(_) => AssetType::Texture,
            AssetPayload::Material(_) => AssetType::Material,
            AssetPayload::Mesh(_) => AssetType::Mesh,
            AssetPayload::Shader(_) => AssetType::Shader,
            AssetPayload::RenderTarget(_) => AssetType::RenderTarget,
        }
    }
}

/// Texture layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureKind {
    #[default]
    Color,
    Cubemap,
    Array,
}

/// One decoded mip level
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// One layer (array slice or cube face) with its mip chain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureSlice {
    pub levels: Vec<MipLevel>,
}

/// Decoded texture ready for upload
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureData {
    pub kind: TextureKind,
    pub slices: Vec<TextureSlice>,
}

impl TextureData {
    /// Single-slice, single-level texture
    pub fn single(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            kind: TextureKind::Color,
            slices: vec![TextureSlice {
                levels: vec![MipLevel {
                    width,
                    height,
                    data,
                }],
            }],
        }
    }

    pub fn memory_size(&self) -> usize {
        self.slices
            .iter()
            .flat_map(|slice| slice.levels.iter())
            .map(|level| level.data.len())
            .sum()
    }
}

impl AssetPayloadType for TextureData {
    const ASSET_TYPE: AssetType = AssetType::Texture;

    fn load_from(library: &dyn AssetLibrary, asset_id: &str) -> Result<LoadedAsset<Self>> {
        library.load_texture(asset_id)
    }

    fn into_payload(data: Arc<Self>) -> AssetPayload {
        AssetPayload::Texture(data)
    }

    fn from_payload(payload: &AssetPayload) -> Option<Arc<Self>> {
        match payload {
            AssetPayload::Texture(data) => Some(Arc::clone(data)),
            _ => None,
        }
    }
}

/// Scalar or vector material parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MaterialProperty {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec4([f32; 4]),
}

/// Material description; referenced textures and shader stay separate assets
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialData {
    pub shader_asset: AssetId,
    #[serde(default)]
    pub textures: BTreeMap<String, AssetId>,
    #[serde(default)]
    pub properties: BTreeMap<String, MaterialProperty>,
}

impl MaterialData {
    pub fn memory_size(&self) -> usize {
        let textures: usize = self
            .textures
            .iter()
            .map(|(sampler, id)| sampler.len() + id.len())
            .sum();
        let properties: usize = self
            .properties
            .keys()
            .map(|name| name.len() + std::mem::size_of::<MaterialProperty>())
            .sum();
        std::mem::size_of::<Self>() + self.shader_asset.len() + textures + properties
    }
}

impl AssetPayloadType for MaterialData {
    const ASSET_TYPE: AssetType = AssetType::Material;

    fn load_from(library: &dyn AssetLibrary, asset_id: &str) -> Result<LoadedAsset<Self>> {
        library.load_material(asset_id)
    }

    fn into_payload(data: Arc<Self>) -> AssetPayload {
        AssetPayload::Material(data)
    }

    fn from_payload(payload: &AssetPayload) -> Option<Arc<Self>> {
        match payload {
            AssetPayload::Material(data) => Some(Arc::clone(data)),
            _ => None,
        }
    }
}

/// Converted mesh geometry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshData {
    pub vertex_stride: u32,
    pub vertex_data: Vec<u8>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn memory_size(&self) -> usize {
        self.vertex_data.len() + self.indices.len() * std::mem::size_of::<u32>()
    }
}

impl AssetPayloadType for MeshData {
    const ASSET_TYPE: AssetType = AssetType::Mesh;

    fn load_from(library: &dyn AssetLibrary, asset_id: &str) -> Result<LoadedAsset<Self>> {
        library.load_mesh(asset_id)
    }

    fn into_payload(data: Arc<Self>) -> AssetPayload {
        AssetPayload::Mesh(data)
    }

    fn from_payload(payload: &AssetPayload) -> Option<Arc<Self>> {
        match payload {
            AssetPayload::Mesh(data) => Some(Arc::clone(data)),
            _ => None,
        }
    }
}

/// Shader source text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderData {
    pub source: String,
}

impl ShaderData {
    pub fn memory_size(&self) -> usize {
        self.source.len()
    }
}

impl AssetPayloadType for ShaderData {
    const ASSET_TYPE: AssetType = AssetType::Shader;

    fn load_from(library: &dyn AssetLibrary, asset_id: &str) -> Result<LoadedAsset<Self>> {
        library.load_shader(asset_id)
    }

    fn into_payload(data: Arc<Self>) -> AssetPayload {
        AssetPayload::Shader(data)
    }

    fn from_payload(payload: &AssetPayload) -> Option<Arc<Self>> {
        match payload {
            AssetPayload::Shader(data) => Some(Arc::clone(data)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTargetFormat {
    #[default]
    Rgba8,
    Rgba16F,
    Rgba32F,
    Depth32F,
}

/// Render target description
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTargetData {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub format: RenderTargetFormat,
}

impl RenderTargetData {
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

impl AssetPayloadType for RenderTargetData {
    const ASSET_TYPE: AssetType = AssetType::RenderTarget;

    fn load_from(library: &dyn AssetLibrary, asset_id: &str) -> Result<LoadedAsset<Self>> {
        library.load_render_target(asset_id)
    }

    fn into_payload(data: Arc<Self>) -> AssetPayload {
        AssetPayload::RenderTarget(data)
    }

    fn from_payload(payload: &AssetPayload) -> Option<Arc<Self>> {
        match payload {
            AssetPayload::RenderTarget(data) => Some(Arc::clone(data)),
            _ => None,
        }
    }
}
