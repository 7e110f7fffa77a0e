// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Custom asset resource manager
//!
//! Loads user-supplied replacement textures, materials, meshes, shaders and
//! render targets in the background, keeps the most recently used ones
//! resident under a memory ceiling, and reloads assets when they change.
//!
//! The render thread asks [`ResourceManager`] for typed data every frame and
//! falls back to its own resource while the answer is `None`. Once per
//! presented frame [`ResourceManager::xfb_triggered`] (usually wired through
//! [`AfterFrameEvent`]) folds in finished loads, evicts, and schedules more.

pub mod assets;
pub mod config;
pub mod error;
pub mod frame_event;
#[cfg(feature = "profiling")]
pub mod profiling;
pub mod resources;

#[cfg(test)]
mod tests;

pub use assets::{
    AssetHandle, AssetId, AssetLibrary, AssetLoader, AssetPayload, AssetType, CustomAsset,
    FilesystemAssetLibrary, LoadInfo, LoadedAsset, MaterialData, MeshData, RenderTargetData,
    ShaderData, TextureData,
};
pub use config::ResourceManagerConfig;
pub use error::*;
pub use frame_event::{AfterFrameEvent, EventHook};
pub use resources::{
    AssetDirtyMarker, AssetPriorityQueue, LoadStatus, ResourceData, ResourceManager,
    ResourceManagerStats,
};
