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

//! Loadable custom asset

use crate::assets::library::AssetLibrary;
use crate::assets::payload::{
    AssetPayload, AssetPayloadType, MaterialData, MeshData, RenderTargetData, ShaderData,
    TextureData,
};
use crate::assets::{AssetHandle, AssetId, AssetType};
use crate::error::AssetError;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Payload plus the accounting that must change with it
#[derive(Default)]
struct LoadState {
    payload: Option<AssetPayload>,
    bytes_loaded: usize,
    last_loaded_time: Option<Instant>,
}

/// A lazily loaded unit of custom content
///
/// Payload, byte size and last-load time change together under the
/// per-asset lock, and only after the library call has returned, so readers
/// never wait on a load in progress.
pub struct CustomAsset {
    library: Arc<dyn AssetLibrary>,
    asset_id: AssetId,
    handle: AssetHandle,
    asset_type: AssetType,
    state: RwLock<LoadState>,
}

impl CustomAsset {
    pub fn new(
        library: Arc<dyn AssetLibrary>,
        asset_id: AssetId,
        handle: AssetHandle,
        asset_type: AssetType,
    ) -> Self {
        Self {
            library,
            asset_id,
            handle,
            asset_type,
            state: RwLock::new(LoadState::default()),
        }
    }

    /// Load the payload through the owning library
    ///
    /// Returns the bytes loaded; zero means the load failed and any previous
    /// payload was left in place.
    pub fn load(&self) -> usize {
        match self.asset_type {
            AssetType::Texture => self.load_typed::<TextureData>(),
            AssetType::Material => self.load_typed::<MaterialData>(),
            AssetType::Mesh => self.load_typed::<MeshData>(),
            AssetType::Shader => self.load_typed::<ShaderData>(),
            AssetType::RenderTarget => self.load_typed::<RenderTargetData>(),
        }
    }

    fn load_typed<T: AssetPayloadType>(&self) -> usize {
        let loaded = T::load_from(self.library.as_ref(), &self.asset_id).and_then(|loaded| {
            if loaded.info.bytes_loaded == 0 {
                Err(AssetError::LoadFailed(format!(
                    "library returned no data for '{}'",
                    self.asset_id
                )))
            } else {
                Ok(loaded)
            }
        });
        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(asset_id = %self.asset_id, error = %err, "custom asset failed to load");
                return 0;
            }
        };

        let bytes_loaded = loaded.info.bytes_loaded;

        let payload = T::into_payload(Arc::new(loaded.data));
        let mut state = self.state.write();
        state.payload = Some(payload);
        state.bytes_loaded = bytes_loaded;
        state.last_loaded_time = Some(loaded.info.load_time);
        bytes_loaded
    }

    /// Drop the payload, returning the bytes it accounted for
    pub fn unload(&self) -> usize {
        let mut state = self.state.write();
        state.payload = None;
        std::mem::take(&mut state.bytes_loaded)
    }

    /// Current payload of type `T`, if loaded
    ///
    /// A concurrent reload may replace the payload at any time; re-fetch each
    /// frame instead of holding on to the returned `Arc`.
    pub fn data<T: AssetPayloadType>(&self) -> Option<Arc<T>> {
        self.state.read().payload.as_ref().and_then(T::from_payload)
    }

    pub fn payload(&self) -> Option<AssetPayload> {
        self.state.read().payload.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().payload.is_some()
    }

    /// On-disk modification time, as reported by the owning library
    pub fn last_write_time(&self) -> Option<SystemTime> {
        self.library.last_asset_write_time(&self.asset_id)
    }

    pub fn byte_size_in_memory(&self) -> usize {
        self.state.read().bytes_loaded
    }

    pub fn last_loaded_time(&self) -> Option<Instant> {
        self.state.read().last_loaded_time
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn handle(&self) -> AssetHandle {
        self.handle
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn library(&self) -> &Arc<dyn AssetLibrary> {
        &self.library
    }
}

impl fmt::Debug for CustomAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAsset")
            .field("asset_id", &self.asset_id)
            .field("handle", &self.handle)
            .field("asset_type", &self.asset_type)
            .field("bytes_loaded", &self.byte_size_in_memory())
            .finish()
    }
}
