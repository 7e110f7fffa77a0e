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

//! Custom resource manager
//!
//! Single authority over which custom assets are resident, loading, or
//! evicted. All bookkeeping is owned by the thread that calls
//! [`ResourceManager::xfb_triggered`]; loader workers only touch assets
//! through their own locks.
//!
//! Each checkpoint runs four phases in order:
//! 1. drain the dirty set (non-blocking; skipped when contended)
//! 2. drain loader results and apply the memory delta
//! 3. evict least recently used assets while over the ceiling
//! 4. hand the pending queue and remaining headroom to the loader

use crate::assets::{
    AssetHandle, AssetId, AssetLibrary, AssetLoader, AssetPayloadType, AssetType, CustomAsset,
    LoadResults, MaterialData, MeshData, RenderTargetData, ShaderData, TextureData,
};
use crate::config::ResourceManagerConfig;
use crate::error::Result;
use crate::frame_event::{AfterFrameEvent, EventHook};
use crate::resources::dirty::AssetDirtyMarker;
use crate::resources::priority_queue::AssetPriorityQueue;
use crate::resources::stats::ResourceManagerStats;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Where an asset is in its load cycle
///
/// `PendingReload -> LoadFinished -> ResourceDataAvailable -> Unloaded ->
/// PendingReload`. A failed load leaves the record pending with the sticky
/// error set until the asset is marked dirty again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    PendingReload,
    LoadFinished,
    ResourceDataAvailable,
    Unloaded,
}

/// Typed payload handed to the renderer
#[derive(Debug)]
pub struct ResourceData<T> {
    pub data: Arc<T>,
    pub last_loaded_time: Instant,
}

impl<T> Clone for ResourceData<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            last_loaded_time: self.last_loaded_time,
        }
    }
}

/// Manager-side bookkeeping for one asset, indexed by handle
struct AssetData {
    asset: Arc<CustomAsset>,
    asset_type: AssetType,
    load_status: LoadStatus,
    /// Set while a reload request is outstanding
    load_request_time: Option<Instant>,
    has_load_error: bool,
}

struct CacheEntry<T> {
    handle: AssetHandle,
    resource: Option<ResourceData<T>>,
}

type TypedCache<T> = AHashMap<AssetId, CacheEntry<T>>;

#[derive(Default)]
struct ResourceCaches {
    textures: TypedCache<TextureData>,
    materials: TypedCache<MaterialData>,
    meshes: TypedCache<MeshData>,
    shaders: TypedCache<ShaderData>,
    render_targets: TypedCache<RenderTargetData>,
}

impl ResourceCaches {
    fn remove(&mut self, asset_type: AssetType, asset_id: &str) {
        match asset_type {
            AssetType::Texture => drop(self.textures.remove(asset_id)),
            AssetType::Material => drop(self.materials.remove(asset_id)),
            AssetType::Mesh => drop(self.meshes.remove(asset_id)),
            AssetType::Shader => drop(self.shaders.remove(asset_id)),
            AssetType::RenderTarget => drop(self.render_targets.remove(asset_id)),
        }
    }

    /// Forget the captured payload but keep the entry (and its error state)
    fn release_resource(&mut self, asset_type: AssetType, asset_id: &str) {
        fn release<T>(cache: &mut TypedCache<T>, asset_id: &str) {
            if let Some(entry) = cache.get_mut(asset_id) {
                entry.resource = None;
            }
        }
        match asset_type {
            AssetType::Texture => release(&mut self.textures, asset_id),
            AssetType::Material => release(&mut self.materials, asset_id),
            AssetType::Mesh => release(&mut self.meshes, asset_id),
            AssetType::Shader => release(&mut self.shaders, asset_id),
            AssetType::RenderTarget => release(&mut self.render_targets, asset_id),
        }
    }

    fn clear(&mut self) {
        self.textures.clear();
        self.materials.clear();
        self.meshes.clear();
        self.shaders.clear();
        self.render_targets.clear();
    }
}

/// Payload types with a per-type cache in the manager
trait CachedResource: AssetPayloadType {
    fn cache(caches: &ResourceCaches) -> &TypedCache<Self>;
    fn cache_mut(caches: &mut ResourceCaches) -> &mut TypedCache<Self>;
}

macro_rules! impl_cached_resource {
    ($ty:ty, $field:ident) => {
        impl CachedResource for $ty {
            fn cache(caches: &ResourceCaches) -> &TypedCache<Self> {
                &caches.$field
            }

            fn cache_mut(caches: &mut ResourceCaches) -> &mut TypedCache<Self> {
                &mut caches.$field
            }
        }
    };
}

impl_cached_resource!(TextureData, textures);
impl_cached_resource!(MaterialData, materials);
impl_cached_resource!(MeshData, meshes);
impl_cached_resource!(ShaderData, shaders);
impl_cached_resource!(RenderTargetData, render_targets);

/// Custom asset resource manager
pub struct ResourceManager {
    config: ResourceManagerConfig,
    loader: AssetLoader,
    /// Indexed by handle; handles are dense and never reused
    asset_data: Vec<AssetData>,
    asset_id_to_handle: AHashMap<AssetId, AssetHandle>,
    active_assets: AssetPriorityQueue<Arc<CustomAsset>>,
    pending_assets: AssetPriorityQueue<Arc<CustomAsset>>,
    caches: ResourceCaches,
    dirty: AssetDirtyMarker,
    memory_ceiling: u64,
    memory_used: u64,
    stats: ResourceManagerStats,
}

impl ResourceManager {
    /// Create a manager; no threads run until [`initialize`](Self::initialize)
    pub fn new(config: ResourceManagerConfig) -> Self {
        Self {
            memory_ceiling: config.memory_ceiling.unwrap_or(0),
            config,
            loader: AssetLoader::new(),
            asset_data: Vec::new(),
            asset_id_to_handle: AHashMap::new(),
            active_assets: AssetPriorityQueue::new(),
            pending_assets: AssetPriorityQueue::new(),
            caches: ResourceCaches::default(),
            dirty: AssetDirtyMarker::new(),
            memory_used: 0,
            stats: ResourceManagerStats::new(),
        }
    }

    /// Resolve the memory ceiling and start the loader workers
    pub fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;

        self.memory_ceiling = self.config.resolve_memory_ceiling();
        if self.memory_ceiling == 0 {
            tracing::error!("not enough system memory for custom resources");
        }

        self.loader
            .resize_worker_threads(self.config.worker_threads)?;

        tracing::info!(
            memory_ceiling = self.memory_ceiling,
            workers = self.config.worker_threads,
            "custom resource manager initialized"
        );
        Ok(())
    }

    /// Stop the loader and drop every asset
    pub fn shutdown(&mut self) {
        self.loader.shutdown();
        self.clear_state();
    }

    /// Drop every asset and restart the loader with the same workers
    pub fn reset(&mut self) -> Result<()> {
        self.loader.reset(true)?;
        self.clear_state();
        Ok(())
    }

    fn clear_state(&mut self) {
        self.active_assets.clear();
        self.pending_assets.clear();
        self.asset_data.clear();
        self.asset_id_to_handle.clear();
        self.caches.clear();
        self.dirty.clear();
        self.memory_used = 0;
    }

    /// Wire [`xfb_triggered`](Self::xfb_triggered) to `event`
    ///
    /// The hook holds the manager weakly; keep the returned hook alive for as
    /// long as checkpoints should run.
    pub fn register_checkpoint(manager: &Arc<Mutex<Self>>, event: &AfterFrameEvent) -> EventHook {
        let manager = Arc::downgrade(manager);
        event.register("ResourceManager", move || {
            if let Some(manager) = manager.upgrade() {
                manager.lock().xfb_triggered();
            }
        })
    }

    /// Queue `asset_id` for reload at the next checkpoint
    pub fn mark_asset_dirty(&self, asset_id: impl Into<AssetId>) {
        self.dirty.mark_asset_dirty(asset_id);
    }

    /// Shareable handle for marking assets dirty from other threads
    pub fn dirty_marker(&self) -> AssetDirtyMarker {
        self.dirty.clone()
    }

    pub fn get_texture_data(
        &mut self,
        asset_id: &str,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<ResourceData<TextureData>> {
        self.get_data_from_asset(asset_id, library)
    }

    pub fn get_material_data(
        &mut self,
        asset_id: &str,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<ResourceData<MaterialData>> {
        self.get_data_from_asset(asset_id, library)
    }

    pub fn get_mesh_data(
        &mut self,
        asset_id: &str,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<ResourceData<MeshData>> {
        self.get_data_from_asset(asset_id, library)
    }

    pub fn get_shader_data(
        &mut self,
        asset_id: &str,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<ResourceData<ShaderData>> {
        self.get_data_from_asset(asset_id, library)
    }

    pub fn get_render_target_data(
        &mut self,
        asset_id: &str,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<ResourceData<RenderTargetData>> {
        self.get_data_from_asset(asset_id, library)
    }

    /// Read path shared by every asset type
    ///
    /// Never blocks: returns cached data, or queues a load and returns `None`
    /// so the caller falls back to its default resource this frame.
    fn get_data_from_asset<T: CachedResource>(
        &mut self,
        asset_id: &str,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<ResourceData<T>> {
        let cached = T::cache(&self.caches)
            .get(asset_id)
            .map(|entry| (entry.handle, entry.resource.clone()));

        if let Some((handle, Some(resource))) = &cached {
            let data = &self.asset_data[handle.index()];
            if data.load_status == LoadStatus::ResourceDataAvailable {
                self.active_assets
                    .make_highest_priority(*handle, Arc::clone(&data.asset));
                self.stats.cache_hits += 1;
                return Some(resource.clone());
            }
        }

        let handle = match cached {
            Some((handle, _)) => handle,
            None => {
                let Some(handle) = self.create_asset(asset_id, T::ASSET_TYPE, library) else {
                    self.stats.cache_misses += 1;
                    return None;
                };
                T::cache_mut(&mut self.caches).insert(
                    asset_id.to_string(),
                    CacheEntry {
                        handle,
                        resource: None,
                    },
                );
                handle
            }
        };

        // Don't retry until the asset is marked dirty again
        if self.asset_data[handle.index()].has_load_error {
            self.stats.cache_misses += 1;
            return None;
        }

        let asset_data = &mut self.asset_data[handle.index()];
        let asset = Arc::clone(&asset_data.asset);
        let result = match (asset.data::<T>(), asset_data.load_status) {
            (Some(data), LoadStatus::LoadFinished) => {
                let resource = ResourceData {
                    data,
                    last_loaded_time: asset.last_loaded_time().unwrap_or_else(Instant::now),
                };
                if let Some(entry) = T::cache_mut(&mut self.caches).get_mut(asset_id) {
                    entry.resource = Some(resource.clone());
                }
                asset_data.load_status = LoadStatus::ResourceDataAvailable;
                Some(resource)
            }
            (None, _) | (_, LoadStatus::PendingReload) => {
                // Still wanted: ask for it ahead of everything else
                self.pending_assets
                    .make_highest_priority(handle, Arc::clone(&asset));
                None
            }
            _ => None,
        };

        // Keep demanded assets from being evicted ahead of idle ones
        self.active_assets.make_highest_priority(handle, asset);

        if result.is_some() {
            self.stats.cache_hits += 1;
        } else {
            self.stats.cache_misses += 1;
        }
        result
    }

    /// Handle for `asset_id`, creating the record on first use
    ///
    /// Returns `None` if the id is already registered as another asset type.
    fn create_asset(
        &mut self,
        asset_id: &str,
        asset_type: AssetType,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<AssetHandle> {
        if let Some(&handle) = self.asset_id_to_handle.get(asset_id) {
            let data = &mut self.asset_data[handle.index()];
            if data.asset_type != asset_type {
                tracing::debug!(
                    asset_id,
                    registered = %data.asset_type,
                    requested = %asset_type,
                    "asset id requested as a different type"
                );
                return None;
            }
            if data.load_status == LoadStatus::Unloaded {
                data.load_status = LoadStatus::PendingReload;
            }
            return Some(handle);
        }

        let handle = AssetHandle::new(self.asset_data.len() as u64);
        let asset = Arc::new(CustomAsset::new(
            Arc::clone(library),
            asset_id.to_string(),
            handle,
            asset_type,
        ));
        self.asset_data.push(AssetData {
            asset,
            asset_type,
            load_status: LoadStatus::PendingReload,
            load_request_time: None,
            has_load_error: false,
        });
        self.asset_id_to_handle.insert(asset_id.to_string(), handle);
        Some(handle)
    }

    /// Per-frame checkpoint
    pub fn xfb_triggered(&mut self) {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!(
            "resource_manager.checkpoint",
            memory_used = self.memory_used,
            pending = self.pending_assets.len()
        )
        .entered();

        self.stats.checkpoints += 1;

        self.process_dirty_assets();
        self.process_loaded_assets();

        if self.memory_used > self.memory_ceiling {
            self.remove_assets_until_below_memory_limit();
        }

        self.schedule_pending_assets();
    }

    fn process_dirty_assets(&mut self) {
        let Some(dirty_assets) = self.dirty.try_take() else {
            tracing::trace!("dirty asset set busy; deferring to next checkpoint");
            return;
        };

        let now = Instant::now();
        for asset_id in dirty_assets {
            let Some(&handle) = self.asset_id_to_handle.get(&asset_id) else {
                continue;
            };

            let data = &mut self.asset_data[handle.index()];
            data.load_status = LoadStatus::PendingReload;
            data.load_request_time = Some(now);
            data.has_load_error = false;
            self.pending_assets
                .insert_asset(handle, Arc::clone(&data.asset));
            tracing::debug!(asset_id = %asset_id, "dirty asset pending reload");
        }
    }

    fn process_loaded_assets(&mut self) {
        let results = self.loader.take_load_results();
        self.apply_load_results(results);
    }

    /// Fold loader results into the bookkeeping
    ///
    /// An asset being reloaded is briefly resident twice (the old payload held
    /// by the caches plus the new one). That duplication is not reflected in
    /// `memory_used`.
    fn apply_load_results(&mut self, results: LoadResults) {
        self.memory_used = self
            .memory_used
            .saturating_add_signed(results.change_in_memory);

        for result in results.results {
            let Some(data) = self.asset_data.get_mut(result.handle.index()) else {
                continue;
            };

            // A reload requested after this load started needs another pass
            if data
                .load_request_time
                .is_some_and(|requested| requested > result.started_at)
            {
                self.stats.stale_loads += 1;
                tracing::debug!(
                    asset_id = data.asset.asset_id(),
                    "load started before latest reload request; keeping pending"
                );
                continue;
            }

            self.pending_assets.remove_asset(result.handle);
            data.load_request_time = None;

            if result.success {
                self.active_assets
                    .make_highest_priority(result.handle, Arc::clone(&data.asset));
                data.load_status = LoadStatus::LoadFinished;
                self.stats.loads_completed += 1;
            } else {
                data.has_load_error = true;
                self.active_assets.remove_asset(result.handle);
                self.caches
                    .release_resource(data.asset_type, data.asset.asset_id());
                self.stats.load_failures += 1;
                tracing::warn!(
                    asset_id = data.asset.asset_id(),
                    "custom asset failed to load; waiting for it to change"
                );
            }
        }
    }

    /// Evict least recently used assets down to the eviction threshold
    fn remove_assets_until_below_memory_limit(&mut self) {
        let threshold = self.eviction_threshold();
        if self.memory_used > threshold {
            tracing::info!(
                memory_used = self.memory_used,
                memory_ceiling = self.memory_ceiling,
                threshold,
                "custom asset memory over threshold; evicting"
            );
        }

        while self.memory_used > threshold {
            let Some((handle, asset)) = self.active_assets.remove_lowest_priority_asset() else {
                break;
            };

            let data = &mut self.asset_data[handle.index()];
            self.caches.remove(data.asset_type, asset.asset_id());

            let bytes_unloaded = asset.unload() as u64;
            self.memory_used = self.memory_used.saturating_sub(bytes_unloaded);
            data.load_status = LoadStatus::Unloaded;
            data.load_request_time = None;

            self.stats.evictions += 1;
            self.stats.bytes_evicted += bytes_unloaded;
            tracing::debug!(asset_id = asset.asset_id(), bytes_unloaded, "evicted custom asset");
        }
    }

    fn schedule_pending_assets(&mut self) {
        if self.pending_assets.is_empty() || self.memory_used > self.memory_ceiling {
            return;
        }

        let allowed_memory = self.memory_ceiling - self.memory_used;
        self.loader
            .schedule_assets_to_load(self.pending_assets.elements(), allowed_memory);
    }

    pub fn memory_used(&self) -> u64 {
        self.memory_used
    }

    pub fn memory_ceiling(&self) -> u64 {
        self.memory_ceiling
    }

    pub fn eviction_threshold(&self) -> u64 {
        self.config.eviction_threshold(self.memory_ceiling)
    }

    pub fn active_count(&self) -> usize {
        self.active_assets.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_assets.len()
    }

    /// Number of asset records (handles handed out)
    pub fn asset_count(&self) -> usize {
        self.asset_data.len()
    }

    pub fn handle_for(&self, asset_id: &str) -> Option<AssetHandle> {
        self.asset_id_to_handle.get(asset_id).copied()
    }

    pub fn asset(&self, asset_id: &str) -> Option<Arc<CustomAsset>> {
        let handle = self.handle_for(asset_id)?;
        Some(Arc::clone(&self.asset_data[handle.index()].asset))
    }

    pub fn load_status(&self, asset_id: &str) -> Option<LoadStatus> {
        let handle = self.handle_for(asset_id)?;
        Some(self.asset_data[handle.index()].load_status)
    }

    pub fn has_load_error(&self, asset_id: &str) -> bool {
        self.handle_for(asset_id)
            .is_some_and(|handle| self.asset_data[handle.index()].has_load_error)
    }

    pub fn is_active(&self, asset_id: &str) -> bool {
        self.handle_for(asset_id)
            .is_some_and(|handle| self.active_assets.contains(handle))
    }

    pub fn is_pending(&self, asset_id: &str) -> bool {
        self.handle_for(asset_id)
            .is_some_and(|handle| self.pending_assets.contains(handle))
    }

    pub fn stats(&self) -> &ResourceManagerStats {
        &self.stats
    }

    pub fn config(&self) -> &ResourceManagerConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.loader.worker_count()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(ResourceManagerConfig::default())
    }
}
