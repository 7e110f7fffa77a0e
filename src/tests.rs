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

//! End-to-end scenarios for the resource manager with real loader threads

#[cfg(test)]
mod tests {
    #![allow(clippy::module_inception)]
    use crate::assets::{AssetLibrary, LoadInfo, LoadedAsset, ShaderData, TextureData};
    use crate::{
        AfterFrameEvent, AssetError, LoadStatus, ResourceManager, ResourceManagerConfig, Result,
    };
    use ahash::AHashMap;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant, SystemTime};

    /// In-memory library; texture bytes are filled with the current version
    #[derive(Default)]
    struct MemoryLibrary {
        sizes: Mutex<AHashMap<String, usize>>,
        version: AtomicU8,
    }

    impl MemoryLibrary {
        fn with_textures(textures: &[(&str, usize)]) -> Arc<Self> {
            let library = Self::default();
            for (id, size) in textures {
                library.sizes.lock().insert(id.to_string(), *size);
            }
            Arc::new(library)
        }

        fn bump_version(&self) {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AssetLibrary for MemoryLibrary {
        fn load_texture(&self, asset_id: &str) -> Result<LoadedAsset<TextureData>> {
            let started = Instant::now();
            let size = *self
                .sizes
                .lock()
                .get(asset_id)
                .ok_or_else(|| AssetError::NotFound(asset_id.to_string()))?;
            let fill = self.version.load(Ordering::SeqCst);
            Ok(LoadedAsset {
                info: LoadInfo {
                    bytes_loaded: size,
                    load_time: started,
                },
                data: TextureData::single(1, 1, vec![fill; size]),
            })
        }

        fn load_shader(&self, asset_id: &str) -> Result<LoadedAsset<ShaderData>> {
            let source = format!("// {asset_id}");
            let size = source.len();
            Ok(LoadedAsset::new(ShaderData { source }, size))
        }

        fn last_asset_write_time(&self, _asset_id: &str) -> Option<SystemTime> {
            None
        }
    }

    fn started_manager(ceiling: u64) -> ResourceManager {
        let mut manager =
            ResourceManager::new(ResourceManagerConfig::default().with_memory_ceiling(ceiling));
        manager.initialize().unwrap();
        manager
    }

    /// Run checkpoints until `asset_id` yields texture data
    fn poll_texture(
        manager: &mut ResourceManager,
        asset_id: &str,
        library: &Arc<dyn AssetLibrary>,
    ) -> Option<Arc<TextureData>> {
        for _ in 0..400 {
            if let Some(resource) = manager.get_texture_data(asset_id, library) {
                return Some(resource.data);
            }
            manager.xfb_triggered();
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_request_loads_in_background() {
        let mut manager = started_manager(10_000);
        assert_eq!(manager.worker_count(), 2);
        let library: Arc<dyn AssetLibrary> = MemoryLibrary::with_textures(&[("grass", 256)]);

        assert!(manager.get_texture_data("grass", &library).is_none());
        let data = poll_texture(&mut manager, "grass", &library).unwrap();

        assert_eq!(data.memory_size(), 256);
        assert_eq!(manager.memory_used(), 256);
        assert_eq!(
            manager.load_status("grass"),
            Some(LoadStatus::ResourceDataAvailable)
        );
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(manager.stats().loads_completed, 1);
        manager.shutdown();
    }

    #[test]
    fn test_mixed_asset_types_share_the_loader() {
        let mut manager = started_manager(10_000);
        let library: Arc<dyn AssetLibrary> = MemoryLibrary::with_textures(&[("rock", 64)]);

        manager.get_texture_data("rock", &library);
        manager.get_shader_data("water", &library);

        let mut shader = None;
        for _ in 0..400 {
            manager.xfb_triggered();
            shader = manager.get_shader_data("water", &library);
            if shader.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(shader.unwrap().data.source, "// water");
        assert!(poll_texture(&mut manager, "rock", &library).is_some());
        manager.shutdown();
    }

    #[test]
    fn test_missing_asset_fails_once() {
        let mut manager = started_manager(10_000);
        let library: Arc<dyn AssetLibrary> = MemoryLibrary::with_textures(&[]);

        assert!(poll_texture(&mut manager, "ghost", &library).is_none());
        assert!(manager.has_load_error("ghost"));
        assert_eq!(manager.stats().load_failures, 1);
        assert_eq!(manager.memory_used(), 0);
        manager.shutdown();
    }

    #[test]
    fn test_dirty_asset_reloads_with_new_data() {
        let mut manager = started_manager(10_000);
        let memory = MemoryLibrary::with_textures(&[("sky", 32)]);
        let library: Arc<dyn AssetLibrary> = memory.clone();

        let first = poll_texture(&mut manager, "sky", &library).unwrap();
        assert_eq!(first.slices[0].levels[0].data[0], 0);

        memory.bump_version();
        manager.mark_asset_dirty("sky");
        manager.xfb_triggered();

        let mut reloaded = None;
        for _ in 0..400 {
            manager.xfb_triggered();
            if let Some(resource) = manager.get_texture_data("sky", &library) {
                if resource.data.slices[0].levels[0].data[0] == 1 {
                    reloaded = Some(resource);
                    break;
                }
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(reloaded.is_some());
        // The reload replaced the payload rather than adding to it
        assert_eq!(manager.memory_used(), 32);
        manager.shutdown();
    }

    #[test]
    fn test_memory_pressure_evicts_least_recent() {
        let mut manager = started_manager(1000);
        let library: Arc<dyn AssetLibrary> =
            MemoryLibrary::with_textures(&[("old", 300), ("warm", 300), ("new", 500)]);

        assert!(poll_texture(&mut manager, "old", &library).is_some());
        assert!(poll_texture(&mut manager, "warm", &library).is_some());
        assert!(poll_texture(&mut manager, "new", &library).is_some());

        // Loading "new" took usage to 1100; "old" was least recent
        manager.xfb_triggered();

        assert_eq!(manager.load_status("old"), Some(LoadStatus::Unloaded));
        assert_eq!(manager.memory_used(), 800);
        assert!(manager.memory_used() <= manager.eviction_threshold());
        assert_eq!(manager.stats().evictions, 1);
        assert!(manager.is_active("warm"));
        assert!(manager.is_active("new"));
        manager.shutdown();
    }

    #[test]
    fn test_frame_event_drives_checkpoints() {
        let manager = Arc::new(Mutex::new(started_manager(10_000)));
        let event = AfterFrameEvent::new();
        let hook = ResourceManager::register_checkpoint(&manager, &event);
        let library: Arc<dyn AssetLibrary> = MemoryLibrary::with_textures(&[("lava", 16)]);

        let mut data = None;
        for _ in 0..400 {
            data = manager.lock().get_texture_data("lava", &library);
            if data.is_some() {
                break;
            }
            event.trigger();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(data.is_some());
        assert!(manager.lock().stats().checkpoints > 0);

        drop(hook);
        let checkpoints = manager.lock().stats().checkpoints;
        event.trigger();
        assert_eq!(manager.lock().stats().checkpoints, checkpoints);
        manager.lock().shutdown();
    }

    #[test]
    fn test_reset_keeps_workers() {
        let mut manager = started_manager(10_000);
        let library: Arc<dyn AssetLibrary> = MemoryLibrary::with_textures(&[("dirt", 8)]);
        assert!(poll_texture(&mut manager, "dirt", &library).is_some());

        manager.reset().unwrap();
        assert_eq!(manager.asset_count(), 0);
        assert_eq!(manager.memory_used(), 0);
        assert_eq!(manager.worker_count(), 2);

        assert!(poll_texture(&mut manager, "dirt", &library).is_some());
        manager.shutdown();
        assert_eq!(manager.worker_count(), 0);
    }
}
