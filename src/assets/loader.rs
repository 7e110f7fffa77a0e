use crate::assets::{AssetHandle, CustomAsset};
use crate::error::{AssetError, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Worker count used by [`AssetLoader::initialize`]
pub const DEFAULT_WORKER_THREADS: usize = 2;

/// Outcome of one background load
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadResult {
    pub handle: AssetHandle,
    pub success: bool,
    /// When the worker picked the asset up
    pub started_at: Instant,
}

/// Everything completed since the previous [`AssetLoader::take_load_results`]
#[derive(Debug, Default)]
pub struct LoadResults {
    pub results: Vec<LoadResult>,
    /// Net bytes gained (positive) or freed (negative) by the workers
    pub change_in_memory: i64,
}

struct LoadQueue {
    assets: VecDeque<Arc<CustomAsset>>,
    allowed_memory: u64,
    /// Handles a worker is currently loading
    in_flight: FxHashSet<AssetHandle>,
    exit: bool,
}

struct LoaderShared {
    queue: Mutex<LoadQueue>,
    wake: Condvar,
    results: Mutex<Vec<LoadResult>>,
    change_in_memory: AtomicI64,
}

impl LoaderShared {
    fn budget_exhausted(&self, allowed_memory: u64) -> bool {
        let allowed = i64::try_from(allowed_memory).unwrap_or(i64::MAX);
        self.change_in_memory.load(Ordering::Acquire) > allowed
    }
}

/// Fixed pool of worker threads loading assets in the background
///
/// The manager thread hands over its whole want-list once per checkpoint and
/// collects results without ever blocking on a load.
pub struct AssetLoader {
    shared: Arc<LoaderShared>,
    workers: Vec<JoinHandle<()>>,
}

impl AssetLoader {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(LoaderShared {
                queue: Mutex::new(LoadQueue {
                    assets: VecDeque::new(),
                    allowed_memory: 0,
                    in_flight: FxHashSet::default(),
                    exit: false,
                }),
                wake: Condvar::new(),
                results: Mutex::new(Vec::new()),
                change_in_memory: AtomicI64::new(0),
            }),
            workers: Vec::new(),
        }
    }

    /// Start the default number of workers
    pub fn initialize(&mut self) -> Result<()> {
        self.resize_worker_threads(DEFAULT_WORKER_THREADS)
    }

    /// Stop all workers, dropping queued and completed state
    pub fn shutdown(&mut self) {
        self.stop_worker_threads();
        self.clear_state();
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Restart the pool with `count` workers
    pub fn resize_worker_threads(&mut self, count: usize) -> Result<()> {
        if self.workers.len() == count {
            return Ok(());
        }
        self.stop_worker_threads();
        self.start_worker_threads(count)
    }

    fn start_worker_threads(&mut self, count: usize) -> Result<()> {
        for thread_index in 0..count {
            let shared = Arc::clone(&self.shared);
            let worker = std::thread::Builder::new()
                .name(format!("Asset Loader {thread_index}"))
                .spawn(move || worker_thread_run(shared, thread_index))
                .map_err(|e| {
                    tracing::error!(thread_index, error = %e, "failed to spawn asset loader worker");
                    AssetError::WorkerSpawn(e.to_string())
                })?;
            self.workers.push(worker);
        }
        tracing::info!(workers = count, "asset loader workers started");
        Ok(())
    }

    fn stop_worker_threads(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        {
            let mut queue = self.shared.queue.lock();
            queue.exit = true;
            self.shared.wake.notify_all();
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("asset loader worker panicked");
            }
        }

        self.shared.queue.lock().exit = false;
    }

    /// Replace the work queue with `assets` and wake the workers
    ///
    /// Not additive: callers submit their full want-list every time. Workers
    /// stop picking up new work once the net memory loaded since the last
    /// [`take_load_results`](Self::take_load_results) exceeds `allowed_memory`.
    pub fn schedule_assets_to_load(&self, assets: Vec<Arc<CustomAsset>>, allowed_memory: u64) {
        if assets.is_empty() {
            return;
        }

        let mut queue = self.shared.queue.lock();
        queue.allowed_memory = allowed_memory;
        queue.assets = assets.into();
        self.shared.wake.notify_all();
    }

    /// Drain completed results and the net memory delta
    ///
    /// Never waits on in-progress loads; those show up in a later call.
    pub fn take_load_results(&self) -> LoadResults {
        let mut results = self.shared.results.lock();
        LoadResults {
            results: std::mem::take(&mut *results),
            change_in_memory: self.shared.change_in_memory.swap(0, Ordering::AcqRel),
        }
    }

    /// Stop workers, clear all state, and optionally restart the same count
    pub fn reset(&mut self, restart_worker_threads: bool) -> Result<()> {
        let worker_count = self.workers.len();
        self.stop_worker_threads();
        self.clear_state();

        if restart_worker_threads {
            self.start_worker_threads(worker_count)?;
        }
        Ok(())
    }

    fn clear_state(&self) {
        {
            let mut queue = self.shared.queue.lock();
            queue.assets.clear();
            queue.in_flight.clear();
            queue.allowed_memory = 0;
        }
        self.shared.results.lock().clear();
        self.shared.change_in_memory.store(0, Ordering::Release);
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.stop_worker_threads();
    }
}

fn worker_thread_run(shared: Arc<LoaderShared>, thread_index: usize) {
    let mut queue = shared.queue.lock();
    loop {
        shared
            .wake
            .wait_while(&mut queue, |q| q.assets.is_empty() && !q.exit);

        if queue.exit {
            return;
        }

        // Over budget: drop the rest until the manager resubmits with fresh headroom
        if shared.budget_exhausted(queue.allowed_memory) {
            queue.assets.clear();
            continue;
        }

        let Some(asset) = queue.assets.pop_front() else {
            continue;
        };

        let handle = asset.handle();
        if !queue.in_flight.insert(handle) {
            continue;
        }

        let result = MutexGuard::unlocked(&mut queue, || load_asset(&shared, &asset, thread_index));
        shared.results.lock().push(result);
        queue.in_flight.remove(&handle);
    }
}

fn load_asset(shared: &LoaderShared, asset: &CustomAsset, thread_index: usize) -> LoadResult {
    #[cfg(feature = "profiling")]
    let _span = tracing::info_span!("asset_loader.load", thread_index, asset_id = asset.asset_id())
        .entered();

    let started_at = Instant::now();

    let bytes_unloaded = asset.unload();
    shared
        .change_in_memory
        .fetch_sub(bytes_unloaded as i64, Ordering::AcqRel);

    let bytes_loaded = asset.load();
    shared
        .change_in_memory
        .fetch_add(bytes_loaded as i64, Ordering::AcqRel);

    tracing::debug!(
        thread_index,
        asset_id = asset.asset_id(),
        bytes_loaded,
        bytes_unloaded,
        "asset loader finished"
    );

    LoadResult {
        handle: asset.handle(),
        success: bytes_loaded > 0,
        started_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::library::{AssetLibrary, LoadedAsset};
    use crate::assets::payload::TextureData;
    use crate::assets::AssetType;
    use std::time::{Duration, SystemTime};

    struct SizedTextures {
        size: usize,
    }

    impl AssetLibrary for SizedTextures {
        fn load_texture(&self, asset_id: &str) -> crate::Result<LoadedAsset<TextureData>> {
            if asset_id.starts_with("missing") {
                return Err(AssetError::NotFound(asset_id.to_string()));
            }
            Ok(LoadedAsset::new(
                TextureData::single(1, 1, vec![0; self.size]),
                self.size,
            ))
        }

        fn last_asset_write_time(&self, _asset_id: &str) -> Option<SystemTime> {
            None
        }
    }

    fn make_assets(ids: &[&str], size: usize) -> Vec<Arc<CustomAsset>> {
        let library: Arc<dyn AssetLibrary> = Arc::new(SizedTextures { size });
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                Arc::new(CustomAsset::new(
                    Arc::clone(&library),
                    id.to_string(),
                    AssetHandle::new(i as u64),
                    AssetType::Texture,
                ))
            })
            .collect()
    }

    fn collect_results(loader: &AssetLoader, expected: usize) -> LoadResults {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut all = LoadResults::default();
        while all.results.len() < expected && Instant::now() < deadline {
            let batch = loader.take_load_results();
            all.results.extend(batch.results);
            all.change_in_memory += batch.change_in_memory;
            std::thread::sleep(Duration::from_millis(1));
        }
        all
    }

    #[test]
    fn test_loads_scheduled_assets() {
        let mut loader = AssetLoader::new();
        loader.initialize().unwrap();
        assert_eq!(loader.worker_count(), DEFAULT_WORKER_THREADS);

        let assets = make_assets(&["a", "b", "c"], 100);
        loader.schedule_assets_to_load(assets.clone(), 10_000);

        let results = collect_results(&loader, 3);
        assert_eq!(results.results.len(), 3);
        assert!(results.results.iter().all(|r| r.success));
        assert_eq!(results.change_in_memory, 300);
        assert!(assets.iter().all(|a| a.is_loaded()));

        loader.shutdown();
        assert_eq!(loader.worker_count(), 0);
    }

    #[test]
    fn test_failed_load_is_reported() {
        let mut loader = AssetLoader::new();
        loader.initialize().unwrap();

        let assets = make_assets(&["missing_tex"], 100);
        loader.schedule_assets_to_load(assets, 10_000);

        let results = collect_results(&loader, 1);
        assert_eq!(results.results.len(), 1);
        assert!(!results.results[0].success);
        assert_eq!(results.change_in_memory, 0);
    }

    #[test]
    fn test_budget_exhaustion_drops_remaining_queue() {
        let mut loader = AssetLoader::new();
        loader.resize_worker_threads(1).unwrap();

        let assets = make_assets(&["a", "b", "c", "d"], 100);
        loader.schedule_assets_to_load(assets.clone(), 50);

        // Taking results resets the delta, so only drain once the worker is idle
        let deadline = Instant::now() + Duration::from_secs(5);
        while !assets[0].is_loaded() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        std::thread::sleep(Duration::from_millis(50));
        let results = loader.take_load_results();

        assert_eq!(results.results.len(), 1);
        assert_eq!(results.change_in_memory, 100);
        assert_eq!(assets.iter().filter(|a| a.is_loaded()).count(), 1);
    }

    #[test]
    fn test_reload_accounts_for_unloaded_bytes() {
        let mut loader = AssetLoader::new();
        loader.resize_worker_threads(1).unwrap();

        let assets = make_assets(&["a"], 100);
        assets[0].load();

        loader.schedule_assets_to_load(assets, 1_000);
        let results = collect_results(&loader, 1);
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.change_in_memory, 0);
    }

    #[test]
    fn test_empty_schedule_is_noop() {
        let mut loader = AssetLoader::new();
        loader.initialize().unwrap();
        loader.schedule_assets_to_load(Vec::new(), 1_000);
        let results = loader.take_load_results();
        assert!(results.results.is_empty());
        assert_eq!(results.change_in_memory, 0);
    }

    #[test]
    fn test_reset_restarts_same_worker_count() {
        let mut loader = AssetLoader::new();
        loader.resize_worker_threads(3).unwrap();
        loader.reset(true).unwrap();
        assert_eq!(loader.worker_count(), 3);

        loader.schedule_assets_to_load(make_assets(&["a"], 10), 1_000);
        assert_eq!(collect_results(&loader, 1).results.len(), 1);

        loader.reset(false).unwrap();
        assert_eq!(loader.worker_count(), 0);
    }

    #[test]
    fn test_shutdown_drops_undrained_results() {
        let mut loader = AssetLoader::new();
        loader.resize_worker_threads(1).unwrap();

        let assets = make_assets(&["a"], 10);
        loader.schedule_assets_to_load(assets.clone(), 1_000);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !assets[0].is_loaded() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }

        loader.shutdown();
        assert_eq!(loader.worker_count(), 0);
        let results = loader.take_load_results();
        assert!(results.results.is_empty());
        assert_eq!(results.change_in_memory, 0);
    }
}
