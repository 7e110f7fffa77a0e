use crate::assets::AssetHandle;
use lru::LruCache;
use rustc_hash::FxBuildHasher;

/// Recency-ordered set of assets keyed by handle
///
/// The front is the highest priority (most recently touched); eviction and
/// removal of the lowest priority always come from the back. Every operation
/// is O(1) and a handle appears at most once.
pub struct AssetPriorityQueue<T> {
    entries: LruCache<AssetHandle, T, FxBuildHasher>,
}

impl<T: Clone> AssetPriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded_with_hasher(FxBuildHasher),
        }
    }

    /// Move `handle` to the front, inserting it if absent
    pub fn make_highest_priority(&mut self, handle: AssetHandle, asset: T) {
        self.entries.put(handle, asset);
    }

    /// Add `handle` at the back unless it is already queued
    pub fn insert_asset(&mut self, handle: AssetHandle, asset: T) {
        if self.entries.contains(&handle) {
            return;
        }
        self.entries.put(handle, asset);
        self.entries.demote(&handle);
    }

    /// Pop the back (least recently touched) entry
    pub fn remove_lowest_priority_asset(&mut self) -> Option<(AssetHandle, T)> {
        self.entries.pop_lru()
    }

    pub fn remove_asset(&mut self, handle: AssetHandle) -> Option<T> {
        self.entries.pop(&handle)
    }

    pub fn contains(&self, handle: AssetHandle) -> bool {
        self.entries.contains(&handle)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot from highest to lowest priority
    pub fn elements(&self) -> Vec<T> {
        self.entries.iter().map(|(_, asset)| asset.clone()).collect()
    }

    pub fn handles(&self) -> Vec<AssetHandle> {
        self.entries.iter().map(|(handle, _)| *handle).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> Default for AssetPriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
