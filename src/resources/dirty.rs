use crate::assets::AssetId;
use ahash::AHashSet;
use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe set of asset ids waiting to be reloaded
///
/// Cloning shares the same set, so a file watcher on another thread can hold
/// one and mark assets dirty while the manager drains it at checkpoints.
#[derive(Clone, Default)]
pub struct AssetDirtyMarker {
    dirty: Arc<Mutex<AHashSet<AssetId>>>,
}

impl AssetDirtyMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_asset_dirty(&self, asset_id: impl Into<AssetId>) {
        self.dirty.lock().insert(asset_id.into());
    }

    /// Swap out the whole set without blocking
    ///
    /// Returns `None` when another thread holds the lock; the ids stay queued
    /// for the next attempt.
    pub fn try_take(&self) -> Option<AHashSet<AssetId>> {
        self.dirty.try_lock().map(|mut dirty| std::mem::take(&mut *dirty))
    }

    pub fn clear(&self) {
        self.dirty.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.dirty.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> parking_lot::MutexGuard<'_, AHashSet<AssetId>> {
        self.dirty.lock()
    }
}
