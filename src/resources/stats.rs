/// Resource manager statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceManagerStats {
    /// Requests answered from the per-type caches
    pub cache_hits: u64,
    /// Requests that returned no data (still loading, or failed)
    pub cache_misses: u64,
    /// Assets unloaded under memory pressure
    pub evictions: u64,
    /// Bytes freed by evictions
    pub bytes_evicted: u64,
    /// Loads that completed and were accepted
    pub loads_completed: u64,
    /// Loads that failed and set the sticky error
    pub load_failures: u64,
    /// Loads rejected because a newer reload request was outstanding
    pub stale_loads: u64,
    /// Checkpoints processed
    pub checkpoints: u64,
}

impl ResourceManagerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hit_ratio(&self) -> f32 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f32 / total as f32
        }
    }
}
