//! Resource manager configuration
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```
//! use custom_assets::config::ResourceManagerConfig;
//!
//! let config = ResourceManagerConfig::from_json_str(r#"{ "worker_threads": 4 }"#).unwrap();
//! assert_eq!(config.worker_threads, 4);
//! assert_eq!(config.eviction_threshold_percent, 80);
//! ```

use crate::error::{AssetError, Result};
use serde::{Deserialize, Serialize};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Tunables for [`ResourceManager`](crate::resources::ResourceManager)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceManagerConfig {
    /// Loader worker threads
    pub worker_threads: usize,
    /// Memory always left to the rest of the system
    pub reserved_memory_floor: u64,
    /// Explicit ceiling in bytes; derived from system RAM when unset
    pub memory_ceiling: Option<u64>,
    /// Eviction stops once usage falls to this share of the ceiling
    pub eviction_threshold_percent: u8,
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            worker_threads: crate::assets::loader::DEFAULT_WORKER_THREADS,
            reserved_memory_floor: 2 * GIB,
            memory_ceiling: None,
            eviction_threshold_percent: 80,
        }
    }
}

impl ResourceManagerConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with a fixed ceiling instead of one derived from system RAM
    pub fn with_memory_ceiling(mut self, bytes: u64) -> Self {
        self.memory_ceiling = Some(bytes);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(AssetError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.eviction_threshold_percent) {
            return Err(AssetError::InvalidConfig(format!(
                "eviction_threshold_percent must be within 1..=100, got {}",
                self.eviction_threshold_percent
            )));
        }
        Ok(())
    }

    /// Ceiling to run with: the explicit one, or derived from system RAM
    pub fn resolve_memory_ceiling(&self) -> u64 {
        self.memory_ceiling.unwrap_or_else(|| {
            compute_memory_ceiling(total_system_memory(), self.reserved_memory_floor)
        })
    }

    /// Usage eviction brings the manager back down to
    pub fn eviction_threshold(&self, ceiling: u64) -> u64 {
        (ceiling as u128 * self.eviction_threshold_percent as u128 / 100) as u64
    }
}

/// Never use more than half of RAM, and always leave `floor` unused
pub fn compute_memory_ceiling(total: u64, floor: u64) -> u64 {
    let keep_unused = (total / 2).max(total.min(floor));
    total - keep_unused
}

/// Physical memory of this machine in bytes
pub fn total_system_memory() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.total_memory()
}
