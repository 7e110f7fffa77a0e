//! Resource management for custom assets
//!
//! [`ResourceManager`] decides which assets stay resident, [`AssetPriorityQueue`]
//! orders them by recency of use, and [`AssetDirtyMarker`] carries reload
//! requests in from other threads.

pub mod dirty;
pub mod manager;
pub mod priority_queue;
pub mod stats;

pub use dirty::AssetDirtyMarker;
pub use manager::{LoadStatus, ResourceData, ResourceManager};
pub use priority_queue::AssetPriorityQueue;
pub use stats::ResourceManagerStats;
