//! # Profiling
//!
//! With the `profiling` feature enabled the loader workers and the checkpoint
//! emit `tracing` spans (`asset_loader.load`, `resource_manager.checkpoint`).
//! Install a subscriber to see them:
//!
//! ```ignore
//! // Console only, filtered by RUST_LOG when set
//! let _guard = custom_assets::profiling::init_tracing("custom_assets=debug", None)?;
//!
//! // Also write a daily rolling file
//! let _guard = custom_assets::profiling::init_tracing(
//!     "custom_assets=trace",
//!     Some(std::path::Path::new("logs")),
//! )?;
//! ```
//!
//! Keep the returned guard alive; dropping it flushes the file writer.
//!
//! ## Tips
//!
//! 1. Profile in release mode for accurate timings
//! 2. `RUST_LOG=custom_assets=trace` also shows deferred dirty drains

use crate::error::{AssetError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install the global subscriber
///
/// `default_filter` applies when `RUST_LOG` is unset. With `log_dir` set,
/// events are also written as JSON lines to `custom_assets.log.<date>`.
pub fn init_tracing(default_filter: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| AssetError::InvalidConfig(format!("Invalid tracing filter: {e}")))?;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "custom_assets.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_thread_names(true))
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AssetError::InvalidConfig(format!("Tracing already initialized: {e}")))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        std::env::remove_var("RUST_LOG");
        assert!(matches!(
            init_tracing("custom_assets=[", None),
            Err(AssetError::InvalidConfig(_))
        ));
    }
}
