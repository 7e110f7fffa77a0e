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

//! Error types

use crate::assets::AssetType;
use std::fmt;

/// Asset system error type
///
/// Load-path errors are absorbed by the resource manager and surface to the
/// renderer only as "no data this frame". The remaining variants come from
/// construction-time surfaces (config parsing, library setup, worker spawn).
#[derive(Debug, Clone)]
pub enum AssetError {
    /// No asset is registered under this id
    NotFound(String),

    /// The library cannot produce this asset type
    Unsupported {
        asset_type: AssetType,
        asset_id: String,
    },

    /// The library produced no data
    LoadFailed(String),

    /// IO error (file reads, metadata)
    Io(String),

    /// Asset contents could not be parsed
    Parse(String),

    /// Configuration rejected by validation
    InvalidConfig(String),

    /// A loader worker thread could not be started
    WorkerSpawn(String),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound(id) => write!(f, "Asset not found: {id}"),
            AssetError::Unsupported {
                asset_type,
                asset_id,
            } => write!(f, "{asset_type} assets are not supported by this library (asset '{asset_id}')"),
            AssetError::LoadFailed(msg) => write!(f, "Asset load failed: {msg}"),
            AssetError::Io(msg) => write!(f, "IO error: {msg}"),
            AssetError::Parse(msg) => write!(f, "Parse error: {msg}"),
            AssetError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            AssetError::WorkerSpawn(msg) => write!(f, "Failed to spawn loader worker: {msg}"),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<std::io::Error> for AssetError {
    fn from(err: std::io::Error) -> Self {
        AssetError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        AssetError::Parse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AssetError>;
