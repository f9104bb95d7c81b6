// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from the cache store and its backends.
///
/// `Corruption` is recoverable: the store logs it, treats the entry as a miss
/// and recomputes. The other variants surface to the executor.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache entry '{key}' is corrupted: {reason}")]
    Corruption { key: String, reason: String },

    #[error("Cache I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode cache entry '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache worker failed: {0}")]
    Worker(String),
}

impl CacheError {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Corruption { .. } => "CacheCorruptionError",
            _ => "CacheError",
        }
    }
}
