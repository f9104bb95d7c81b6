// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod backend;
mod entry;
mod key;
mod store;

pub use backend::{CacheBackend, FsCacheBackend, MemoryCacheBackend};
pub use entry::CacheEntry;
pub use key::{CacheKey, CacheKeyBuilder};
pub use store::{CacheStatsSnapshot, CacheStore, EntrySource};
