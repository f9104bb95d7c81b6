// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::cache::CacheKey;
use crate::errors::CacheError;

/// Byte storage for encoded cache entries, addressed by key.
///
/// Calls are blocking; the store runs them on the blocking thread pool.
pub trait CacheBackend: Send + Sync + Debug {
    fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write `bytes` under `key` so that readers observe either the previous
    /// value or the new one, never a partial write.
    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
}

/// Entries as files under `<root>/<first two hex digits>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FsCacheBackend {
    root: PathBuf,
}

impl FsCacheBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.shard()).join(format!("{}.json", key))
    }
}

fn io_error(key: &CacheKey) -> impl Fn(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        key: key.to_string(),
        source,
    }
}

impl CacheBackend for FsCacheBackend {
    fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).map_err(io_error(key))?;

        // Temp file in the destination directory so the rename stays on one
        // filesystem and is atomic.
        let mut file = NamedTempFile::new_in(dir).map_err(io_error(key))?;
        file.write_all(bytes).map_err(io_error(key))?;
        file.flush().map_err(io_error(key))?;
        file.as_file().sync_all().map_err(io_error(key))?;
        file.persist(&path).map_err(|e| io_error(key)(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key)(e)),
        }
    }
}

/// Process-local backend, used for tests and `backend: memory` runs.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        CacheKey::builder(name, "1").build()
    }

    #[test]
    fn fs_backend_shards_by_key_prefix() {
        let dir = TempDir::new().unwrap();
        let backend = FsCacheBackend::new(dir.path());
        let key = key("tokenize");

        backend.store(&key, b"{}").unwrap();

        let expected = dir.path().join(key.shard()).join(format!("{}.json", key));
        assert!(expected.is_file());
        assert_eq!(backend.load(&key).unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn fs_backend_overwrites_and_removes() {
        let dir = TempDir::new().unwrap();
        let backend = FsCacheBackend::new(dir.path().join("nested"));
        let key = key("postag");

        assert_eq!(backend.load(&key).unwrap(), None);
        backend.store(&key, b"old").unwrap();
        backend.store(&key, b"new").unwrap();
        assert_eq!(backend.load(&key).unwrap(), Some(b"new".to_vec()));

        // No temp files are left behind next to the entry.
        let shard = backend.path_for(&key).parent().unwrap().to_path_buf();
        assert_eq!(fs::read_dir(shard).unwrap().count(), 1);

        backend.remove(&key).unwrap();
        backend.remove(&key).unwrap();
        assert_eq!(backend.load(&key).unwrap(), None);
    }

    #[test]
    fn memory_backend_round_trips() {
        let backend = MemoryCacheBackend::new();
        let key = key("export");
        assert!(backend.is_empty());
        backend.store(&key, b"x").unwrap();
        assert_eq!(backend.load(&key).unwrap(), Some(b"x".to_vec()));
        backend.remove(&key).unwrap();
        assert!(backend.is_empty());
    }
}
