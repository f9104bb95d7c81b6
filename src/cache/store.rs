// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content-addressed store with at most one in-flight computation per key.
//!
//! Each key that is being looked up or computed has an in-flight cell. The
//! index of cells is locked only to fetch or insert a cell, never while
//! loading, computing or writing. The first caller for a key initializes the
//! cell: it reads the backend and, on a miss, computes and persists the
//! entry. Concurrent callers wait on the same cell and observe that result.
//! If the computation fails the cell stays empty and the next waiter retries
//! with its own computation; with no waiter left the cell is dropped.
//!
//! Stored entries that fail verification are logged, removed and treated as
//! a miss, so the recomputed entry replaces them. A failed write is logged and
//! does not fail the caller: the entry is simply recomputed next time.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::cache::{CacheBackend, CacheEntry, CacheKey, FsCacheBackend, MemoryCacheBackend};
use crate::errors::CacheError;
use crate::observability::messages::cache::{
    CacheCorruptionDetected, CacheLookup, CacheReadFailed, CacheWriteFailed, LookupOutcome,
};
use crate::observability::messages::StructuredLog;

/// Where a returned entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// Read from the backend.
    Stored,
    /// Computed by this caller.
    Computed,
    /// Computed by a concurrent caller for the same key.
    Joined,
}

impl EntrySource {
    /// Whether the caller got its entry without computing it.
    pub fn is_cache_hit(&self) -> bool {
        !matches!(self, EntrySource::Computed)
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    corruptions: AtomicU64,
    joined: AtomicU64,
    write_failures: AtomicU64,
}

impl CacheStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            corruptions: self.corruptions.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the store's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub computations: u64,
    pub corruptions: u64,
    pub joined: u64,
    pub write_failures: u64,
}

impl CacheStatsSnapshot {
    /// Counters accumulated since `earlier`.
    pub fn since(&self, earlier: &CacheStatsSnapshot) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.saturating_sub(earlier.hits),
            misses: self.misses.saturating_sub(earlier.misses),
            computations: self.computations.saturating_sub(earlier.computations),
            corruptions: self.corruptions.saturating_sub(earlier.corruptions),
            joined: self.joined.saturating_sub(earlier.joined),
            write_failures: self.write_failures.saturating_sub(earlier.write_failures),
        }
    }
}

type InFlight = Arc<OnceCell<Arc<CacheEntry>>>;

pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,
    stats: CacheStats,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            in_flight: Mutex::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()))
    }

    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsCacheBackend::new(root)))
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Look up a stored entry. Corrupted or unreadable entries are a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entry = self.load(key).await;
        let (counter, outcome) = match entry {
            Some(_) => (&self.stats.hits, LookupOutcome::Hit),
            None => (&self.stats.misses, LookupOutcome::Miss),
        };
        CacheStats::bump(counter);
        CacheLookup { key: key.as_str(), outcome }.log();
        entry
    }

    /// Return the entry for `key`, computing and persisting it with
    /// `compute` if no valid entry exists. At most one computation per key
    /// runs at a time; concurrent callers share its result.
    pub async fn compute_or_fetch<F, Fut, E>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> Result<(Arc<CacheEntry>, EntrySource), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheEntry, E>>,
    {
        let cell = self.in_flight_cell(key);
        let mut source = EntrySource::Joined;
        let source_ref = &mut source;

        let result: Result<Arc<CacheEntry>, E> = cell
            .get_or_try_init(move || async move {
                if let Some(entry) = self.load(key).await {
                    *source_ref = EntrySource::Stored;
                    return Ok(entry);
                }

                *source_ref = EntrySource::Computed;
                CacheStats::bump(&self.stats.computations);
                let entry = Arc::new(compute().await?);
                self.persist(&entry).await;
                Ok(entry)
            })
            .await
            .map(Arc::clone);

        self.release(key, &cell);

        let entry = result?;
        let (counter, outcome) = match source {
            EntrySource::Stored => (&self.stats.hits, LookupOutcome::Hit),
            EntrySource::Computed => (&self.stats.misses, LookupOutcome::Miss),
            EntrySource::Joined => (&self.stats.joined, LookupOutcome::Joined),
        };
        CacheStats::bump(counter);
        CacheLookup { key: key.as_str(), outcome }.log();

        Ok((entry, source))
    }

    fn in_flight_cell(&self, key: &CacheKey) -> InFlight {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(key.clone()).or_default())
    }

    /// Drop the cell once it holds a value; later callers read the backend.
    /// An empty cell (failed computation) stays while other callers hold it,
    /// so that newcomers queue behind the retrying waiter.
    fn release(&self, key: &CacheKey, cell: &InFlight) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, cell)) {
            return;
        }
        // One reference in the index plus the caller's own.
        if cell.initialized() || Arc::strong_count(cell) <= 2 {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn load(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let owned = key.clone();
        let bytes = match self.blocking(move |backend| backend.load(&owned)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(error) => {
                CacheReadFailed { key: key.as_str(), error: &error }.log();
                return None;
            }
        };

        match CacheEntry::decode(&bytes, Some(key)) {
            Ok(entry) => Some(Arc::new(entry)),
            Err(error) => {
                CacheStats::bump(&self.stats.corruptions);
                CacheCorruptionDetected { key: key.as_str(), error: &error }.log();
                let owned = key.clone();
                if let Err(error) = self.blocking(move |backend| backend.remove(&owned)).await {
                    CacheWriteFailed { key: key.as_str(), error: &error }.log();
                }
                None
            }
        }
    }

    async fn persist(&self, entry: &CacheEntry) {
        let key = entry.key().clone();
        let result = match entry.encode() {
            Ok(bytes) => self.blocking(move |backend| backend.store(&key, &bytes)).await,
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            CacheStats::bump(&self.stats.write_failures);
            CacheWriteFailed { key: entry.key().as_str(), error: &error }.log();
        }
    }

    async fn blocking<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: FnOnce(&dyn CacheBackend) -> Result<T, CacheError> + Send + 'static,
        T: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || operation(backend.as_ref()))
            .await
            .map_err(|e| CacheError::Worker(e.to_string()))?
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{AnnotationLayer, Span};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        CacheKey::builder(name, "1").input("text", "abc").build()
    }

    fn entry(key: &CacheKey, word: &str) -> CacheEntry {
        let mut layer = AnnotationLayer::new("tokens");
        layer.push_attr(Span::new(0, word.len()), "word", word);
        CacheEntry::from_layers(key.clone(), vec![layer]).unwrap()
    }

    #[derive(Debug)]
    struct ReadOnlyBackend;

    impl CacheBackend for ReadOnlyBackend {
        fn load(&self, _key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(None)
        }

        fn store(&self, key: &CacheKey, _bytes: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&self, _key: &CacheKey) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn miss_computes_then_hit_reads_back() {
        let store = CacheStore::in_memory();
        let key = key("tokenize");

        let (first, source) = store
            .compute_or_fetch(&key, || async { Ok::<_, CacheError>(entry(&key, "hello")) })
            .await
            .unwrap();
        assert_eq!(source, EntrySource::Computed);

        let (second, source) = store
            .compute_or_fetch(&key, || async {
                Err::<CacheEntry, _>(CacheError::Worker("must not recompute".into()))
            })
            .await
            .unwrap();
        assert_eq!(source, EntrySource::Stored);
        assert_eq!(first.checksum(), second.checksum());
        assert!(store.get(&key).await.is_some());

        let stats = store.stats();
        assert_eq!((stats.computations, stats.misses, stats.hits), (1, 1, 2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_computation() {
        let store = Arc::new(CacheStore::in_memory());
        let key = key("postag");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let key = key.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                store
                    .compute_or_fetch(&key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, CacheError>(entry(&key, "tag"))
                    })
                    .await
                    .map(|(entry, _)| entry.checksum().to_string())
            }));
        }

        let mut checksums = Vec::new();
        for handle in handles {
            checksums.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        checksums.dedup();
        assert_eq!(checksums.len(), 1);
        assert_eq!(store.stats().computations, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiter_retries_after_failed_computation() {
        let store = Arc::new(CacheStore::in_memory());
        let key = key("export");

        let failing = {
            let store = Arc::clone(&store);
            let key = key.clone();
            tokio::spawn(async move {
                store
                    .compute_or_fetch(&key, || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<CacheEntry, _>("producer failed")
                    })
                    .await
                    .map(|(_, source)| source)
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let retrying = store
            .compute_or_fetch(&key, || async { Ok::<_, &str>(entry(&key, "ok")) })
            .await
            .map(|(_, source)| source);

        assert_eq!(failing.await.unwrap(), Err("producer failed"));
        assert_eq!(retrying, Ok(EntrySource::Computed));
        assert!(store.get(&key).await.is_some());
        assert_eq!(store.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn failed_computation_without_waiters_leaves_no_cell() {
        let store = CacheStore::in_memory();
        for name in ["postag", "export", "gloss"] {
            let result = store
                .compute_or_fetch(&key(name), || async { Err::<CacheEntry, _>("producer failed") })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(store.in_flight_len(), 0);
        assert_eq!(store.stats().computations, 3);
    }

    #[tokio::test]
    async fn corrupted_entry_is_recomputed_and_overwritten() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let store = CacheStore::new(backend.clone());
        let key = key("tokenize");
        backend.store(&key, b"{\"truncated").unwrap();

        assert!(store.get(&key).await.is_none());
        backend.store(&key, b"garbage").unwrap();

        let (_, source) = store
            .compute_or_fetch(&key, || async { Ok::<_, CacheError>(entry(&key, "fresh")) })
            .await
            .unwrap();
        assert_eq!(source, EntrySource::Computed);
        assert_eq!(store.stats().corruptions, 2);

        let bytes = backend.load(&key).unwrap().unwrap();
        assert!(CacheEntry::decode(&bytes, Some(&key)).is_ok());
    }

    #[tokio::test]
    async fn write_failure_does_not_fail_the_caller() {
        let store = CacheStore::new(Arc::new(ReadOnlyBackend));
        let key = key("tokenize");

        let result = store
            .compute_or_fetch(&key, || async { Ok::<_, CacheError>(entry(&key, "x")) })
            .await;
        assert!(result.is_ok());
        assert_eq!(store.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn filesystem_entries_outlive_the_store() {
        let dir = TempDir::new().unwrap();
        let key = key("tokenize");

        let first = CacheStore::filesystem(dir.path());
        first
            .compute_or_fetch(&key, || async { Ok::<_, CacheError>(entry(&key, "disk")) })
            .await
            .unwrap();
        drop(first);

        let second = CacheStore::filesystem(dir.path());
        let stored = second.get(&key).await.unwrap();
        assert_eq!(stored.layer("tokens").unwrap().len(), 1);
    }

    #[test]
    fn snapshot_difference_counts_only_new_events() {
        let before = CacheStatsSnapshot {
            hits: 2,
            misses: 1,
            ..Default::default()
        };
        let after = CacheStatsSnapshot {
            hits: 5,
            misses: 1,
            computations: 1,
            ..Default::default()
        };
        let delta = after.since(&before);
        assert_eq!((delta.hits, delta.misses, delta.computations), (3, 0, 1));
    }
}
