// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for cache store events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// How a cache lookup was satisfied.
pub struct CacheLookup<'a> {
    pub key: &'a str,
    pub outcome: LookupOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Hit,
    Miss,
    /// Waited on another caller's in-flight computation for the same key.
    Joined,
}

impl Display for LookupOutcome {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(match self {
            LookupOutcome::Hit => "hit",
            LookupOutcome::Miss => "miss",
            LookupOutcome::Joined => "joined in-flight computation",
        })
    }
}

impl Display for CacheLookup<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cache {} for {}", self.outcome, self.key)
    }
}

impl StructuredLog for CacheLookup<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, outcome = %self.outcome, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("cache_lookup", span_name = name, key = self.key)
    }
}

/// A stored entry failed validation and will be recomputed.
///
/// # Log Level
/// `warn!` - recoverable, the entry is overwritten
pub struct CacheCorruptionDetected<'a> {
    pub key: &'a str,
    pub error: &'a dyn Display,
}

impl Display for CacheCorruptionDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarding corrupted cache entry {}: {}; it will be recomputed",
            self.key, self.error
        )
    }
}

impl StructuredLog for CacheCorruptionDetected<'_> {
    fn log(&self) {
        tracing::warn!(key = self.key, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cache_corruption", span_name = name, key = self.key)
    }
}

/// Reading an entry failed for a reason other than corruption.
///
/// # Log Level
/// `warn!` - treated as a miss
pub struct CacheReadFailed<'a> {
    pub key: &'a str,
    pub error: &'a dyn Display,
}

impl Display for CacheReadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Could not read cache entry {}: {}", self.key, self.error)
    }
}

impl StructuredLog for CacheReadFailed<'_> {
    fn log(&self) {
        tracing::warn!(key = self.key, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cache_read_failed", span_name = name, key = self.key)
    }
}

/// Persisting a freshly computed entry failed. The task still succeeds.
///
/// # Log Level
/// `warn!`
pub struct CacheWriteFailed<'a> {
    pub key: &'a str,
    pub error: &'a dyn Display,
}

impl Display for CacheWriteFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Could not persist cache entry {}: {}", self.key, self.error)
    }
}

impl StructuredLog for CacheWriteFailed<'_> {
    fn log(&self) {
        tracing::warn!(key = self.key, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cache_write_failed", span_name = name, key = self.key)
    }
}
