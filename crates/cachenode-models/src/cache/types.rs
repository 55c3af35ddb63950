//! Core data types for model caching.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::device::WrappedModel;

/// Shared handle to a cached model.
///
/// Every lookup of the same key hands out a clone of the same handle, so a
/// device assigned through one handle is visible through all of them.
pub type ModelHandle = Arc<RwLock<WrappedModel>>;

/// Cache key identifying a logical model instance.
///
/// Any string is accepted; the empty string is a single ordinary slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a new cache key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total number of cache hits.
    pub total_hits: u64,
    /// Total number of cache misses.
    pub total_misses: u64,
    /// Current number of models in cache.
    pub cache_size: usize,
}
