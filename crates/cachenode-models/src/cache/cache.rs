//! ModelCache implementation with lazy construction and device placement.

use cachenode_abstraction::{Device, Model, ModelError, Placement};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use super::types::{CacheKey, CacheStats, ModelHandle};
use crate::device::wrap_for_device_control;

/// Keyed cache of constructed models.
///
/// Entries are created on the first lookup of a key and live as long as the
/// cache. Every lookup, hit or miss, asks the placement service to make the
/// model resident on the requested device before handing it back.
pub struct ModelCache {
    /// The cache storage (key -> shared model handle).
    entries: RwLock<HashMap<CacheKey, ModelHandle>>,
    /// Cache statistics.
    stats: RwLock<CacheStats>,
    /// Moves weights between devices.
    placement: Arc<dyn Placement>,
}

impl ModelCache {
    /// Create an empty cache that places models through `placement`.
    #[must_use]
    pub fn new(placement: Arc<dyn Placement>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            placement,
        }
    }

    /// Get a model from cache or construct it if not present.
    ///
    /// On a miss `construct` is called, its result wrapped for device control,
    /// placed, and only then stored, so a failed construction or placement
    /// leaves no entry behind. On a hit `construct` is never called.
    ///
    /// Every lookup write-locks the returned handle to place it, so callers must
    /// release any guard on a handle for `key` before looking `key` up again.
    /// Holding a guard across that lookup deadlocks the calling thread.
    ///
    /// # Arguments
    /// * `key` - Cache key for the logical model
    /// * `construct` - Builds the model on a miss
    /// * `device` - Device to load onto, or `None` for the placement default
    /// * `offload` - Device to offload to, or `None` for the placement default
    ///
    /// # Errors
    /// Returns the error from `construct` or from placement, unmodified.
    pub fn get_or_create<F>(
        &self,
        key: impl Into<CacheKey>,
        construct: F,
        device: Option<Device>,
        offload: Option<Device>,
    ) -> Result<ModelHandle, ModelError>
    where
        F: FnOnce() -> Result<Box<dyn Model>, ModelError>,
    {
        let key = key.into();

        if let Some(model) = self.lookup(&key) {
            self.stats.write().expect("Stats lock poisoned").total_hits += 1;
            debug!(cache_key = %key, "Cache hit");
            self.place(&model, device, offload)?;
            return Ok(model);
        }

        self.stats.write().expect("Stats lock poisoned").total_misses += 1;
        debug!(cache_key = %key, "Cache miss, constructing model");

        let mut wrapped = wrap_for_device_control(construct()?);
        self.placement.ensure_resident(&mut wrapped, device, offload)?;
        let variant = wrapped.variant();
        let model = Arc::new(RwLock::new(wrapped));

        let mut entries = self.entries.write().expect("Cache lock poisoned");
        if let Some(existing) = entries.get(&key) {
            warn!(cache_key = %key, "Key was cached concurrently, keeping existing entry");
            let existing = Arc::clone(existing);
            drop(entries);
            self.place(&existing, device, offload)?;
            return Ok(existing);
        }

        info!(cache_key = %key, %variant, "Model cached");
        entries.insert(key, Arc::clone(&model));
        let cache_size = entries.len();
        drop(entries);
        self.stats.write().expect("Stats lock poisoned").cache_size = cache_size;

        Ok(model)
    }

    /// Whether a lookup of `key` would need a freshly constructed model.
    ///
    /// Lets a host skip producing the constructor's input when the key is
    /// already cached.
    pub fn needs_construction_input(&self, key: &str) -> bool {
        !self.contains(key)
    }

    /// Whether `key` has an entry.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().expect("Cache lock poisoned").contains_key(key)
    }

    /// Number of cached models.
    pub fn len(&self) -> usize {
        self.entries.read().expect("Cache lock poisoned").len()
    }

    /// Whether the cache holds no models.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cached keys, sorted.
    pub fn keys(&self) -> Vec<CacheKey> {
        let entries = self.entries.read().expect("Cache lock poisoned");
        let mut keys: Vec<_> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn get_stats(&self) -> CacheStats {
        let mut result = self.stats.read().expect("Stats lock poisoned").clone();
        result.cache_size = self.len();
        result
    }

    fn lookup(&self, key: &CacheKey) -> Option<ModelHandle> {
        self.entries.read().expect("Cache lock poisoned").get(key).map(Arc::clone)
    }

    fn place(
        &self,
        model: &ModelHandle,
        device: Option<Device>,
        offload: Option<Device>,
    ) -> Result<(), ModelError> {
        let mut model = model.write().expect("Model lock poisoned");
        self.placement.ensure_resident(&mut *model, device, offload)
    }
}

impl fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCache").field("keys", &self.keys()).field("stats", &self.get_stats()).finish()
    }
}
