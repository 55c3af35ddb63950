//! Model caching system.
//!
//! This module keeps constructed models keyed by a caller-supplied string so
//! repeated requests for the same logical model reuse one instance, and makes
//! sure the instance is resident on the requested device on every lookup.

pub mod cache;
pub mod types;

pub use cache::ModelCache;
pub use types::{CacheKey, CacheStats, ModelHandle};
