//! Location caching.
//!
//! Recent fixes are kept in a [`LocationCache`], optionally snapshotted to a
//! [`KeyValueStore`] so the last known position survives restarts.
//!
//! # Example Usage
//!
//! ```
//! use std::time::Duration;
//! use locus_core::cache::LocationCache;
//! use locus_core::config::CacheConfig;
//! use locus_core::location::{Coordinate, FixSource};
//!
//! let cache = LocationCache::new(CacheConfig::default());
//! cache.store_last_known(Coordinate::now(51.5072, -0.1276, 15.0), FixSource::Gps);
//!
//! assert!(cache.get_cached(Duration::from_secs(60)).is_some());
//! ```

mod location_cache;
pub mod storage;

pub use location_cache::{
    bucket_key, reliability_score, CacheEntry, CacheStatistics, LocationCache,
};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StoreError, StoreResult};
