//! Reliability-scored location cache.
//!
//! Fixes are bucketed by a quantized lat/lng key (~110 m grid). Two lookups
//! with different freshness rules are offered:
//!
//! - [`LocationCache::get_cached`]: strict recency gate on the most recent fix
//! - [`LocationCache::get_best_cached_location`]: most reliable nearby entry
//!   within a looser staleness ceiling
//!
//! An optional [`KeyValueStore`] keeps a JSON snapshot of the entries. Store
//! failures are logged and switch the cache to memory-only operation.
//!
//! Snapshots are serialized under the state lock but written after it is
//! released, so lookups never wait on store I/O. Each snapshot carries a
//! revision and a write older than the last one applied is skipped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::storage::{KeyValueStore, StoreError};
use crate::config::CacheConfig;
use crate::location::geo::{quantize, LatLng};
use crate::location::{Coordinate, FixSource};

/// Store key of the persisted snapshot.
const SNAPSHOT_KEY: &str = "locus.location_cache.v1";

/// A cached fix with provenance and a reliability score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub location: Coordinate,
    /// When the entry was written
    pub cache_timestamp: DateTime<Utc>,
    pub source: FixSource,
    /// 0-100
    pub reliability: u8,
}

/// Read-only summary of the cache contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatistics {
    pub cache_size: usize,
    /// Mean reliability of all entries, 0.0 when empty
    pub average_reliability: f64,
    pub source_counts: HashMap<FixSource, usize>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    current: Option<Coordinate>,
    /// Bumped on every mutation that changes the persisted snapshot
    revision: u64,
}

/// Bucketed store of recent fixes.
pub struct LocationCache {
    state: Mutex<CacheState>,
    store: Option<Box<dyn KeyValueStore>>,
    /// Revision of the last snapshot applied to `store`
    flushed: Mutex<u64>,
    degraded: AtomicBool,
    config: CacheConfig,
}

impl std::fmt::Debug for LocationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationCache")
            .field("len", &self.len())
            .field("persistent", &self.is_persistent())
            .finish_non_exhaustive()
    }
}

impl LocationCache {
    /// Creates a memory-only cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            store: None,
            flushed: Mutex::new(0),
            degraded: AtomicBool::new(false),
            config,
        }
    }

    /// Creates a cache backed by `store`, restoring any persisted snapshot.
    ///
    /// A snapshot that cannot be read leaves the cache empty and memory-only.
    #[must_use]
    pub fn with_store(config: CacheConfig, store: Box<dyn KeyValueStore>) -> Self {
        let cache = Self {
            state: Mutex::new(CacheState::default()),
            store: Some(store),
            flushed: Mutex::new(0),
            degraded: AtomicBool::new(false),
            config,
        };
        cache.restore();
        cache
    }

    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// True while a store is attached and no store failure has occurred.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.store.is_some() && !self.degraded.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a fix: scores it, upserts its bucket and makes it the current
    /// location. Returns the stored entry.
    pub fn store_last_known(&self, location: Coordinate, source: FixSource) -> CacheEntry {
        let now = Utc::now();
        let entry = CacheEntry {
            location,
            cache_timestamp: now,
            source,
            reliability: reliability_score(&location, source, now),
        };

        let mut state = self.lock();
        state.entries.insert(bucket_key(&location), entry);
        state.current = Some(location);
        self.evict(&mut state);
        let snapshot = self.snapshot(&mut state);
        drop(state);

        if let Some((revision, json)) = snapshot {
            self.flush(revision, Some(&json));
        }

        entry
    }

    /// Returns the current location if it is at most `max_age` old.
    ///
    /// Independent of the bucketed entries.
    #[must_use]
    pub fn get_cached(&self, max_age: Duration) -> Option<Coordinate> {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let now = Utc::now();
        self.lock()
            .current
            .filter(|location| location.age_at(now).num_milliseconds() <= max_age_ms)
    }

    /// Returns the current location regardless of age.
    #[must_use]
    pub fn current_location(&self) -> Option<Coordinate> {
        self.lock().current
    }

    /// Returns the most reliable entry within the neighbourhood radius of
    /// `near` that is not older than the staleness ceiling.
    ///
    /// Ties go to the most recent fix.
    #[must_use]
    pub fn get_best_cached_location(&self, near: &LatLng) -> Option<CacheEntry> {
        let stale_ms = i64::try_from(self.config.stale_after_ms).unwrap_or(i64::MAX);
        let now = Utc::now();

        self.lock()
            .entries
            .values()
            .filter(|e| e.location.age_at(now).num_milliseconds() <= stale_ms)
            .filter(|e| {
                LatLng::from(&e.location).distance_km_to(near) <= self.config.nearby_radius_km
            })
            .max_by(|a, b| {
                a.reliability
                    .cmp(&b.reliability)
                    .then(a.location.timestamp.cmp(&b.location.timestamp))
            })
            .copied()
    }

    /// Summarizes the entries without modifying them.
    #[must_use]
    pub fn statistics(&self) -> CacheStatistics {
        let state = self.lock();
        let cache_size = state.entries.len();
        let mut source_counts = HashMap::new();
        let mut total = 0_u64;

        for entry in state.entries.values() {
            *source_counts.entry(entry.source).or_insert(0) += 1;
            total += u64::from(entry.reliability);
        }
        drop(state);

        #[allow(clippy::cast_precision_loss)]
        let average_reliability = if cache_size == 0 {
            0.0
        } else {
            total as f64 / cache_size as f64
        };

        CacheStatistics {
            cache_size,
            average_reliability,
            source_counts,
        }
    }

    /// Number of buckets held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Drops every entry and the current location, including the persisted
    /// snapshot.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.current = None;
        state.revision += 1;
        let revision = state.revision;
        drop(state);

        self.flush(revision, None);
    }

    fn active_store(&self) -> Option<&dyn KeyValueStore> {
        if self.degraded.load(Ordering::Acquire) {
            return None;
        }
        self.store.as_deref()
    }

    fn degrade(&self, operation: &str, err: &dyn std::fmt::Display) {
        log::warn!("Location cache {operation} failed, continuing memory-only: {err}");
        self.degraded.store(true, Ordering::Release);
    }

    /// Removes the least reliable, then oldest, entries beyond capacity.
    fn evict(&self, state: &mut CacheState) {
        while state.entries.len() > self.config.max_entries {
            let victim = state
                .entries
                .iter()
                .min_by(|(_, a), (_, b)| {
                    a.reliability
                        .cmp(&b.reliability)
                        .then(a.cache_timestamp.cmp(&b.cache_timestamp))
                })
                .map(|(key, _)| key.clone());

            match victim {
                Some(key) => {
                    state.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Bumps the revision and serializes the entries. `None` when there is
    /// nothing to write.
    fn snapshot(&self, state: &mut CacheState) -> Option<(u64, String)> {
        state.revision += 1;
        self.active_store()?;
        let entries: Vec<&CacheEntry> = state.entries.values().collect();
        match serde_json::to_string(&entries) {
            Ok(json) => Some((state.revision, json)),
            Err(e) => {
                self.degrade("write", &e);
                None
            }
        }
    }

    /// Writes `snapshot` to the store, or removes it when `None`, unless a
    /// newer revision has already been applied.
    fn flush(&self, revision: u64, snapshot: Option<&str>) {
        let Some(store) = self.active_store() else {
            return;
        };
        let mut flushed = self.flushed.lock().unwrap_or_else(PoisonError::into_inner);
        if *flushed >= revision {
            return;
        }

        let (operation, result) = match snapshot {
            Some(json) => ("write", store.set(SNAPSHOT_KEY, json)),
            None => ("clear", store.remove(SNAPSHOT_KEY)),
        };
        match result {
            Ok(()) => *flushed = revision,
            Err(e) => self.degrade(operation, &e),
        }
    }

    fn restore(&self) {
        let Some(store) = self.active_store() else {
            return;
        };
        let loaded = store.get(SNAPSHOT_KEY).and_then(|value| match value {
            Some(json) => {
                serde_json::from_str::<Vec<CacheEntry>>(&json).map_err(StoreError::from)
            }
            None => Ok(Vec::new()),
        });

        match loaded {
            Ok(entries) => {
                let mut state = self.lock();
                for entry in entries.into_iter().filter(|e| e.location.is_valid()) {
                    state.entries.insert(bucket_key(&entry.location), entry);
                }
                state.current = state
                    .entries
                    .values()
                    .max_by_key(|e| e.location.timestamp)
                    .map(|e| e.location);
                self.evict(&mut state);
                log::debug!("Restored {} cached locations", state.entries.len());
            }
            Err(e) => self.degrade("read", &e),
        }
    }
}

/// Quantized bucket key for a fix.
#[must_use]
pub fn bucket_key(location: &Coordinate) -> String {
    format!(
        "{:.3},{:.3}",
        quantize(location.latitude),
        quantize(location.longitude)
    )
}

/// Reliability of a fix at `now`: accuracy (0-40) + recency (0-30) +
/// source trust (0-30), clamped to 100.
#[must_use]
pub fn reliability_score(location: &Coordinate, source: FixSource, now: DateTime<Utc>) -> u8 {
    let accuracy = match location.accuracy {
        a if a <= 10.0 => 40,
        a if a <= 50.0 => 32,
        a if a <= 100.0 => 24,
        a if a <= 500.0 => 14,
        a if a <= 1000.0 => 8,
        _ => 2,
    };

    let age_secs = location.age_at(now).num_seconds().max(0);
    let recency = match age_secs {
        0..=30 => 30,
        31..=120 => 24,
        121..=600 => 15,
        601..=1800 => 6,
        _ => 0,
    };

    (accuracy + recency + source.trust_score()).min(100)
}
