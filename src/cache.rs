//! Exploration cache: bounded, time-boxed LRU in front of the upstream
//! segment discovery query, keyed by a quantized map viewport.
//!
//! Entries are held in insertion/recency order; the front is always the
//! least recently used. A background sweep, started and stopped
//! explicitly, drops expired entries that are never looked up again.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::error::ProviderError;
use crate::traits::{SegmentExplorer, SegmentSummary};

/// Decimal degrees kept when quantizing a viewport.
const KEY_SCALE: f64 = 10_000.0;

/// A map viewport in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Rounds each edge to 4 decimal places.
    pub fn key(&self) -> ViewportKey {
        let q = |value: f64| (value * KEY_SCALE).round() as i64;
        ViewportKey {
            west: q(self.west),
            south: q(self.south),
            east: q(self.east),
            north: q(self.north),
        }
    }
}

/// Quantized viewport: edges in units of 10⁻⁴ degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportKey {
    pub west: i64,
    pub south: i64,
    pub east: i64,
    pub north: i64,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    last_access: Instant,
    access_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub access_count: u64,
    pub last_access: Instant,
    pub age: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug)]
struct Inner<V> {
    entries: IndexMap<ViewportKey, CacheEntry<V>>,
    stats: CacheStats,
}

impl<V> Inner<V> {
    fn expire(&mut self, now: Instant, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) <= ttl);
        let removed = before - self.entries.len();
        self.stats.expirations += removed as u64;
        removed
    }
}

struct Sweeper {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Thread-safe LRU with a fixed capacity and time-to-live.
///
/// Cloning shares the underlying storage.
pub struct ExplorationCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
    capacity: usize,
    ttl: Duration,
    sweeper: Arc<Mutex<Option<Sweeper>>>,
}

impl<V> Clone for ExplorationCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            capacity: self.capacity,
            ttl: self.ttl,
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<V: Clone + Send + 'static> ExplorationCache<V> {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: IndexMap::new(),
                stats: CacheStats::default(),
            })),
            capacity: capacity.max(1),
            ttl,
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Cache sized from `config` with its sweep already running.
    pub fn from_config(config: &PlannerConfig) -> Self {
        let cache = Self::new(config.cache_capacity, config.cache_ttl);
        cache.start(config.cache_sweep_interval);
        cache
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a live entry and marks it most recently used. Expired
    /// entries are removed and reported as a miss.
    pub fn get(&self, key: &ViewportKey) -> Option<V> {
        let now = Instant::now();
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;

        let Some(index) = inner.entries.get_index_of(key) else {
            inner.stats.misses += 1;
            return None;
        };

        let expired = inner
            .entries
            .get_index(index)
            .is_some_and(|(_, entry)| now.duration_since(entry.inserted_at) > self.ttl);
        if expired {
            inner.entries.shift_remove_index(index);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            return None;
        }

        let last = inner.entries.len() - 1;
        inner.entries.move_index(index, last);
        inner.stats.hits += 1;

        let (_, entry) = inner.entries.get_index_mut(last)?;
        entry.last_access = now;
        entry.access_count += 1;
        Some(entry.value.clone())
    }

    /// Inserts or replaces a value. A new key at capacity evicts the least
    /// recently used entry first.
    pub fn set(&self, key: ViewportKey, value: V) {
        let now = Instant::now();
        let mut inner = lock(&self.inner);

        if inner.entries.shift_remove(&key).is_none() && inner.entries.len() >= self.capacity {
            if let Some((evicted, _)) = inner.entries.shift_remove_index(0) {
                inner.stats.evictions += 1;
                tracing::debug!(?evicted, "exploration cache evicted least recently used entry");
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                last_access: now,
                access_count: 0,
            },
        );
    }

    /// Whether a live entry exists. Does not change recency; an expired
    /// entry is removed.
    pub fn has(&self, key: &ViewportKey) -> bool {
        let now = Instant::now();
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;

        let Some(entry) = inner.entries.get(key) else {
            return false;
        };
        if now.duration_since(entry.inserted_at) <= self.ttl {
            return true;
        }

        inner.entries.shift_remove(key);
        inner.stats.expirations += 1;
        false
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.inner).entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.inner).stats
    }

    /// Read count and last read time of an entry, without touching recency.
    pub fn entry_info(&self, key: &ViewportKey) -> Option<EntryInfo> {
        lock(&self.inner).entries.get(key).map(|entry| EntryInfo {
            access_count: entry.access_count,
            last_access: entry.last_access,
            age: entry.inserted_at.elapsed(),
        })
    }

    /// Removes every expired entry. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        lock(&self.inner).expire(Instant::now(), self.ttl)
    }

    /// Starts the periodic sweep. Calling it while a sweep is running is a
    /// no-op.
    pub fn start(&self, interval: Duration) {
        let mut sweeper = lock(&self.sweeper);
        if sweeper.is_some() {
            return;
        }

        let (stop, stopped) = mpsc::channel::<()>();
        let inner = Arc::clone(&self.inner);
        let ttl = self.ttl;
        let handle = std::thread::spawn(move || {
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = lock(&inner).expire(Instant::now(), ttl);
                        if removed > 0 {
                            tracing::debug!(removed, "exploration cache sweep");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        *sweeper = Some(Sweeper { stop, handle });
    }

    /// Stops the periodic sweep and waits for it to exit.
    pub fn stop(&self) {
        let sweeper = lock(&self.sweeper).take();
        if let Some(Sweeper { stop, handle }) = sweeper {
            let _ = stop.send(());
            if handle.join().is_err() {
                tracing::warn!("exploration cache sweep thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.sweeper).is_some()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A [`SegmentExplorer`] that answers repeated viewports from the cache.
pub struct CachedExplorer<E> {
    upstream: E,
    cache: ExplorationCache<Vec<SegmentSummary>>,
}

impl<E: SegmentExplorer> CachedExplorer<E> {
    pub fn new(upstream: E, cache: ExplorationCache<Vec<SegmentSummary>>) -> Self {
        Self { upstream, cache }
    }

    pub fn cache(&self) -> &ExplorationCache<Vec<SegmentSummary>> {
        &self.cache
    }
}

impl<E: SegmentExplorer> SegmentExplorer for CachedExplorer<E> {
    fn explore(&self, bounds: &BoundingBox) -> Result<Vec<SegmentSummary>, ProviderError> {
        let key = bounds.key();
        if let Some(segments) = self.cache.get(&key) {
            return Ok(segments);
        }

        let segments = self.upstream.explore(bounds)?;
        self.cache.set(key, segments.clone());
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;

    use super::*;
    use crate::model::Coordinate;

    fn key(i: i64) -> ViewportKey {
        ViewportKey {
            west: i,
            south: i,
            east: i + 1,
            north: i + 1,
        }
    }

    #[test]
    fn test_bounding_box_quantization() {
        let a = BoundingBox::new(6.123_41, 45.000_04, 6.2, 45.1);
        let b = BoundingBox::new(6.123_44, 44.999_96, 6.2, 45.1);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().west, 61_234);

        let c = BoundingBox::new(6.1236, 45.0, 6.2, 45.1);
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ExplorationCache::new(3, Duration::from_secs(60));
        cache.set(key(1), "one");
        cache.set(key(2), "two");
        cache.set(key(3), "three");

        // Touch 1 so 2 becomes the oldest.
        assert_eq!(cache.get(&key(1)), Some("one"));
        cache.set(key(4), "four");

        assert_eq!(cache.len(), 3);
        assert!(!cache.has(&key(2)));
        assert!(cache.has(&key(1)));
        assert!(cache.has(&key(3)));
        assert!(cache.has(&key(4)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_capacity_plus_one_evicts_exactly_one() {
        let cache = ExplorationCache::new(5, Duration::from_secs(60));
        for i in 0..6 {
            cache.set(key(i), i);
        }
        assert_eq!(cache.len(), 5);
        assert!(!cache.has(&key(0)));
        assert!((1..6).all(|i| cache.has(&key(i))));
    }

    #[test]
    fn test_replacing_key_does_not_evict() {
        let cache = ExplorationCache::new(2, Duration::from_secs(60));
        cache.set(key(1), 1);
        cache.set(key(2), 2);
        cache.set(key(1), 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key(1)), Some(10));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_get_after_ttl_is_miss_and_removes() {
        let cache = ExplorationCache::new(4, Duration::from_millis(20));
        cache.set(key(1), "v");
        assert_eq!(cache.get(&key(1)), Some("v"));

        sleep(Duration::from_millis(60));
        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_access_count() {
        let cache = ExplorationCache::new(4, Duration::from_secs(60));
        cache.set(key(1), 1);
        cache.get(&key(1));
        cache.get(&key(1));
        let info = cache.entry_info(&key(1)).unwrap();
        assert_eq!(info.access_count, 2);
        assert_eq!(cache.entry_info(&key(2)), None);
    }

    #[test]
    fn test_manual_sweep() {
        let cache = ExplorationCache::new(4, Duration::from_millis(20));
        cache.set(key(1), 1);
        cache.set(key(2), 2);
        sleep(Duration::from_millis(60));
        cache.set(key(3), 3);

        assert_eq!(cache.sweep(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_background_sweep_start_stop() {
        let cache = ExplorationCache::new(4, Duration::from_millis(10));
        cache.set(key(1), 1);
        cache.start(Duration::from_millis(5));
        assert!(cache.is_running());

        sleep(Duration::from_millis(100));
        assert!(cache.is_empty());

        cache.stop();
        assert!(!cache.is_running());
        // Stopping twice is harmless.
        cache.stop();
    }

    #[test]
    fn test_from_config_starts_sweep() {
        let config = PlannerConfig {
            cache_capacity: 3,
            ..PlannerConfig::default()
        };
        let cache: ExplorationCache<u32> = ExplorationCache::from_config(&config);
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.ttl(), config.cache_ttl);
        assert!(cache.is_running());
        cache.stop();
    }

    #[test]
    fn test_isolated_instances() {
        let a = ExplorationCache::new(2, Duration::from_secs(60));
        let b: ExplorationCache<i32> = ExplorationCache::new(2, Duration::from_secs(60));
        a.set(key(1), 1);
        assert!(!b.has(&key(1)));
    }

    struct CountingExplorer {
        calls: AtomicUsize,
    }

    impl SegmentExplorer for CountingExplorer {
        fn explore(&self, _bounds: &BoundingBox) -> Result<Vec<SegmentSummary>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SegmentSummary {
                id: "1".to_string(),
                name: "Col".to_string(),
                length_meters: 1000.0,
                elevation_gain_meters: 80.0,
                entry_coordinate: Coordinate::new(6.0, 45.0),
                exit_coordinate: Coordinate::new(6.01, 45.0),
            }])
        }
    }

    #[test]
    fn test_cached_explorer_hits_upstream_once() {
        let explorer = CachedExplorer::new(
            CountingExplorer {
                calls: AtomicUsize::new(0),
            },
            ExplorationCache::new(10, Duration::from_secs(60)),
        );
        let viewport = BoundingBox::new(6.0, 45.0, 6.1, 45.1);
        let nudged = BoundingBox::new(6.000_01, 45.0, 6.1, 45.1);

        let first = explorer.explore(&viewport).unwrap();
        let second = explorer.explore(&nudged).unwrap();
        assert_eq!(first, second);
        assert_eq!(explorer.upstream.calls.load(Ordering::SeqCst), 1);
    }
}
