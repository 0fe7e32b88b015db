//! The process-wide memoization store.
//!
//! `MemoCache` maps fingerprints to previously computed values. Entries are
//! never evicted individually: once the entry count reaches the configured
//! ceiling, the next lookup sweeps out everything older than the staleness
//! window. The ceiling only triggers the sweep; age decides what goes, so a
//! sweep over fresh entries removes nothing and the cache may stay above the
//! ceiling until entries age out.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use marz_config::CacheSettings;
use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::fingerprint::{CacheArgs, Fingerprint, Identity};

type CachedValue = Arc<dyn Any + Send + Sync>;

struct CacheEntry {
    value: CachedValue,
    written_at: Instant,
}

/// Thread-safe, time- and size-bounded memoization cache.
///
/// Lookups take a shared lock just long enough to clone the stored handle;
/// inserts and sweeps take the exclusive lock. No lock is held while a
/// client computation runs, so concurrent misses on the same key may both
/// compute; the last insert wins.
pub struct MemoCache {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    settings: CacheSettings,
    staleness: Duration,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

static GLOBAL: OnceLock<Arc<MemoCache>> = OnceLock::new();

impl MemoCache {
    /// Creates an empty cache using the system clock.
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Creates an empty cache timestamping entries with `clock`.
    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            staleness: settings.staleness(),
            settings,
            clock,
            counters: Counters::default(),
        }
    }

    /// Installs the process-wide cache with `settings`.
    ///
    /// Returns `false` if the global cache was already created, in which
    /// case the existing instance is kept.
    pub fn init_global(settings: CacheSettings) -> bool {
        GLOBAL.set(Arc::new(MemoCache::new(settings))).is_ok()
    }

    /// Returns the process-wide cache, creating it with default settings on
    /// first use.
    ///
    /// Bind the returned handle before an explicit lookup, since the setter
    /// borrows the cache:
    ///
    /// ```
    /// use marz_cache::MemoCache;
    ///
    /// let cache = MemoCache::global();
    /// let (cached, setter) = cache.get_cached_object::<u32, _>("fret_count", &(24,));
    /// if cached.is_none() {
    ///     setter.set(24u32);
    /// }
    /// ```
    pub fn global() -> Arc<MemoCache> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MemoCache::new(CacheSettings::default()))))
    }

    /// Whether memoization is active.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// The settings this cache was built with.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of the hit/miss/sweep counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Looks up the value stored under `fingerprint`.
    ///
    /// Any stored value of type `V` is a hit. A value of a different type
    /// under the same fingerprint reads as a miss. Triggers a sweep if the
    /// cache is at its size ceiling.
    pub fn get<V: Clone + 'static>(&self, fingerprint: &Fingerprint) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        let found = self
            .entries
            .read()
            .get(fingerprint)
            .map(|entry| Arc::clone(&entry.value));
        self.sweep_if_full();

        let value = found.and_then(|v| {
            let typed = v.downcast_ref::<V>().cloned();
            if typed.is_none() {
                tracing::debug!(?fingerprint, "cached value has a different type");
            }
            typed
        });
        match value {
            Some(_) => self.counters.hits.fetch_add(1, Ordering::Relaxed),
            None => self.counters.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    /// Stores `value` under `fingerprint`, replacing any previous entry and
    /// resetting its age. Does nothing when caching is disabled.
    pub fn insert<V: Send + Sync + 'static>(&self, fingerprint: Fingerprint, value: V) {
        if !self.is_enabled() {
            return;
        }
        let entry = CacheEntry {
            value: Arc::new(value),
            written_at: self.clock.now(),
        };
        // The replaced value is dropped after the guard is released.
        let replaced = self.entries.write().insert(fingerprint, entry);
        drop(replaced);
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Explicit access for call sites that do not fit a pure function.
    ///
    /// Returns whatever is cached for `base_name` with `args`, and a setter
    /// that stores a value under that same key. Never computes anything.
    /// With caching disabled, always returns `None` and a setter that
    /// discards its value.
    pub fn get_cached_object<V, A>(
        &self,
        base_name: &str,
        args: &A,
    ) -> (Option<V>, CachedObjectSetter<'_>)
    where
        V: Clone + 'static,
        A: CacheArgs + ?Sized,
    {
        if !self.is_enabled() {
            return (None, CachedObjectSetter { target: None });
        }
        let fingerprint = Fingerprint::of(&Identity::named(base_name), args);
        let cached = self.get(&fingerprint);
        tracing::debug!(
            base_name,
            hit = cached.is_some(),
            "explicit cache lookup"
        );
        (
            cached,
            CachedObjectSetter {
                target: Some((self, fingerprint)),
            },
        )
    }

    /// Removes every entry older than the staleness window and returns how
    /// many were removed.
    ///
    /// The retained entries replace the whole mapping under the exclusive
    /// lock. This is the only eviction path.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let (before, after, stale) = {
            let mut entries = self.entries.write();
            let before = entries.len();
            let (retained, stale): (HashMap<_, _>, HashMap<_, _>) = std::mem::take(&mut *entries)
                .into_iter()
                .partition(|(_, entry)| {
                    now.saturating_duration_since(entry.written_at) < self.staleness
                });
            *entries = retained;
            (before, entries.len(), stale)
        };
        // Evicted values may run arbitrary drop code; never under the lock.
        drop(stale);

        let evicted = before - after;
        self.counters.sweeps.fetch_add(1, Ordering::Relaxed);
        self.counters
            .evicted
            .fetch_add(evicted as u64, Ordering::Relaxed);
        if after < before {
            tracing::info!(before, after, "cache sweep");
        }
        evicted
    }

    fn sweep_if_full(&self) {
        if self.len() >= self.settings.max_entries {
            self.sweep();
        }
    }
}

impl fmt::Debug for MemoCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("entries", &self.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Stores a value under the key of an explicit lookup.
///
/// Returned by [`MemoCache::get_cached_object`]. May be used any number of
/// times; each call overwrites the entry and resets its age.
#[derive(Debug)]
pub struct CachedObjectSetter<'a> {
    target: Option<(&'a MemoCache, Fingerprint)>,
}

impl CachedObjectSetter<'_> {
    /// Stores `value`. Discards it if caching is disabled.
    pub fn set<V: Send + Sync + 'static>(&self, value: V) {
        if let Some((cache, fingerprint)) = &self.target {
            cache.insert(*fingerprint, value);
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    sweeps: AtomicU64,
    evicted: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a stored value.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Values written.
    pub inserts: u64,
    /// Sweeps performed.
    pub sweeps: u64,
    /// Entries removed by sweeps.
    pub evicted: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rayon::prelude::*;

    fn settings(max_entries: usize) -> CacheSettings {
        CacheSettings {
            max_entries,
            ..CacheSettings::default()
        }
    }

    fn fp(n: u32) -> Fingerprint {
        Fingerprint::of(&Identity::named("test"), &(n,))
    }

    fn cache_with_clock(max_entries: usize) -> (Arc<ManualClock>, MemoCache) {
        let clock = Arc::new(ManualClock::new());
        let cache = MemoCache::with_clock(settings(max_entries), clock.clone());
        (clock, cache)
    }

    #[test]
    fn fresh_cache_is_empty() {
        let cache = MemoCache::new(CacheSettings::default());
        assert!(cache.is_empty());
        assert_eq!(cache.get::<i32>(&fp(1)), None);
    }

    #[test]
    fn insert_then_get() {
        let cache = MemoCache::new(CacheSettings::default());
        cache.insert(fp(1), String::from("outline"));
        assert_eq!(cache.get::<String>(&fp(1)), Some("outline".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overwrite_keeps_one_entry() {
        let cache = MemoCache::new(CacheSettings::default());
        cache.insert(fp(1), 1);
        cache.insert(fp(1), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<i32>(&fp(1)), Some(2));
    }

    #[test]
    fn falsy_values_are_hits() {
        let cache = MemoCache::new(CacheSettings::default());
        cache.insert(fp(1), 0i32);
        cache.insert(fp(2), Vec::<f64>::new());
        assert_eq!(cache.get::<i32>(&fp(1)), Some(0));
        assert_eq!(cache.get::<Vec<f64>>(&fp(2)), Some(vec![]));
    }

    #[test]
    fn type_mismatch_reads_as_miss() {
        let cache = MemoCache::new(CacheSettings::default());
        cache.insert(fp(1), 1.5f64);
        assert_eq!(cache.get::<i32>(&fp(1)), None);
        assert_eq!(cache.get::<f64>(&fp(1)), Some(1.5));
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = MemoCache::new(CacheSettings::disabled());
        cache.insert(fp(1), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.get::<i32>(&fp(1)), None);
    }

    #[test]
    fn explicit_mode_roundtrip() {
        let cache = MemoCache::new(CacheSettings::default());
        let (cached, setter) = cache.get_cached_object::<String, _>("k", &(1, 2));
        assert_eq!(cached, None);
        setter.set(String::from("blank"));

        let (cached, _setter) = cache.get_cached_object::<String, _>("k", &(1, 2));
        assert_eq!(cached, Some("blank".to_string()));
    }

    #[test]
    fn explicit_mode_keys_on_name_and_args() {
        let cache = MemoCache::new(CacheSettings::default());
        let (_, setter) = cache.get_cached_object::<i32, _>("topcut", &(1, 2));
        setter.set(7);
        assert_eq!(cache.get_cached_object::<i32, _>("topcut", &(2, 1)).0, None);
        assert_eq!(cache.get_cached_object::<i32, _>("bottomcut", &(1, 2)).0, None);
        assert_eq!(cache.get_cached_object::<i32, _>("topcut", &(1, 2)).0, Some(7));
    }

    #[test]
    fn explicit_mode_disabled() {
        let cache = MemoCache::new(CacheSettings::disabled());
        let (cached, setter) = cache.get_cached_object::<i32, _>("k", &(1,));
        assert_eq!(cached, None);
        setter.set(3);
        assert!(cache.is_empty());
        assert_eq!(cache.get_cached_object::<i32, _>("k", &(1,)).0, None);
    }

    #[test]
    fn sweep_keeps_fresh_and_drops_stale() {
        let (clock, cache) = cache_with_clock(4);
        cache.insert(fp(1), 1);
        cache.insert(fp(2), 2);
        clock.advance(Duration::from_secs(301));
        cache.insert(fp(3), 3);
        cache.insert(fp(4), 4);
        assert_eq!(cache.len(), 4);

        // At the ceiling: this lookup sweeps.
        assert_eq!(cache.get::<i32>(&fp(3)), Some(3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get::<i32>(&fp(1)), None);
        assert_eq!(cache.get::<i32>(&fp(2)), None);
        assert_eq!(cache.get::<i32>(&fp(4)), Some(4));

        let stats = cache.stats();
        assert_eq!(stats.sweeps, 1);
        assert_eq!(stats.evicted, 2);
    }

    #[test]
    fn entry_exactly_at_staleness_is_dropped() {
        let (clock, cache) = cache_with_clock(1);
        cache.insert(fp(1), 1);
        clock.advance(Duration::from_secs(300));
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_of_fresh_entries_is_a_no_op() {
        let (clock, cache) = cache_with_clock(2);
        cache.insert(fp(1), 1);
        cache.insert(fp(2), 2);
        cache.insert(fp(3), 3);
        clock.advance(Duration::from_secs(10));

        assert_eq!(cache.get::<i32>(&fp(1)), Some(1));
        // Above the ceiling but nothing is stale.
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().sweeps, 1);
        assert_eq!(cache.stats().evicted, 0);
    }

    #[test]
    fn below_ceiling_does_not_sweep() {
        let (clock, cache) = cache_with_clock(10);
        cache.insert(fp(1), 1);
        clock.advance(Duration::from_secs(1000));
        assert_eq!(cache.get::<i32>(&fp(1)), Some(1));
        assert_eq!(cache.stats().sweeps, 0);
    }

    #[test]
    fn rewrite_refreshes_age() {
        let (clock, cache) = cache_with_clock(1);
        cache.insert(fp(1), 1);
        clock.advance(Duration::from_secs(200));
        cache.insert(fp(1), 2);
        clock.advance(Duration::from_secs(200));
        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.get::<i32>(&fp(1)), Some(2));
    }

    #[test]
    fn explicit_lookup_triggers_sweep() {
        let (clock, cache) = cache_with_clock(1);
        let (_, setter) = cache.get_cached_object::<i32, _>("blank", &(1,));
        setter.set(1);
        clock.advance(Duration::from_secs(301));
        let (cached, _) = cache.get_cached_object::<i32, _>("blank", &(1,));
        // Read happens before the sweep, as with any lookup.
        assert_eq!(cached, Some(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = MemoCache::new(CacheSettings::default());
        cache.insert(fp(1), 1);
        let _ = cache.get::<i32>(&fp(1));
        let _ = cache.get::<i32>(&fp(2));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn global_is_shared() {
        let a = MemoCache::global();
        let b = MemoCache::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!MemoCache::init_global(CacheSettings::disabled()));
        assert!(MemoCache::global().is_enabled());
    }

    #[test]
    fn concurrent_inserts_and_reads() {
        let cache = MemoCache::new(settings(100_000));
        (0..2_000u32).into_par_iter().for_each(|n| {
            cache.insert(fp(n), n);
            assert_eq!(cache.get::<u32>(&fp(n)), Some(n));
        });
        assert_eq!(cache.len(), 2_000);
    }

    #[test]
    fn concurrent_access_with_sweeps() {
        let (clock, cache) = cache_with_clock(64);
        (0..1_000u32).into_par_iter().for_each(|n| {
            cache.insert(fp(n), n);
            if n % 100 == 0 {
                clock.advance(Duration::from_secs(400));
            }
            let _ = cache.get::<u32>(&fp(n));
        });
        clock.advance(Duration::from_secs(400));
        cache.sweep();
        assert!(cache.is_empty());
    }

    /// A cached value whose drop reads the cache it lives in.
    struct ReadsCacheOnDrop {
        cache: std::sync::Weak<MemoCache>,
        seen_len: Arc<AtomicU64>,
    }

    impl Drop for ReadsCacheOnDrop {
        fn drop(&mut self) {
            if let Some(cache) = self.cache.upgrade() {
                self.seen_len.store(cache.len() as u64, Ordering::SeqCst);
            }
        }
    }

    fn in_background(cache: Arc<MemoCache>, op: impl FnOnce(&MemoCache) + Send + 'static) {
        let (done, finished) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            op(&cache);
            let _ = done.send(());
        });
        assert!(
            finished.recv_timeout(Duration::from_secs(5)).is_ok(),
            "cache operation did not finish"
        );
    }

    #[test]
    fn overwritten_value_drops_outside_lock() {
        let cache = Arc::new(MemoCache::new(CacheSettings::default()));
        let seen_len = Arc::new(AtomicU64::new(u64::MAX));
        cache.insert(
            fp(1),
            Arc::new(ReadsCacheOnDrop {
                cache: Arc::downgrade(&cache),
                seen_len: seen_len.clone(),
            }),
        );
        in_background(cache.clone(), |cache| cache.insert(fp(1), 5i32));
        assert_eq!(seen_len.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<i32>(&fp(1)), Some(5));
    }

    #[test]
    fn evicted_value_drops_outside_lock() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(MemoCache::with_clock(settings(1), clock.clone()));
        let seen_len = Arc::new(AtomicU64::new(u64::MAX));
        cache.insert(
            fp(1),
            ReadsCacheOnDrop {
                cache: Arc::downgrade(&cache),
                seen_len: seen_len.clone(),
            },
        );
        clock.advance(Duration::from_secs(301));
        in_background(cache.clone(), |cache| {
            assert_eq!(cache.sweep(), 1);
        });
        assert_eq!(seen_len.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn global_handle_supports_explicit_lookup() {
        let cache = MemoCache::global();
        let (cached, setter) = cache.get_cached_object::<u64, _>("global_handle_test", &(7,));
        assert_eq!(cached, None);
        setter.set(49u64);
        let (cached, _) = cache.get_cached_object::<u64, _>("global_handle_test", &(7,));
        assert_eq!(cached, Some(49));
    }

    #[test]
    fn debug_shows_size() {
        let cache = MemoCache::new(CacheSettings::default());
        cache.insert(fp(1), 1);
        let s = format!("{cache:?}");
        assert!(s.contains("MemoCache"));
        assert!(s.contains("entries: 1"));
    }
}
