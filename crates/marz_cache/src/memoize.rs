//! Transparent memoization of pure functions.

use std::fmt;
use std::sync::Arc;

use crate::fingerprint::{CacheArgs, Fingerprint, Identity};
use crate::memo::MemoCache;

/// A pure function wrapped with a [`MemoCache`].
///
/// Each call fingerprints the wrapper's identity together with the
/// arguments. A stored result is returned without running the function;
/// otherwise the function runs with no lock held and its result is stored.
/// Clones share the identity, and therefore the cached results.
///
/// The wrapped function must be deterministic in its arguments: anything
/// else it reads is invisible to the fingerprint.
#[derive(Clone)]
pub struct Memoized<F> {
    cache: Arc<MemoCache>,
    identity: Identity,
    f: F,
}

impl<F> Memoized<F> {
    /// Wraps `f` under a freshly registered identity.
    pub fn new(cache: Arc<MemoCache>, f: F) -> Self {
        Self {
            cache,
            identity: Identity::register(),
            f,
        }
    }

    /// Wraps `f` under a caller-chosen name.
    ///
    /// Wrappers with the same name share cache entries, so the name must be
    /// unique to the computation.
    pub fn named(cache: Arc<MemoCache>, name: impl Into<String>, f: F) -> Self {
        Self {
            cache,
            identity: Identity::named(name),
            f,
        }
    }

    /// The identity results are cached under.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The backing cache.
    pub fn cache(&self) -> &Arc<MemoCache> {
        &self.cache
    }

    /// Calls the wrapped function, or returns its cached result for `args`.
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
        A: CacheArgs,
        R: Clone + Send + Sync + 'static,
    {
        if !self.cache.is_enabled() {
            return (self.f)(args);
        }
        let fingerprint = Fingerprint::of(&self.identity, &args);
        if let Some(hit) = self.cache.get::<R>(&fingerprint) {
            return hit;
        }
        let value = (self.f)(args);
        self.cache.insert(fingerprint, value.clone());
        value
    }

    /// Like [`call`](Self::call) for fallible functions.
    ///
    /// Only successful results are cached. An error is returned unchanged
    /// and leaves the cache untouched, so the next call with the same
    /// arguments runs the function again.
    pub fn try_call<A, R, E>(&self, args: A) -> Result<R, E>
    where
        F: Fn(A) -> Result<R, E>,
        A: CacheArgs,
        R: Clone + Send + Sync + 'static,
    {
        if !self.cache.is_enabled() {
            return (self.f)(args);
        }
        let fingerprint = Fingerprint::of(&self.identity, &args);
        if let Some(hit) = self.cache.get::<R>(&fingerprint) {
            return Ok(hit);
        }
        let value = (self.f)(args)?;
        self.cache.insert(fingerprint, value.clone());
        Ok(value)
    }
}

impl<F> fmt::Debug for Memoized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marz_config::CacheSettings;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> Arc<MemoCache> {
        Arc::new(MemoCache::new(CacheSettings::default()))
    }

    #[test]
    fn second_call_is_served_from_cache() {
        let calls = AtomicUsize::new(0);
        let square = Memoized::new(cache(), |(x,): (i64,)| {
            calls.fetch_add(1, Ordering::SeqCst);
            x * x
        });
        assert_eq!(square.call((12,)), 144);
        assert_eq!(square.call((12,)), 144);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn different_arguments_compute_separately() {
        let calls = AtomicUsize::new(0);
        let sub = Memoized::new(cache(), |(a, b): (i32, i32)| {
            calls.fetch_add(1, Ordering::SeqCst);
            a - b
        });
        assert_eq!(sub.call((5, 3)), 2);
        assert_eq!(sub.call((3, 5)), -2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_cache_always_computes() {
        let calls = AtomicUsize::new(0);
        let cache = Arc::new(MemoCache::new(CacheSettings::disabled()));
        let id = Memoized::new(cache.clone(), |(x,): (u8,)| {
            calls.fetch_add(1, Ordering::SeqCst);
            x
        });
        for _ in 0..5 {
            assert_eq!(id.call((9,)), 9);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(cache.is_empty());
    }

    #[test]
    fn failures_are_not_cached() {
        let calls = AtomicUsize::new(0);
        let parse = Memoized::new(cache(), |(s,): (&str,)| {
            calls.fetch_add(1, Ordering::SeqCst);
            s.parse::<f64>().map_err(|e| e.to_string())
        });
        assert!(parse.try_call(("abc",)).is_err());
        assert!(parse.try_call(("abc",)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(parse.cache().is_empty());

        assert_eq!(parse.try_call(("2.5",)), Ok(2.5));
        assert_eq!(parse.try_call(("2.5",)), Ok(2.5));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn error_is_returned_unchanged() {
        #[derive(Debug, PartialEq)]
        struct Degenerate(u32);
        let f = Memoized::new(cache(), |(n,): (u32,)| -> Result<u32, Degenerate> {
            Err(Degenerate(n))
        });
        assert_eq!(f.try_call((7,)), Err(Degenerate(7)));
    }

    #[test]
    fn wrappers_do_not_share_results() {
        let shared = cache();
        let double = Memoized::new(shared.clone(), |(x,): (i32,)| x * 2);
        let triple = Memoized::new(shared.clone(), |(x,): (i32,)| x * 3);
        assert_eq!(double.call((5,)), 10);
        assert_eq!(triple.call((5,)), 15);
        assert_ne!(double.identity(), triple.identity());
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn clones_share_identity_and_results() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let neg = Memoized::new(cache(), move |(x,): (i32,)| {
            counter.fetch_add(1, Ordering::SeqCst);
            -x
        });
        let other = neg.clone();
        assert_eq!(neg.call((4,)), -4);
        assert_eq!(other.call((4,)), -4);
        assert_eq!(neg.identity(), other.identity());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn named_wrappers_share_entries() {
        let shared = cache();
        let a = Memoized::named(shared.clone(), "width_at", |(x,): (i32,)| x + 1);
        let b = Memoized::named(shared.clone(), "width_at", |(x,): (i32,)| x + 100);
        assert_eq!(a.call((1,)), 2);
        assert_eq!(b.call((1,)), 2);
    }

    #[test]
    fn nested_calls_do_not_deadlock() {
        let shared = cache();
        let inner = Memoized::new(shared.clone(), |(x,): (i32,)| x + 1);
        let outer = Memoized::new(shared.clone(), move |(x,): (i32,)| {
            inner.call((x,)) * 10
        });
        assert_eq!(outer.call((1,)), 20);
        assert_eq!(outer.call((1,)), 20);
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn concurrent_callers_agree() {
        let calls = AtomicUsize::new(0);
        let slow = Memoized::new(cache(), |(x,): (u64,)| {
            calls.fetch_add(1, Ordering::SeqCst);
            (0..=x).sum::<u64>()
        });
        let results: Vec<u64> = (0..64).into_par_iter().map(|_| slow.call((1000,))).collect();
        assert!(results.iter().all(|&r| r == 500_500));
        let n = calls.load(Ordering::SeqCst);
        assert!((1..=64).contains(&n));
        assert_eq!(slow.call((1000,)), 500_500);
        assert_eq!(calls.load(Ordering::SeqCst), n);
    }

    #[test]
    fn debug_shows_identity() {
        let f = Memoized::named(cache(), "profile", |(): ()| 0);
        assert!(format!("{f:?}").contains("profile"));
    }
}
