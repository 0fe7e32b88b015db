//! Process-wide memoization of expensive parametric geometry.
//!
//! Results are keyed by a [`Fingerprint`] derived from the computation's
//! identity and its arguments. Two access modes share one [`MemoCache`]:
//! [`Memoized`] wraps a pure function, and
//! [`MemoCache::get_cached_object`] gives direct get/set access for call
//! sites that only want to cache part of their work.
//!
//! Entries expire by age. Once the cache holds `max_entries` entries, the
//! next lookup sweeps out everything written more than the staleness
//! window ago.

#![warn(missing_docs)]

pub mod clock;
pub mod fingerprint;
pub mod memo;
pub mod memoize;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fingerprint::{
    CacheArg, CacheArgs, Fingerprint, FingerprintBuilder, Hashed, Identity, Repr,
};
pub use memo::{CacheStats, CachedObjectSetter, MemoCache};
pub use memoize::Memoized;
