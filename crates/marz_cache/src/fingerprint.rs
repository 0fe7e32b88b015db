//! Cache key derivation from a call identity and its arguments.
//!
//! A [`Fingerprint`] is derived from an [`Identity`] (which function or named
//! operation is being cached) plus a hash of every argument. Arguments opt in
//! through the [`CacheArg`] capability: types with a structural hash use it
//! directly, anything else can be wrapped in [`Repr`] to be hashed by its
//! `Debug` rendering.
//!
//! Representation hashing is an approximation. Two different values that
//! render identically share a fingerprint, and two equal values that render
//! differently do not. Fingerprints themselves are 128-bit hashes, so distinct
//! argument lists can in principle collide; such collisions are accepted.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use marz_common::{ContentHash, Vec2};
use xxhash_rust::xxh3::Xxh3;

/// Which computation a fingerprint belongs to.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Identity {
    /// A process-unique id handed out to each wrapped function.
    Registered(u64),
    /// A caller-chosen name, as used by explicit lookups.
    Named(String),
}

impl Identity {
    /// Allocates a fresh identity, distinct from every other one in this process.
    pub fn register() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Identity::Registered(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// An identity for a caller-chosen name.
    pub fn named(name: impl Into<String>) -> Self {
        Identity::Named(name.into())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Registered(id) => write!(f, "fn#{id}"),
            Identity::Named(name) => f.write_str(name),
        }
    }
}

/// A value that can take part in a fingerprint.
pub trait CacheArg {
    /// Returns a hash that is stable for the lifetime of the process and
    /// equal for values that should share cache entries.
    fn arg_hash(&self) -> u64;
}

/// Hashes any `Hash` value with XXH3.
pub fn structural_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = Xxh3::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Uses the wrapped value's structural [`Hash`] as its argument hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Hashed<T>(pub T);

impl<T: Hash> CacheArg for Hashed<T> {
    fn arg_hash(&self) -> u64 {
        structural_hash(&self.0)
    }
}

/// Hashes the wrapped value by its `Debug` rendering.
///
/// This is the fallback for argument types with no structural hash. It is
/// only as good as the rendering: it must be deterministic and must include
/// everything that affects the cached result.
#[derive(Clone, Copy, PartialEq)]
pub struct Repr<T>(pub T);

impl<T: fmt::Debug> CacheArg for Repr<T> {
    fn arg_hash(&self) -> u64 {
        let repr = format!("{:?}", self.0);
        tracing::trace!(%repr, "fingerprinting argument by representation");
        structural_hash(repr.as_str())
    }
}

impl<T: fmt::Debug> fmt::Debug for Repr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

macro_rules! structural_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CacheArg for $ty {
                fn arg_hash(&self) -> u64 {
                    structural_hash(self)
                }
            }
        )*
    };
}

structural_arg!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, str, String,
    ContentHash,
);

/// Folds `-0.0` into `0.0` and every NaN into one canonical NaN so that
/// numerically equal floats hash alike.
fn float_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

impl CacheArg for f64 {
    fn arg_hash(&self) -> u64 {
        structural_hash(&float_bits(*self))
    }
}

impl CacheArg for f32 {
    fn arg_hash(&self) -> u64 {
        f64::from(*self).arg_hash()
    }
}

impl CacheArg for Vec2 {
    fn arg_hash(&self) -> u64 {
        structural_hash(&[float_bits(self.x), float_bits(self.y)])
    }
}

impl<T: CacheArg + ?Sized> CacheArg for &T {
    fn arg_hash(&self) -> u64 {
        (**self).arg_hash()
    }
}

impl<T: CacheArg + ?Sized> CacheArg for Box<T> {
    fn arg_hash(&self) -> u64 {
        (**self).arg_hash()
    }
}

impl<T: CacheArg + ?Sized> CacheArg for Arc<T> {
    fn arg_hash(&self) -> u64 {
        (**self).arg_hash()
    }
}

impl<T: CacheArg> CacheArg for Option<T> {
    fn arg_hash(&self) -> u64 {
        match self {
            None => structural_hash(&0u8),
            Some(v) => structural_hash(&(1u8, v.arg_hash())),
        }
    }
}

impl<T: CacheArg> CacheArg for [T] {
    fn arg_hash(&self) -> u64 {
        let hashes: Vec<u64> = self.iter().map(CacheArg::arg_hash).collect();
        structural_hash(&hashes)
    }
}

impl<T: CacheArg, const N: usize> CacheArg for [T; N] {
    fn arg_hash(&self) -> u64 {
        self.as_slice().arg_hash()
    }
}

impl<T: CacheArg> CacheArg for Vec<T> {
    fn arg_hash(&self) -> u64 {
        self.as_slice().arg_hash()
    }
}

impl<A: CacheArg, B: CacheArg> CacheArg for (A, B) {
    fn arg_hash(&self) -> u64 {
        structural_hash(&[self.0.arg_hash(), self.1.arg_hash()])
    }
}

impl<A: CacheArg, B: CacheArg, C: CacheArg> CacheArg for (A, B, C) {
    fn arg_hash(&self) -> u64 {
        structural_hash(&[self.0.arg_hash(), self.1.arg_hash(), self.2.arg_hash()])
    }
}

/// An argument list: positional arguments and, optionally, keyword arguments.
///
/// Tuples of [`CacheArg`] values are positional argument lists. Parameter
/// structs implement this by writing one [`FingerprintBuilder::keyword`]
/// segment per field.
pub trait CacheArgs {
    /// Appends this argument list to `fp`.
    fn write_args(&self, fp: &mut FingerprintBuilder);
}

impl CacheArgs for () {
    fn write_args(&self, _fp: &mut FingerprintBuilder) {}
}

macro_rules! tuple_args {
    ($($name:ident),+) => {
        impl<$($name: CacheArg),+> CacheArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn write_args(&self, fp: &mut FingerprintBuilder) {
                let ($($name,)+) = self;
                $(fp.arg($name);)+
            }
        }
    };
}

tuple_args!(A);
tuple_args!(A, B);
tuple_args!(A, B, C);
tuple_args!(A, B, C, D);
tuple_args!(A, B, C, D, E);
tuple_args!(A, B, C, D, E, F);
tuple_args!(A, B, C, D, E, F, G);
tuple_args!(A, B, C, D, E, F, G, H);

/// A derived cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Derives the fingerprint of calling `identity` with `args`.
    pub fn of<A: CacheArgs + ?Sized>(identity: &Identity, args: &A) -> Self {
        let mut builder = FingerprintBuilder::new(identity.clone());
        args.write_args(&mut builder);
        builder.build()
    }

    /// Returns the raw 128-bit value.
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:08x}..)", (self.0 >> 96) as u32)
    }
}

/// Accumulates the segments of a [`Fingerprint`].
///
/// Positional arguments are order-sensitive. Keyword arguments are rendered
/// as `name:hash` segments and sorted by name when the fingerprint is built,
/// so the order they were added in does not matter.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    identity: Identity,
    positional: Vec<u64>,
    keywords: Vec<(String, u64)>,
}

impl FingerprintBuilder {
    /// Starts a fingerprint for `identity`.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            positional: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg<T: CacheArg + ?Sized>(&mut self, value: &T) -> &mut Self {
        self.positional.push(value.arg_hash());
        self
    }

    /// Sets a keyword argument. A repeated name replaces the earlier value.
    pub fn keyword<T: CacheArg + ?Sized>(&mut self, name: &str, value: &T) -> &mut Self {
        let hash = value.arg_hash();
        match self.keywords.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = hash,
            None => self.keywords.push((name.to_string(), hash)),
        }
        self
    }

    /// Appends a whole argument list.
    pub fn args<A: CacheArgs + ?Sized>(&mut self, args: &A) -> &mut Self {
        args.write_args(self);
        self
    }

    /// Combines the identity and all segments into one fingerprint.
    pub fn build(&self) -> Fingerprint {
        let mut keywords: Vec<&(String, u64)> = self.keywords.iter().collect();
        keywords.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hasher = Xxh3::new();
        self.identity.hash(&mut hasher);
        hasher.write_usize(self.positional.len());
        for hash in &self.positional {
            hasher.write_u64(*hash);
        }
        hasher.write_usize(keywords.len());
        for (name, hash) in keywords {
            format!("{name}:{hash}").hash(&mut hasher);
        }
        Fingerprint(hasher.digest128())
    }
}
