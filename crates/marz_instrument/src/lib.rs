//! Instrument reference data consumed by the geometry builders.
//!
//! Every type here is an immutable value whose content hash is computed
//! once at construction, so equal inputs land on the same cache entries.
//! The CAD-side constructions that consume them live in the host.

#![warn(missing_docs)]

pub mod body;
pub mod error;
pub mod math;
pub mod neck;
pub mod profile;

pub use body::{BodyData, BodySpec};
pub use error::InstrumentError;
pub use math::{ExpoCurveSource, ExpoCurves};
pub use neck::{NeckData, NeckSpec, TransitionFunction};
pub use profile::{NeckProfile, ProfileCatalog};
