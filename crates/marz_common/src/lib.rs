//! Shared value types used across the Marz instrument workbench.
//!
//! This crate provides the 2D vector type used by every geometric
//! construction and the content hash used as the identity of immutable
//! value objects.

#![warn(missing_docs)]

pub mod hash;
pub mod vec2;

pub use hash::ContentHash;
pub use vec2::Vec2;
