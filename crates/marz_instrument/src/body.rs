//! Body reference data.

use marz_cache::CacheArg;
use marz_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::neck::NeckData;

/// User-facing body dimensions, as edited in the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    /// Overall body length.
    pub length: f64,
    /// Overall body width.
    pub width: f64,
    /// Thickness of the back.
    pub back_thickness: f64,
    /// Thickness of the top.
    pub top_thickness: f64,
    /// Depth of the neck pocket.
    pub neck_pocket_depth: f64,
    /// Length of the neck pocket.
    pub neck_pocket_length: f64,
}

/// Immutable body reference data.
///
/// Cached geometry takes a `BodyData` as its argument; two instances built
/// from the same dimensions and neck hash alike and share cache entries.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyData {
    spec: BodySpec,
    neck_angle: f64,
    top_offset: f64,
    neck: NeckData,
    content_hash: ContentHash,
}

impl BodyData {
    /// Builds body data for `spec` joined to `neck` at `neck_angle` radians,
    /// with the fretboard `top_offset` above the body top.
    pub fn new(spec: BodySpec, neck_angle: f64, top_offset: f64, neck: NeckData) -> Self {
        let content_hash = ContentHash::from_reprs(&[
            &spec.length,
            &spec.width,
            &spec.back_thickness,
            &spec.top_thickness,
            &spec.neck_pocket_depth,
            &spec.neck_pocket_length,
            &neck_angle,
            &top_offset,
            &neck.content_hash(),
        ]);
        Self {
            spec,
            neck_angle,
            top_offset,
            neck,
            content_hash,
        }
    }

    /// The body dimensions.
    pub fn spec(&self) -> &BodySpec {
        &self.spec
    }

    /// Neck break angle in radians.
    pub fn neck_angle(&self) -> f64 {
        self.neck_angle
    }

    /// Gap between the body top and the fretboard bottom.
    pub fn top_offset(&self) -> f64 {
        self.top_offset
    }

    /// The neck this body is joined to.
    pub fn neck(&self) -> &NeckData {
        &self.neck
    }

    /// Hash over every field, taken at construction.
    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    /// Top plus back thickness.
    pub fn total_thickness(&self) -> f64 {
        self.spec.top_thickness + self.spec.back_thickness
    }

    /// Total thickness including the fretboard offset.
    pub fn total_thickness_with_offset(&self) -> f64 {
        self.total_thickness() + self.top_offset
    }
}

impl CacheArg for BodyData {
    fn arg_hash(&self) -> u64 {
        self.content_hash.arg_hash()
    }
}
