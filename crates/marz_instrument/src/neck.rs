//! Neck reference data.

use std::fmt;
use std::sync::Arc;

use marz_cache::{CacheArg, MemoCache};
use marz_common::{ContentHash, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::InstrumentError;
use crate::profile::{NeckProfile, ProfileCatalog};

/// Curve family used for the heel transition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum TransitionFunction {
    /// Catenary in height and width.
    #[default]
    Catenary,
    /// Quadratic in height and width.
    Quadratic,
    /// Quadratic in width, catenary in height.
    #[serde(rename = "Quadratic-Catenary")]
    QuadraticCatenary,
    /// Catenary in width, quadratic in height.
    #[serde(rename = "Catenary-Quadratic")]
    CatenaryQuadratic,
}

impl fmt::Display for TransitionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransitionFunction::Catenary => "Catenary",
            TransitionFunction::Quadratic => "Quadratic",
            TransitionFunction::QuadraticCatenary => "Quadratic-Catenary",
            TransitionFunction::CatenaryQuadratic => "Catenary-Quadratic",
        })
    }
}

/// User-facing neck parameters, as edited in the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeckSpec {
    /// Thickness at the nut.
    pub start_thickness: f64,
    /// Thickness where the heel transition starts.
    pub end_thickness: f64,
    /// Average scale length.
    pub scale_length: f64,
    /// Name of the cross-section profile.
    pub profile: String,
    /// Length of the heel transition.
    pub transition_length: f64,
    /// Tension of the heel transition.
    pub transition_tension: f64,
    /// Curve family of the heel transition.
    pub transition_function: TransitionFunction,
}

/// Immutable neck reference data.
///
/// Fields are private and fixed at construction, so the content hash taken
/// in [`NeckData::new`] stays valid for the lifetime of the value.
#[derive(Debug, Clone, PartialEq)]
pub struct NeckData {
    start_thickness: f64,
    thickness_slope: f64,
    profile: NeckProfile,
    transition_length: f64,
    transition_tension: f64,
    transition_function: TransitionFunction,
    content_hash: ContentHash,
}

impl NeckData {
    /// Derives neck data from `spec`, resolving the profile in `catalog`.
    pub fn new(spec: &NeckSpec, catalog: &ProfileCatalog) -> Result<Self, InstrumentError> {
        if spec.scale_length.is_nan() || spec.scale_length <= 0.0 {
            return Err(InstrumentError::InvalidDimension {
                field: "scale_length",
                value: spec.scale_length,
            });
        }
        let thickness_slope =
            (spec.end_thickness - spec.start_thickness) / (spec.scale_length / 2.0);
        let profile = catalog.get(&spec.profile).clone();
        let content_hash = ContentHash::from_reprs(&[
            &thickness_slope,
            &spec.start_thickness,
            &profile.name,
            &profile.h1_offset,
            &profile.h2,
            &profile.h2_offset,
            &spec.transition_length,
            &spec.transition_tension,
            &spec.transition_function,
        ]);
        Ok(Self {
            start_thickness: spec.start_thickness,
            thickness_slope,
            profile,
            transition_length: spec.transition_length,
            transition_tension: spec.transition_tension,
            transition_function: spec.transition_function,
            content_hash,
        })
    }

    /// Thickness at the nut.
    pub fn start_thickness(&self) -> f64 {
        self.start_thickness
    }

    /// Thickness change per unit of length along the neck.
    pub fn thickness_slope(&self) -> f64 {
        self.thickness_slope
    }

    /// The resolved cross-section profile.
    pub fn profile(&self) -> &NeckProfile {
        &self.profile
    }

    /// Length of the heel transition.
    pub fn transition_length(&self) -> f64 {
        self.transition_length
    }

    /// Tension of the heel transition.
    pub fn transition_tension(&self) -> f64 {
        self.transition_tension
    }

    /// Curve family of the heel transition.
    pub fn transition_function(&self) -> TransitionFunction {
        self.transition_function
    }

    /// Hash over every field, taken at construction.
    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    /// Neck thickness at `dist` along the mid line.
    ///
    /// `nut_offset` is the distance from the mid line start to the nut; the
    /// thickness equals `start_thickness` there.
    pub fn thickness_at(&self, dist: f64, nut_offset: f64) -> f64 {
        let base = self.thickness_slope * -nut_offset + self.start_thickness;
        self.thickness_slope * dist + base
    }

    /// Cross-section control points at each `(dist, width)` station.
    ///
    /// Memoized per neck and station list through the explicit cache API.
    pub fn sections(
        &self,
        cache: &MemoCache,
        nut_offset: f64,
        stations: &[(f64, f64)],
    ) -> Arc<Vec<[Vec2; 5]>> {
        let (cached, setter) =
            cache.get_cached_object("neck_sections", &(self, nut_offset, stations));
        if let Some(sections) = cached {
            return sections;
        }
        let sections: Arc<Vec<[Vec2; 5]>> = Arc::new(
            stations
                .iter()
                .map(|&(dist, width)| {
                    self.profile
                        .section_points(width, self.thickness_at(dist, nut_offset))
                })
                .collect(),
        );
        setter.set(Arc::clone(&sections));
        sections
    }
}

impl CacheArg for NeckData {
    fn arg_hash(&self) -> u64 {
        self.content_hash.arg_hash()
    }
}
