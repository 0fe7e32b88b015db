//! Neck cross-section profiles.

use std::collections::BTreeMap;

use marz_common::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::InstrumentError;

/// Name of the profile used when a requested one is unknown.
pub const DEFAULT_PROFILE: &str = "C Classic";

/// Shape parameters of a neck cross-section.
///
/// The section is interpolated through five control points: the two top
/// corners, the deepest point `h`, and two shoulder points at `h2` of the
/// depth. Offsets are fractions of the half-width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeckProfile {
    /// Display name, unique within a catalog.
    #[serde(default = "default_name")]
    pub name: String,
    /// Lateral offset of the deepest point.
    #[serde(default, rename = "center_offset")]
    pub h1_offset: f64,
    /// Lateral offset of the shoulder points.
    #[serde(default = "default_h2_offset")]
    pub h2_offset: f64,
    /// Depth of the shoulder points as a fraction of the full depth.
    #[serde(default = "default_h2")]
    pub h2: f64,
}

fn default_name() -> String {
    DEFAULT_PROFILE.to_string()
}
fn default_h2_offset() -> f64 {
    0.5
}
fn default_h2() -> f64 {
    0.75
}

impl Default for NeckProfile {
    fn default() -> Self {
        Self {
            name: default_name(),
            h1_offset: 0.0,
            h2_offset: default_h2_offset(),
            h2: default_h2(),
        }
    }
}

impl NeckProfile {
    /// The deepest point of a section `width` wide and `height` deep.
    pub fn h_point(&self, width: f64, height: f64) -> Vec2 {
        Vec2::new(-height, width * self.h1_offset / 2.0)
    }

    /// Control points of a section, from the left top corner to the right
    /// one. Depth runs along negative x, width along y.
    pub fn section_points(&self, width: f64, height: f64) -> [Vec2; 5] {
        let shoulder = -height * self.h2;
        let spread = width * self.h2_offset / 2.0;
        [
            Vec2::new(0.0, width / 2.0),
            Vec2::new(shoulder, spread),
            self.h_point(width, height),
            Vec2::new(shoulder, -spread),
            Vec2::new(0.0, -width / 2.0),
        ]
    }
}

/// The set of neck profiles offered to the user.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, NeckProfile>,
    fallback: NeckProfile,
}

impl ProfileCatalog {
    /// Parses a JSON array of profiles. Later duplicates replace earlier ones.
    pub fn from_json(json: &str) -> Result<Self, InstrumentError> {
        let list: Vec<NeckProfile> = serde_json::from_str(json)?;
        let profiles = list.into_iter().map(|p| (p.name.clone(), p)).collect();
        Ok(Self {
            profiles,
            fallback: NeckProfile::default(),
        })
    }

    /// Looks up a profile by name, falling back to the default profile.
    pub fn get(&self, name: &str) -> &NeckProfile {
        match self.profiles.get(name) {
            Some(profile) => profile,
            None => {
                tracing::debug!(name, "unknown neck profile, using default");
                &self.fallback
            }
        }
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Number of profiles in the catalog.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` if the catalog has no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
