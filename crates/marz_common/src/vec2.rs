//! Two-dimensional vector value type used by all geometric construction.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A point or displacement in the 2D plane.
///
/// `Vec2` is a `Copy` value: every operation returns a new vector and never
/// mutates the receiver. Equality is componentwise. Degenerate inputs never
/// panic: normalizing a zero vector yields the zero vector, and NaN or infinite
/// components are propagated rather than rejected.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Creates a vector from its components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a vector with both components set to `v`.
    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v }
    }

    /// Creates a vector of the given `length` pointing at `angle` radians
    /// from the positive x-axis.
    pub fn from_angle(angle: f64, length: f64) -> Self {
        Self::new(angle.cos(), angle.sin()).scale(length)
    }

    /// Adds `s` to both components.
    pub fn add_scalar(self, s: f64) -> Self {
        Self::new(self.x + s, self.y + s)
    }

    /// Subtracts `s` from both components.
    pub fn sub_scalar(self, s: f64) -> Self {
        Self::new(self.x - s, self.y - s)
    }

    /// Returns `self + v * s`.
    pub fn add_scaled(self, v: Vec2, s: f64) -> Self {
        Self::new(self.x + v.x * s, self.y + v.y * s)
    }

    /// Multiplies both components by `s`.
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Multiplies both components by `1 / s`.
    pub fn div_scalar(self, s: f64) -> Self {
        self.scale(1.0 / s)
    }

    /// Componentwise minimum.
    pub fn min(self, v: Vec2) -> Self {
        Self::new(self.x.min(v.x), self.y.min(v.y))
    }

    /// Componentwise maximum.
    pub fn max(self, v: Vec2) -> Self {
        Self::new(self.x.max(v.x), self.y.max(v.y))
    }

    /// Clamps each component between the matching components of `min` and `max`.
    ///
    /// Assumes `min <= max` componentwise.
    pub fn clamp(self, min: Vec2, max: Vec2) -> Self {
        Self::new(
            min.x.max(max.x.min(self.x)),
            min.y.max(max.y.min(self.y)),
        )
    }

    /// Clamps each component to `[min, max]`.
    pub fn clamp_scalar(self, min: f64, max: f64) -> Self {
        Self::new(min.max(max.min(self.x)), min.max(max.min(self.y)))
    }

    /// Keeps the direction, clamping the length to `[min, max]`.
    pub fn clamp_length(self, min: f64, max: f64) -> Self {
        let length = self.length();
        self.div_scalar(non_zero(length))
            .scale(min.max(max.min(length)))
    }

    /// Rounds both components down.
    pub fn floor(self) -> Self {
        Self::new(self.x.floor(), self.y.floor())
    }

    /// Rounds both components up.
    pub fn ceil(self) -> Self {
        Self::new(self.x.ceil(), self.y.ceil())
    }

    /// Rounds both components to the nearest integer, ties to even.
    pub fn round(self) -> Self {
        Self::new(self.x.round_ties_even(), self.y.round_ties_even())
    }

    /// Rounds both components toward zero.
    pub fn round_to_zero(self) -> Self {
        Self::new(self.x.trunc(), self.y.trunc())
    }

    /// Returns the vector with both components negated.
    pub fn negate(self) -> Self {
        Self::new(-self.x, -self.y)
    }

    /// Dot product.
    pub fn dot(self, v: Vec2) -> f64 {
        self.x * v.x + self.y * v.y
    }

    /// 2D cross product: the z component of the 3D cross product.
    pub fn cross(self, v: Vec2) -> f64 {
        self.x * v.y - self.y * v.x
    }

    /// Squared Euclidean length.
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Sum of the absolute components.
    pub fn manhattan_length(self) -> f64 {
        self.x.abs() + self.y.abs()
    }

    /// Unit vector with the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        self.div_scalar(non_zero(self.length()))
    }

    /// Angle in radians with respect to the positive x-axis, in `[0, 2π]`.
    ///
    /// Computed as `atan2(-y, -x) + π`; geometry code relies on this range.
    pub fn angle(self) -> f64 {
        (-self.y).atan2(-self.x) + PI
    }

    /// Euclidean distance to `v`.
    pub fn distance_to(self, v: Vec2) -> f64 {
        self.distance_squared(v).sqrt()
    }

    /// Squared Euclidean distance to `v`.
    pub fn distance_squared(self, v: Vec2) -> f64 {
        let dx = self.x - v.x;
        let dy = self.y - v.y;
        dx * dx + dy * dy
    }

    /// Manhattan distance to `v`.
    pub fn manhattan_distance_to(self, v: Vec2) -> f64 {
        (self.x - v.x).abs() + (self.y - v.y).abs()
    }

    /// Same direction, scaled to `length`.
    pub fn set_length(self, length: f64) -> Self {
        self.normalize().scale(length)
    }

    /// Linear interpolation towards `target`; `alpha = 0` is `self`, `alpha = 1` is `target`.
    pub fn lerp(self, target: Vec2, alpha: f64) -> Self {
        Self::new(
            self.x + (target.x - self.x) * alpha,
            self.y + (target.y - self.y) * alpha,
        )
    }

    /// Linear interpolation between `a` and `b`.
    pub fn lerp_vectors(a: Vec2, b: Vec2, alpha: f64) -> Self {
        (b - a).scale(alpha) + a
    }

    /// Rotates around `center` by `angle` radians, counter-clockwise for positive angles.
    pub fn rotate_around(self, center: Vec2, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let x = self.x - center.x;
        let y = self.y - center.y;
        Self::new(x * c - y * s + center.x, x * s + y * c + center.y)
    }

    /// The vector rotated 90° clockwise.
    pub fn perpendicular_clockwise(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// The vector rotated 90° counter-clockwise.
    pub fn perpendicular_counter_clockwise(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Reads a vector from `array[offset]` and `array[offset + 1]`.
    ///
    /// Returns `None` if the buffer is too short.
    pub fn from_array(array: &[f64], offset: usize) -> Option<Self> {
        match array.get(offset..offset.checked_add(2)?) {
            Some(&[x, y]) => Some(Self::new(x, y)),
            _ => None,
        }
    }

    /// Writes the components into `array[offset]` and `array[offset + 1]`.
    ///
    /// Returns `false` and leaves the buffer untouched if it is too short.
    pub fn to_array(self, array: &mut [f64], offset: usize) -> bool {
        let Some(end) = offset.checked_add(2) else {
            return false;
        };
        match array.get_mut(offset..end) {
            Some(slot) => {
                slot[0] = self.x;
                slot[1] = self.y;
                true
            }
            None => false,
        }
    }
}

fn non_zero(length: f64) -> f64 {
    if length == 0.0 {
        1.0
    } else {
        length
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, v: Vec2) -> Vec2 {
        Vec2::new(self.x + v.x, self.y + v.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, v: Vec2) -> Vec2 {
        Vec2::new(self.x - v.x, self.y - v.y)
    }
}

/// Componentwise product.
impl Mul for Vec2 {
    type Output = Vec2;

    fn mul(self, v: Vec2) -> Vec2 {
        Vec2::new(self.x * v.x, self.y * v.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, s: f64) -> Vec2 {
        self.scale(s)
    }
}

/// Componentwise quotient.
impl Div for Vec2 {
    type Output = Vec2;

    fn div(self, v: Vec2) -> Vec2 {
        Vec2::new(self.x / v.x, self.y / v.y)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;

    fn div(self, s: f64) -> Vec2 {
        self.div_scalar(s)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        self.negate()
    }
}

/// Stable textual representation (`x;y`), used when a vector is
/// fingerprinted by its rendering.
impl fmt::Debug for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?};{:?}", self.x, self.y)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vxy({},{})", self.x, self.y)
    }
}
