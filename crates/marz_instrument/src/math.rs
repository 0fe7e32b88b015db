//! Catenary helpers for the heel transition.

use std::sync::Arc;

use marz_cache::{MemoCache, Memoized};

/// A pair of mirrored catenary curves.
///
/// `descending` falls towards zero at `x = l`, `ascending` at `x = -l`.
/// Results are clamped to `±hard_clamp` so steep parameters stay bounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpoCurves {
    /// Position of the curve vertex.
    pub l: f64,
    /// Catenary parameter; larger values flatten the curve.
    pub a: f64,
    /// Height scale.
    pub h1: f64,
    /// Absolute bound on the result.
    pub hard_clamp: f64,
}

impl ExpoCurves {
    /// Curve whose vertex sits at `x = l`.
    pub fn descending(&self, x: f64) -> f64 {
        self.clamp(self.h1 * (((self.l - x) / self.a).cosh() - 1.0))
    }

    /// Curve whose vertex sits at `x = -l`.
    pub fn ascending(&self, x: f64) -> f64 {
        self.clamp(self.h1 * (((self.l + x) / self.a).cosh() - 1.0))
    }

    fn clamp(&self, v: f64) -> f64 {
        if v.abs() >= self.hard_clamp {
            self.hard_clamp.copysign(v)
        } else {
            v
        }
    }
}

type CurveFn = fn((f64, f64, f64, f64)) -> ExpoCurves;

/// Builds [`ExpoCurves`], reusing instances for repeated parameters.
#[derive(Debug, Clone)]
pub struct ExpoCurveSource {
    memo: Memoized<CurveFn>,
}

impl ExpoCurveSource {
    /// A source backed by `cache`.
    pub fn new(cache: Arc<MemoCache>) -> Self {
        let build: CurveFn = |(l, a, h1, hard_clamp)| ExpoCurves {
            l,
            a,
            h1,
            hard_clamp,
        };
        Self {
            memo: Memoized::named(cache, "expo_curves", build),
        }
    }

    /// The curve pair for the given parameters.
    pub fn curves(&self, l: f64, a: f64, h1: f64, hard_clamp: f64) -> ExpoCurves {
        self.memo.call((l, a, h1, hard_clamp))
    }
}
