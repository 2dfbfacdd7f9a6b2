// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Numeric tolerance context shared by all geometric predicates

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Default linear tolerance in model units.
pub const DEFAULT_LINEAR_TOLERANCE: f64 = 1e-7;

/// Bundle of epsilon thresholds used for every geometric comparison.
///
/// Immutable after construction; `Copy`, so it is threaded by value through
/// component constructors rather than living in global state. All predicates
/// in the kernel route through one context so decisions stay consistent for
/// a given model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceContext {
    linear: f64,
    angular: f64,
}

impl Default for ToleranceContext {
    fn default() -> Self {
        Self {
            linear: DEFAULT_LINEAR_TOLERANCE,
            angular: DEFAULT_LINEAR_TOLERANCE.sqrt(),
        }
    }
}

impl ToleranceContext {
    /// Build a context with an explicit linear tolerance, for callers working
    /// at unusual scales (millimeter vs. meter models). The angular tolerance
    /// is derived as `sqrt(linear)`.
    pub fn with_linear(linear: f64) -> Result<Self> {
        if !linear.is_finite() || linear <= 0.0 {
            return Err(KernelError::InvalidParameter(format!(
                "linear tolerance must be positive and finite, got {linear}"
            )));
        }
        Ok(Self {
            linear,
            angular: linear.sqrt(),
        })
    }

    /// Linear tolerance in model units.
    pub fn linear(&self) -> f64 {
        self.linear
    }

    /// Angular tolerance in radians.
    pub fn angular(&self) -> f64 {
        self.angular
    }

    /// True if `x` is zero within the linear tolerance.
    pub fn is_zero(&self, x: f64) -> bool {
        x.abs() < self.linear
    }

    /// True if an area is zero within the squared linear tolerance.
    /// Areas are in squared model units, so comparing them against the
    /// plain linear threshold would make the cutoff scale-dependent.
    pub fn is_zero_area(&self, area: f64) -> bool {
        area.abs() < self.linear * self.linear
    }

    /// True if two points coincide within the linear tolerance.
    pub fn points_equal(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        (a - b).norm() < self.linear
    }

    /// True if two directions are parallel (or anti-parallel) within the
    /// angular tolerance. Zero-length inputs are never parallel to anything.
    pub fn parallel(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        let na = a.norm();
        let nb = b.norm();
        if self.is_zero(na) || self.is_zero(nb) {
            return false;
        }
        // sin(angle) between the directions
        a.cross(b).norm() / (na * nb) < self.angular
    }

    /// True if three points are collinear: the triangle they span has a
    /// height below the linear tolerance.
    pub fn collinear(&self, p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> bool {
        let base = p1 - p0;
        let base_len = base.norm();
        if self.is_zero(base_len) {
            return true;
        }
        (p2 - p0).cross(&base).norm() / base_len < self.linear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let tol = ToleranceContext::default();
        assert_eq!(tol.linear(), DEFAULT_LINEAR_TOLERANCE);
        assert!(tol.angular() > tol.linear());
    }

    #[test]
    fn test_area_threshold_is_squared() {
        let tol = ToleranceContext::with_linear(1e-3).unwrap();
        // Below the linear threshold but well above its square: real area.
        assert!(!tol.is_zero_area(1e-4));
        assert!(tol.is_zero_area(1e-7));
        assert!(tol.is_zero_area(-1e-7));
    }

    #[test]
    fn test_points_equal_within_tolerance() {
        let tol = ToleranceContext::default();
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0 + 1e-9, 2.0, 3.0);
        let c = Point3::new(1.001, 2.0, 3.0);
        assert!(tol.points_equal(&a, &b));
        assert!(!tol.points_equal(&a, &c));
    }

    #[test]
    fn test_parallel_vectors() {
        let tol = ToleranceContext::default();
        let x = Vector3::new(1.0, 0.0, 0.0);
        let neg_x = Vector3::new(-3.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert!(tol.parallel(&x, &neg_x));
        assert!(!tol.parallel(&x, &y));
        assert!(!tol.parallel(&x, &Vector3::zeros()));
    }

    #[test]
    fn test_collinear_points() {
        let tol = ToleranceContext::default();
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        assert!(tol.collinear(&p0, &p1, &Point3::new(5.0, 0.0, 0.0)));
        assert!(!tol.collinear(&p0, &p1, &Point3::new(0.5, 0.1, 0.0)));
    }

    #[test]
    fn test_invalid_linear_tolerance_rejected() {
        assert!(ToleranceContext::with_linear(0.0).is_err());
        assert!(ToleranceContext::with_linear(-1e-6).is_err());
        assert!(ToleranceContext::with_linear(f64::NAN).is_err());
    }
}
