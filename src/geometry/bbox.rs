// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Axis-aligned bounding boxes

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::tolerance::ToleranceContext;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Empty box: min at +inf, max at -inf, so any expansion is valid.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut bbox = Self::empty();
        for point in points {
            bbox.expand_to_include(point);
        }
        bbox
    }

    pub fn expand_to_include(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);

        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        let mut merged = *self;
        if !other.is_empty() {
            merged.expand_to_include(&other.min);
            merged.expand_to_include(&other.max);
        }
        merged
    }

    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    pub fn size(&self) -> Vector3<f64> {
        Vector3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Check overlap with another box. Boxes that only touch within the
    /// linear tolerance still count as intersecting, so booleans on touching
    /// bodies take the full pipeline rather than the disjoint short-circuit.
    pub fn intersects(&self, other: &BoundingBox, tol: &ToleranceContext) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let eps = tol.linear();
        self.min.x <= other.max.x + eps
            && self.max.x >= other.min.x - eps
            && self.min.y <= other.max.y + eps
            && self.max.y >= other.min.y - eps
            && self.min.z <= other.max.z + eps
            && self.max.z >= other.min.z - eps
    }

    /// Check whether a point lies inside or on the box within tolerance.
    pub fn contains_point(&self, point: &Point3<f64>, tol: &ToleranceContext) -> bool {
        let eps = tol.linear();
        point.x >= self.min.x - eps
            && point.x <= self.max.x + eps
            && point.y >= self.min.y - eps
            && point.y <= self.max.y + eps
            && point.z >= self.min.z - eps
            && point.z <= self.max.z + eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_expansion() {
        let mut bbox = BoundingBox::empty();
        bbox.expand_to_include(&Point3::new(1.0, 2.0, 3.0));
        bbox.expand_to_include(&Point3::new(-1.0, -2.0, -3.0));

        assert_eq!(bbox.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.center(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.volume(), 48.0);
    }

    #[test]
    fn test_empty_box() {
        let bbox = BoundingBox::empty();
        assert!(bbox.is_empty());
        assert_eq!(bbox.volume(), 0.0);

        let tol = ToleranceContext::default();
        let unit = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(!bbox.intersects(&unit, &tol));
    }

    #[test]
    fn test_merge_boxes() {
        let unit = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let shifted = BoundingBox::new(Point3::new(0.5, -1.0, 0.0), Point3::new(2.0, 0.5, 3.0));

        let merged = unit.merge(&shifted);
        assert_eq!(merged.min, Point3::new(0.0, -1.0, 0.0));
        assert_eq!(merged.max, Point3::new(2.0, 1.0, 3.0));

        // Empty operands drop out on either side
        let same = unit.merge(&BoundingBox::empty());
        assert_eq!(same.min, unit.min);
        assert_eq!(same.max, unit.max);
        let adopted = BoundingBox::empty().merge(&unit);
        assert_eq!(adopted.min, unit.min);
        assert_eq!(adopted.max, unit.max);
    }

    #[test]
    fn test_intersects_disjoint_and_touching() {
        let tol = ToleranceContext::default();
        let a = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = BoundingBox::new(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));
        let touching = BoundingBox::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));

        assert!(!a.intersects(&b, &tol));
        assert!(a.intersects(&touching, &tol));
        assert!(a.intersects(&a, &tol));
    }

    #[test]
    fn test_contains_point() {
        let tol = ToleranceContext::default();
        let bbox = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        assert!(bbox.contains_point(&Point3::new(1.0, 1.0, 1.0), &tol));
        assert!(bbox.contains_point(&Point3::new(2.0, 2.0, 2.0), &tol));
        assert!(!bbox.contains_point(&Point3::new(2.1, 1.0, 1.0), &tol));
    }
}
