//! Axis-aligned bounds.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// World or local space AABB. `min <= max` on every axis once built from points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point, or `None` for an empty iterator.
    pub fn from_points(mut points: impl Iterator<Item = Vec3>) -> Option<Self> {
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |acc, p| Self::new(acc.min.min(p), acc.max.max(p))))
    }

    pub fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }

    /// Vector from `min` to `max`; its length is the scene size.
    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Box around all eight corners after `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> BoundingBox {
        let (lo, hi) = (self.min, self.max);
        let corner = |i: u32| {
            Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            )
        };
        let first = matrix.transform_point3(lo);
        (1..8)
            .map(|i| matrix.transform_point3(corner(i)))
            .fold(Self::new(first, first), |acc, p| Self::new(acc.min.min(p), acc.max.max(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bounds = BoundingBox::from_points(
            [Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 5.0)].into_iter(),
        )
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 5.0));
        assert_eq!(bounds.center(), Vec3::new(0.0, 0.5, 2.5));
    }

    #[test]
    fn test_from_no_points() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_transformed_by_translation() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let moved = bounds.transformed(&Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(6.0, 1.0, 1.0));
    }

    #[test]
    fn test_transformed_by_rotation_grows() {
        let bounds = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let turned = bounds.transformed(&Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let half = 2.0_f32.sqrt();
        assert!((turned.max.x - half).abs() < 1e-5);
        assert!((turned.max.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
        assert_eq!(u.diagonal(), Vec3::splat(2.0));
    }
}
