//! Axis-aligned bounding boxes

use crate::types::{mat4_mul_point, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box stored as center and half-extent.
///
/// Mesh bounds are expressed in the mesh's local space; the renderer
/// transforms them into world space for frustum culling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec3,
    pub half_size: Vec3,
}

impl Aabb {
    pub const fn new(center: Vec3, half_size: Vec3) -> Self {
        Self { center, half_size }
    }

    /// Box spanning `min..max`
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            half_size: (max - min) * 0.5,
        }
    }

    /// Smallest box containing all the given points; `None` if empty.
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let first = points.first()?;
        let mut min = Vec3::from_array(*first);
        let mut max = min;

        for p in points.iter().skip(1) {
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);

            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }

        Some(Self::from_min_max(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_size
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_size
    }

    /// The 8 corner points of the box
    pub fn corners(&self) -> [[f32; 3]; 8] {
        let min = self.min();
        let max = self.max();
        [
            [min.x, min.y, min.z],
            [max.x, min.y, min.z],
            [min.x, max.y, min.z],
            [max.x, max.y, min.z],
            [min.x, min.y, max.z],
            [max.x, min.y, max.z],
            [min.x, max.y, max.z],
            [max.x, max.y, max.z],
        ]
    }

    /// Transform the box by an affine matrix, returning the axis-aligned
    /// box of the 8 transformed corners.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let mut transformed = [[0.0f32; 3]; 8];
        for (out, corner) in transformed.iter_mut().zip(self.corners()) {
            *out = mat4_mul_point(matrix, &corner);
        }
        Self::from_points(&transformed).expect("corner set is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transform;

    #[test]
    fn test_from_min_max() {
        let b = Aabb::from_min_max(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 4.0, 6.0));
        assert_eq!(b.center, Vec3::new(0.0, 2.0, 4.0));
        assert_eq!(b.half_size, Vec3::new(1.0, 2.0, 2.0));
    }

    #[test]
    fn test_transform_translation() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let m = Transform::from_position(Vec3::new(5.0, 0.0, -2.0)).to_matrix();
        let t = b.transform(&m);
        assert!((t.center - Vec3::new(5.0, 0.0, -2.0)).length() < 1e-6);
        assert!((t.half_size - Vec3::ONE).length() < 1e-6);
    }

    #[test]
    fn test_transform_rotation_grows_box() {
        // A unit box rotated 45 degrees around Y must grow along X and Z
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let m = Transform::default()
            .with_rotation(Vec3::new(0.0, 45.0, 0.0))
            .to_matrix();
        let t = b.transform(&m);
        let expected = 2.0f32.sqrt();
        assert!((t.half_size.x - expected).abs() < 1e-4);
        assert!((t.half_size.z - expected).abs() < 1e-4);
        assert!((t.half_size.y - 1.0).abs() < 1e-4);
    }
}
