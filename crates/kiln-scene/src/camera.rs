//! 3D camera with cached matrices and frustum testing
//!
//! Both the user's viewing camera and every shadow-casting light's camera are
//! instances of this type. The view/projection/view-projection matrices are
//! cached fields rather than computed on demand: shadow-map generation snaps
//! the view-matrix translation to a texel grid in place and then refreshes
//! the combined matrix.

use kiln_core::{mat4_identity, mat4_mul, Aabb, Mat4, Vec3};

/// Projection kind currently configured on a camera
#[derive(Debug, Clone, Copy, PartialEq)]
enum Projection {
    Perspective,
    Orthographic,
}

/// A 3D camera: eye position, cached view/projection matrices, frustum test
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,

    /// Vertical field of view in degrees (perspective only)
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    /// Orthographic extents: left, right, bottom, top
    pub ortho: [f32; 4],

    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_projection: Mat4,

    projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            eye: Vec3::new(0.0, 10.0, 10.0),
            center: Vec3::ZERO,
            up: Vec3::UP,
            fov: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            ortho: [-1.0, 1.0, -1.0, 1.0],
            view_matrix: mat4_identity(),
            projection_matrix: mat4_identity(),
            view_projection: mat4_identity(),
            projection: Projection::Perspective,
        };
        camera.look_at(camera.eye, camera.center, camera.up);
        camera.set_perspective(camera.fov, camera.aspect, camera.near, camera.far);
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_orthographic(&self) -> bool {
        self.projection == Projection::Orthographic
    }

    /// Point the camera at `center` from `eye` and rebuild the view matrix
    pub fn look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.eye = eye;
        self.center = center;
        self.up = up;

        let f = (center - eye).normalized();
        let s = f.cross(&up).normalized();
        let u = s.cross(&f);

        self.view_matrix = [
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [-s.dot(&eye), -u.dot(&eye), f.dot(&eye), 1.0],
        ];
        self.refresh_view_projection();
    }

    /// Configure a perspective projection (fov in degrees, depth to [0, 1])
    pub fn set_perspective(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.fov = fov;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.projection = Projection::Perspective;

        let f = 1.0 / (fov.to_radians() / 2.0).tan();
        self.projection_matrix = [
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, far / (near - far), -1.0],
            [0.0, 0.0, near * far / (near - far), 0.0],
        ];
        self.refresh_view_projection();
    }

    /// Configure an orthographic projection (depth to [0, 1]; near may be
    /// negative, which directional shadow cameras rely on)
    pub fn set_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        self.ortho = [left, right, bottom, top];
        self.near = near;
        self.far = far;
        self.projection = Projection::Orthographic;

        let rml = right - left;
        let tmb = top - bottom;
        let fmn = far - near;
        self.projection_matrix = [
            [2.0 / rml, 0.0, 0.0, 0.0],
            [0.0, 2.0 / tmb, 0.0, 0.0],
            [0.0, 0.0, -1.0 / fmn, 0.0],
            [
                -(right + left) / rml,
                -(top + bottom) / tmb,
                -near / fmn,
                1.0,
            ],
        ];
        self.refresh_view_projection();
    }

    /// Width of the orthographic volume (shadow snapping needs it)
    pub fn ortho_width(&self) -> f32 {
        self.ortho[1] - self.ortho[0]
    }

    /// Recompute the combined view-projection from the cached view and
    /// projection matrices. Call after mutating either matrix directly.
    pub fn refresh_view_projection(&mut self) {
        self.view_projection = mat4_mul(&self.projection_matrix, &self.view_matrix);
    }

    /// Camera forward direction in world space
    pub fn forward(&self) -> Vec3 {
        (self.center - self.eye).normalized()
    }

    /// The six frustum planes of this camera's view-projection matrix
    pub fn frustum_planes(&self) -> [[f32; 4]; 6] {
        frustum_planes(&self.view_projection)
    }

    /// Test an axis-aligned box (center + half extents) against the frustum.
    /// Returns true when the box is at least partially inside.
    pub fn test_box_in_frustum(&self, center: Vec3, half_size: Vec3) -> bool {
        box_in_frustum(&self.frustum_planes(), center, half_size)
    }

    /// Convenience wrapper for testing a world-space `Aabb`
    pub fn test_aabb_in_frustum(&self, aabb: &Aabb) -> bool {
        self.test_box_in_frustum(aabb.center, aabb.half_size)
    }
}

/// The six frustum planes of a view-projection matrix as (normal, distance)
/// with inside being the non-negative side. Row combinations per
/// Gribb-Hartmann, with the near plane taken from the depth row alone
/// because both projections map depth to [0, 1].
pub fn frustum_planes(m: &Mat4) -> [[f32; 4]; 6] {
    let row = |i: usize| [m[0][i], m[1][i], m[2][i], m[3][i]];
    let r0 = row(0);
    let r1 = row(1);
    let r2 = row(2);
    let r3 = row(3);

    let add = |a: [f32; 4], b: [f32; 4]| [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]];
    let sub = |a: [f32; 4], b: [f32; 4]| [a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]];

    [
        add(r3, r0), // left
        sub(r3, r0), // right
        add(r3, r1), // bottom
        sub(r3, r1), // top
        r2,          // near
        sub(r3, r2), // far
    ]
}

/// Six-plane box test against precomputed frustum planes
pub fn box_in_frustum(planes: &[[f32; 4]; 6], center: Vec3, half_size: Vec3) -> bool {
    for plane in planes {
        let normal = Vec3::new(plane[0], plane[1], plane[2]);
        let dist = normal.dot(&center) + plane[3];
        let radius = normal.abs().dot(&half_size);
        if dist + radius < 0.0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> Camera {
        let mut camera = Camera::new();
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::UP);
        camera.set_perspective(60.0, 1.0, 0.1, 100.0);
        camera
    }

    #[test]
    fn test_box_at_origin_is_visible() {
        let camera = viewer();
        assert!(camera.test_box_in_frustum(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn test_box_behind_camera_is_culled() {
        let camera = viewer();
        assert!(!camera.test_box_in_frustum(Vec3::new(0.0, 0.0, 50.0), Vec3::ONE));
    }

    #[test]
    fn test_box_beyond_far_plane_is_culled() {
        let camera = viewer();
        assert!(!camera.test_box_in_frustum(Vec3::new(0.0, 0.0, -500.0), Vec3::ONE));
    }

    #[test]
    fn test_box_far_to_the_side_is_culled() {
        let camera = viewer();
        assert!(!camera.test_box_in_frustum(Vec3::new(200.0, 0.0, -5.0), Vec3::ONE));
    }

    #[test]
    fn test_large_box_straddling_frustum_is_visible() {
        let camera = viewer();
        assert!(camera.test_box_in_frustum(Vec3::new(30.0, 0.0, -5.0), Vec3::new(40.0, 1.0, 1.0)));
    }

    #[test]
    fn test_orthographic_culling() {
        let mut camera = Camera::new();
        camera.look_at(Vec3::new(0.0, 100.0, 0.0), Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        camera.set_orthographic(-256.0, 256.0, -256.0, 256.0, -500.0, 5000.0);

        assert!(camera.test_box_in_frustum(Vec3::ZERO, Vec3::ONE));
        assert!(!camera.test_box_in_frustum(Vec3::new(1000.0, 0.0, 0.0), Vec3::ONE));
    }

    #[test]
    fn test_view_projection_refresh_after_direct_mutation() {
        let mut camera = viewer();
        let before = camera.view_projection;
        camera.view_matrix[3][0] += 1.0;
        camera.refresh_view_projection();
        assert_ne!(before, camera.view_projection);
    }
}
