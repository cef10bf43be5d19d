//! Light sources and their shadow-casting state

use crate::camera::Camera;
use crate::entity::{Entity, EntityInfo, EntityKind};
use kiln_core::{mat4_identity, Mat4, MeshId, Vec3};

/// Number of quadrants in a cascaded directional shadow atlas
pub const CASCADE_SLOTS: usize = 4;

/// Light kind, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Ambient,
    Spot,
    Point,
    Directional,
}

impl LightKind {
    /// GPU-side tag matching the shader's light-type switch
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Ambient => 0,
            Self::Spot => 1,
            Self::Point => 2,
            Self::Directional => 3,
        }
    }
}

/// Descriptor of a light's allocated shadow target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMapInfo {
    pub width: u32,
    pub height: u32,
}

/// A positioned light source with an embedded shadow-casting camera.
///
/// Ambient lights carry no camera and never take the shadow path. The
/// shadow target itself lives renderer-side; `shadow_map` records that the
/// target has been allocated (exactly once, on the first shadow pass) and
/// its dimensions.
#[derive(Debug, Clone)]
pub struct Light {
    pub info: EntityInfo,
    kind: LightKind,

    pub intensity: f32,
    /// Attenuation radius in world units
    pub max_dist: f32,
    pub color: Vec3,
    /// Spot cone half-angle in degrees; also sets the shadow camera FOV
    pub angle_cutoff: f32,
    pub spot_exponent: f32,
    /// Four-quadrant cascaded shadows (directional only)
    pub is_cascade: bool,

    /// Shadow-casting viewpoint; `None` for ambient lights
    pub camera: Option<Camera>,
    /// Offset from the viewer at which a directional light's camera sits
    pub target_vector: Vec3,

    /// Set once the renderer has allocated this light's depth target
    pub shadow_map: Option<ShadowMapInfo>,
    /// Stored view-projection per cascade quadrant
    pub shadow_viewprojection: [Mat4; CASCADE_SLOTS],
    far_cascade_valid: bool,

    /// Optional marker mesh drawn by the light-gizmo debug pass
    pub marker_mesh: Option<MeshId>,
}

impl Light {
    pub fn new(kind: LightKind) -> Self {
        let name = match kind {
            LightKind::Ambient => "Ambient light",
            LightKind::Spot => "Spot light",
            LightKind::Point => "Point light",
            LightKind::Directional => "Directional light",
        };

        let angle_cutoff = 30.0;
        let camera = match kind {
            LightKind::Ambient => None,
            LightKind::Spot | LightKind::Point => {
                let mut camera = Camera::new();
                // Shadow targets are square; the cone angle sets the FOV
                camera.set_perspective(angle_cutoff * 2.0, 1.0, 1.0, 1000.0);
                camera.look_at(Vec3::ZERO, Vec3::FORWARD, Vec3::UP);
                Some(camera)
            }
            LightKind::Directional => {
                let mut camera = Camera::new();
                camera.set_orthographic(-256.0, 256.0, -256.0, 256.0, -500.0, 5000.0);
                camera.look_at(Vec3::ZERO, Vec3::FORWARD, Vec3::UP);
                Some(camera)
            }
        };

        Self {
            info: EntityInfo::new(name),
            kind,
            intensity: 1.0,
            max_dist: 100.0,
            color: Vec3::ONE,
            angle_cutoff,
            spot_exponent: 0.0,
            is_cascade: false,
            camera,
            target_vector: Vec3::ZERO,
            shadow_map: None,
            shadow_viewprojection: [mat4_identity(); CASCADE_SLOTS],
            far_cascade_valid: false,
            marker_mesh: None,
        }
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Whether this light participates in shadow-map generation at all
    pub fn casts_shadows(&self) -> bool {
        !matches!(self.kind, LightKind::Ambient)
    }

    /// Depth-target dimensions per light kind. Point lights use a flattened
    /// tall target instead of a cubemap.
    pub fn shadow_resolution(&self) -> Option<(u32, u32)> {
        match self.kind {
            LightKind::Ambient => None,
            LightKind::Spot | LightKind::Directional => Some((1024, 1024)),
            LightKind::Point => Some((512, 3072)),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.info.position()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.info.set_position(position);
        let front = self.info.front();
        if let Some(camera) = &mut self.camera {
            camera.look_at(position, position + front, Vec3::UP);
        }
    }

    pub fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.color = Vec3::new(r, g, b);
    }

    /// World-space direction the light shines along
    pub fn direction(&self) -> Vec3 {
        self.info.front()
    }

    /// Cosine of the spot half-angle, uploaded to shaders
    pub fn spot_cosine(&self) -> f32 {
        self.angle_cutoff.to_radians().cos()
    }

    /// Keep a directional light's shadow camera anchored to the viewer:
    /// the camera rides at `viewer eye + target_vector`, aimed at the eye.
    pub fn update_directional(&mut self, user_camera: &Camera) {
        let user_eye = user_camera.eye;
        if let Some(camera) = &mut self.camera {
            let eye = user_eye + self.target_vector;
            camera.look_at(eye, user_eye, Vec3::UP);
        }
    }

    /// Whether the farthest cascade quadrant's stored matrix is still valid
    pub fn far_cascade_valid(&self) -> bool {
        self.far_cascade_valid
    }

    /// Mark the farthest cascade as computed; it is skipped on subsequent
    /// shadow generations until invalidated.
    pub fn latch_far_cascade(&mut self) {
        self.far_cascade_valid = true;
    }

    /// Force the farthest cascade to recompute on the next shadow pass
    /// (call when the light or its camera parameters meaningfully change).
    pub fn invalidate_far_cascade(&mut self) {
        self.far_cascade_valid = false;
    }
}

impl Entity for Light {
    fn info(&self) -> &EntityInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut EntityInfo {
        &mut self.info
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Light
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_has_no_camera_or_shadow_path() {
        let light = Light::new(LightKind::Ambient);
        assert!(light.camera.is_none());
        assert!(!light.casts_shadows());
        assert_eq!(light.shadow_resolution(), None);
    }

    #[test]
    fn test_shadow_resolutions_per_kind() {
        assert_eq!(
            Light::new(LightKind::Spot).shadow_resolution(),
            Some((1024, 1024))
        );
        assert_eq!(
            Light::new(LightKind::Directional).shadow_resolution(),
            Some((1024, 1024))
        );
        assert_eq!(
            Light::new(LightKind::Point).shadow_resolution(),
            Some((512, 3072))
        );
    }

    #[test]
    fn test_spot_camera_fov_is_twice_cutoff() {
        let light = Light::new(LightKind::Spot);
        let camera = light.camera.as_ref().unwrap();
        assert!((camera.fov - light.angle_cutoff * 2.0).abs() < 1e-6);
        assert!(!camera.is_orthographic());
    }

    #[test]
    fn test_directional_camera_is_orthographic() {
        let light = Light::new(LightKind::Directional);
        let camera = light.camera.as_ref().unwrap();
        assert!(camera.is_orthographic());
        assert_eq!(camera.ortho, [-256.0, 256.0, -256.0, 256.0]);
        assert_eq!(camera.near, -500.0);
        assert_eq!(camera.far, 5000.0);
    }

    #[test]
    fn test_update_directional_tracks_viewer() {
        let mut light = Light::new(LightKind::Directional);
        light.target_vector = Vec3::new(50.0, 100.0, 0.0);

        let mut viewer = Camera::new();
        viewer.look_at(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO, Vec3::UP);

        light.update_directional(&viewer);
        let camera = light.camera.as_ref().unwrap();
        assert!((camera.eye - Vec3::new(60.0, 100.0, 0.0)).length() < 1e-6);
        assert!((camera.center - viewer.eye).length() < 1e-6);
    }

    #[test]
    fn test_far_cascade_latch() {
        let mut light = Light::new(LightKind::Directional);
        assert!(!light.far_cascade_valid());
        light.latch_far_cascade();
        assert!(light.far_cascade_valid());
        light.invalidate_far_cascade();
        assert!(!light.far_cascade_valid());
    }
}
