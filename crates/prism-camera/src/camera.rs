//! Eye/center/up camera.

use glam::{Mat4, Quat, Vec3};
use prism_core::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::errors::CameraError;

/// World up axis used by the controllers and default framing.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Squared length under which a direction is treated as zero.
const DEGENERATE_EPSILON: f32 = 1e-12;

/// A look-at camera.
///
/// `up` is kept unit length and orthogonal to the view direction, so
/// `front`, `left` and `up` always form an orthonormal frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    eye: Vec3,
    center: Vec3,
    up: Vec3,
}

impl Default for Camera {
    /// Looking down -Z from the origin.
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            center: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }
}

impl Camera {
    /// Build a camera, re-orthogonalizing `up` against the view direction.
    ///
    /// Fails when eye and center coincide or when `up` is parallel to the
    /// view direction.
    pub fn new(eye: Vec3, center: Vec3, up: Vec3) -> Result<Self, CameraError> {
        let front = center - eye;
        if front.length_squared() < DEGENERATE_EPSILON {
            return Err(CameraError::Degenerate {
                reason: "eye and center coincide",
            });
        }
        let left = up.normalize_or_zero().cross(front.normalize());
        if left.length_squared() < DEGENERATE_EPSILON {
            return Err(CameraError::Degenerate {
                reason: "up is parallel to the view direction",
            });
        }
        let up = front.cross(left).normalize();
        Ok(Self { eye, center, up })
    }

    /// Like [`Camera::new`], substituting another axis for a parallel `up`.
    pub fn with_fallback_up(eye: Vec3, center: Vec3, up: Vec3) -> Result<Self, CameraError> {
        Self::new(eye, center, up)
            .or_else(|_| Self::new(eye, center, Vec3::Z))
            .or_else(|_| Self::new(eye, center, Vec3::X))
    }

    /// Default framing for a scene's bounds.
    ///
    /// Looks at the box center from `center + diagonal`, or from beside the
    /// box when it is flat along Z. Without bounds the default camera is used.
    pub fn frame_bounds(bounds: Option<&BoundingBox>) -> Self {
        let Some(bounds) = bounds else {
            return Self::default();
        };
        let center = bounds.center();
        let diagonal = bounds.diagonal();
        let eye = if diagonal.z > 0.0 {
            center + diagonal
        } else {
            center + 2.0 * diagonal.cross(WORLD_UP)
        };

        Self::new(eye, center, WORLD_UP)
            .or_else(|_| {
                let distance = diagonal.length().max(1.0);
                Self::new(center + Vec3::new(0.0, 0.0, distance), center, WORLD_UP)
            })
            .unwrap_or_default()
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit view direction.
    pub fn front(&self) -> Vec3 {
        (self.center - self.eye).normalize()
    }

    /// Unit vector pointing to the camera's left.
    pub fn left(&self) -> Vec3 {
        self.up.cross(self.front()).normalize()
    }

    /// Distance from eye to center.
    pub fn distance(&self) -> f32 {
        (self.center - self.eye).length()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.center, self.up)
    }

    /// Translate eye and center in the local frame.
    pub fn move_local(&mut self, truck_left: f32, pedestal_up: f32, dolly_in: f32) {
        let offset = truck_left * self.left() + pedestal_up * self.up + dolly_in * self.front();
        self.eye += offset;
        self.center += offset;
    }

    /// Roll around front, then tilt around the rolled left axis, then pan
    /// around the tilted up axis. The eye stays fixed.
    pub fn rotate_local(&mut self, roll_right: f32, tilt_down: f32, pan_left: f32) {
        let distance = self.distance();
        let front = self.front();

        self.up = rotate(self.up, roll_right, front);

        let left = self.left();
        let tilt = Quat::from_axis_angle(left, tilt_down);
        let front = tilt * front;
        self.up = (tilt * self.up).normalize();

        let front = rotate(front, pan_left, self.up);
        self.center = self.eye + front * distance;
    }

    /// Rotate the view direction and up around a world axis. The eye stays fixed.
    pub fn rotate_world(&mut self, radians: f32, axis: Vec3) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        let rotation = Quat::from_axis_angle(axis, radians);
        let front = self.center - self.eye;
        self.center = self.eye + rotation * front;
        self.up = (rotation * self.up).normalize();
    }
}

fn rotate(v: Vec3, radians: f32, axis: Vec3) -> Vec3 {
    Quat::from_axis_angle(axis, radians) * v
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOLERANCE: f32 = 1e-4;

    fn close(a: Vec3, b: Vec3, tolerance: f32) -> bool {
        (a - b).length() <= tolerance * (1.0 + a.length().max(b.length()))
    }

    #[test]
    fn test_new_reorthogonalizes_up() {
        let camera = Camera::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 1.0)).unwrap();
        assert!(close(camera.up(), Vec3::Y, TOLERANCE));
        assert!(close(camera.left(), Vec3::NEG_X, TOLERANCE));
        assert!(close(camera.front(), Vec3::NEG_Z, TOLERANCE));
    }

    #[test]
    fn test_collinear_up_is_rejected() {
        let result = Camera::new(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert!(matches!(result, Err(CameraError::Degenerate { .. })));
        let result = Camera::new(Vec3::ONE, Vec3::ONE, Vec3::Y);
        assert!(matches!(result, Err(CameraError::Degenerate { .. })));
    }

    #[test]
    fn test_fallback_up() {
        let camera = Camera::with_fallback_up(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0), Vec3::Y).unwrap();
        assert!(camera.up().dot(camera.front()).abs() < TOLERANCE);
    }

    #[test]
    fn test_view_matrix_maps_center_to_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        let p = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(close(p, Vec3::new(0.0, 0.0, -5.0), TOLERANCE));
    }

    #[test]
    fn test_move_local_axes() {
        let mut camera = Camera::default();
        camera.move_local(1.0, 2.0, 3.0);
        // left is -X, up is +Y, front is -Z
        assert!(close(camera.eye(), Vec3::new(-1.0, 2.0, -3.0), TOLERANCE));
        assert!(close(camera.center(), Vec3::new(-1.0, 2.0, -4.0), TOLERANCE));
    }

    #[test]
    fn test_rotate_local_pan_keeps_eye() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0), Vec3::Y).unwrap();
        camera.rotate_local(0.0, 0.0, std::f32::consts::FRAC_PI_2);
        assert_eq!(camera.eye(), Vec3::ZERO);
        // panning left by 90 degrees turns -Z into -X
        assert!(close(camera.center(), Vec3::new(-2.0, 0.0, 0.0), TOLERANCE));
    }

    #[test]
    fn test_rotate_local_tilt_moves_up() {
        let mut camera = Camera::default();
        camera.rotate_local(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        // tilting down turns the view towards -Y
        assert!(close(camera.front(), Vec3::NEG_Y, TOLERANCE));
        assert!(close(camera.up(), Vec3::NEG_Z, TOLERANCE));
    }

    #[test]
    fn test_rotate_local_roll() {
        let mut camera = Camera::default();
        camera.rotate_local(std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        assert!(close(camera.front(), Vec3::NEG_Z, TOLERANCE));
        assert!(camera.up().dot(Vec3::Y).abs() < TOLERANCE);
    }

    #[test]
    fn test_rotate_local_applies_roll_tilt_pan_in_order() {
        use std::f32::consts::FRAC_PI_2;
        let mut camera = Camera::default();
        camera.rotate_local(FRAC_PI_2, FRAC_PI_2, FRAC_PI_2);
        // roll: up becomes +X and left +Y; tilt about +Y: front -X, up -Z;
        // pan about -Z: front +Y
        assert_eq!(camera.eye(), Vec3::ZERO);
        assert!(close(camera.front(), Vec3::Y, TOLERANCE));
        assert!(close(camera.up(), Vec3::NEG_Z, TOLERANCE));
        assert!(close(camera.left(), Vec3::X, TOLERANCE));
    }

    #[test]
    fn test_rotate_local_matches_composed_rotations() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let mut camera = Camera::new(eye, Vec3::new(-2.0, 0.5, 0.0), Vec3::Y).unwrap();
        let (front, left, up) = (camera.front(), camera.left(), camera.up());
        let distance = camera.distance();
        let (roll, tilt, pan) = (0.4, -0.7, 1.1);

        let roll_q = Quat::from_axis_angle(front, roll);
        let tilt_q = Quat::from_axis_angle(roll_q * left, tilt);
        let tilted_up = tilt_q * roll_q * up;
        let pan_q = Quat::from_axis_angle(tilted_up, pan);
        let expected_front = pan_q * tilt_q * front;

        camera.rotate_local(roll, tilt, pan);
        assert_eq!(camera.eye(), eye);
        assert!(close(camera.front(), expected_front, TOLERANCE));
        assert!(close(camera.up(), tilted_up, TOLERANCE));
        assert!((camera.distance() - distance).abs() < TOLERANCE);

        let (f, l, u) = (camera.front(), camera.left(), camera.up());
        assert!((u.length() - 1.0).abs() < TOLERANCE);
        assert!(f.dot(l).abs() < TOLERANCE);
        assert!(f.dot(u).abs() < TOLERANCE);
        assert!(l.dot(u).abs() < TOLERANCE);
    }

    #[test]
    fn test_rotate_world_zero_axis_is_ignored() {
        let mut camera = Camera::default();
        camera.rotate_world(1.0, Vec3::ZERO);
        assert_eq!(camera, Camera::default());
    }

    #[test]
    fn test_frame_bounds() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let camera = Camera::frame_bounds(Some(&bounds));
        assert_eq!(camera.center(), Vec3::ONE);
        assert_eq!(camera.eye(), Vec3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_frame_flat_bounds() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 0.0));
        let camera = Camera::frame_bounds(Some(&bounds));
        // 2 * ((2,2,0) x Y) = (0,0,4)
        assert!(close(camera.eye(), Vec3::new(1.0, 1.0, 4.0), TOLERANCE));
    }

    #[test]
    fn test_frame_vertical_segment_falls_back() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0));
        let camera = Camera::frame_bounds(Some(&bounds));
        assert!(close(camera.eye(), Vec3::new(0.0, 1.5, 3.0), TOLERANCE));
    }

    #[test]
    fn test_frame_without_bounds() {
        assert_eq!(Camera::frame_bounds(None), Camera::default());
    }

    fn vec3_strategy() -> impl Strategy<Value = Vec3> {
        (-10.0f32..10.0, -10.0f32..10.0, -10.0f32..10.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn test_frame_is_orthonormal(eye in vec3_strategy(), center in vec3_strategy(), up in vec3_strategy()) {
            prop_assume!((center - eye).length() > 1e-2);
            prop_assume!(up.normalize_or_zero().cross((center - eye).normalize()).length() > 1e-2);
            let camera = Camera::new(eye, center, up).unwrap();
            let (f, l, u) = (camera.front(), camera.left(), camera.up());
            prop_assert!((f.length() - 1.0).abs() < 1e-4);
            prop_assert!((l.length() - 1.0).abs() < 1e-4);
            prop_assert!((u.length() - 1.0).abs() < 1e-4);
            prop_assert!(f.dot(l).abs() < 1e-4);
            prop_assert!(f.dot(u).abs() < 1e-4);
            prop_assert!(l.dot(u).abs() < 1e-4);
            prop_assert!(close(f, (center - eye).normalize(), 1e-5));
        }

        #[test]
        fn test_move_local_inverse(a in -5.0f32..5.0, b in -5.0f32..5.0, c in -5.0f32..5.0) {
            let original = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(-2.0, 0.5, 0.0), Vec3::Y).unwrap();
            let mut camera = original;
            camera.move_local(a, b, c);
            camera.move_local(-a, -b, -c);
            prop_assert!(close(camera.eye(), original.eye(), 1e-4));
            prop_assert!(close(camera.center(), original.center(), 1e-4));
        }

        #[test]
        fn test_rotate_world_inverse(theta in -3.0f32..3.0, axis in vec3_strategy()) {
            prop_assume!(axis.length() > 1e-2);
            let original = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(-2.0, 0.5, 0.0), Vec3::Y).unwrap();
            let mut camera = original;
            camera.rotate_world(theta, axis);
            camera.rotate_world(-theta, axis);
            prop_assert!(close(camera.front(), original.front(), 1e-4));
            prop_assert!(close(camera.up(), original.up(), 1e-4));
            prop_assert_eq!(camera.eye(), original.eye());
        }
    }
}
