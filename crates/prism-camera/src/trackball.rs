//! Orbit-style controller.

use glam::{Quat, Vec3};
use tracing::debug;

use crate::camera::{Camera, WORLD_UP};
use crate::input::{DragTracker, InputSource, Key, MouseButton};

/// Radians (orbit) or world units (pan, dolly) per pixel of drag.
const DRAG_SENSITIVITY: f32 = 0.01;

/// Closest the eye may dolly up to the center.
pub const DOLLY_EPSILON: f32 = 1e-4;

/// Clamp a dolly offset so the eye never reaches the center.
///
/// Positive offsets move toward the center and are capped at
/// `view_length - DOLLY_EPSILON`; moving away is unbounded.
pub fn clamp_dolly(offset: f32, view_length: f32) -> f32 {
    if offset > 0.0 {
        offset.min(view_length - DOLLY_EPSILON)
    } else {
        offset
    }
}

/// Middle-button orbit, Shift+middle pan, Ctrl+middle dolly.
#[derive(Debug, Clone)]
pub struct TrackballController {
    camera: Camera,
    world_up: Vec3,
    drag: DragTracker,
}

impl TrackballController {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            world_up: WORLD_UP,
            drag: DragTracker::new(MouseButton::Middle),
        }
    }

    /// Axis horizontal drags orbit around and the camera's up is kept
    /// against. A zero vector leaves it unchanged.
    pub fn with_world_up(mut self, world_up: Vec3) -> Self {
        if let Some(axis) = world_up.try_normalize() {
            self.world_up = axis;
        }
        self
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Apply one frame of input. Returns whether the camera moved.
    pub fn update(&mut self, input: &dyn InputSource, _elapsed: f32) -> bool {
        let delta = self.drag.poll(input);
        if !self.drag.is_pressed() {
            return false;
        }

        if input.is_key_down(Key::LeftShift) {
            if delta.x == 0.0 && delta.y == 0.0 {
                return false;
            }
            self.camera
                .move_local(DRAG_SENSITIVITY * delta.x, DRAG_SENSITIVITY * delta.y, 0.0);
            return true;
        }

        if input.is_key_down(Key::LeftControl) {
            if delta.x == 0.0 {
                return false;
            }
            return self.dolly(DRAG_SENSITIVITY * delta.x);
        }

        if delta.x == 0.0 && delta.y == 0.0 {
            return false;
        }
        self.orbit(DRAG_SENSITIVITY * delta.y, -DRAG_SENSITIVITY * delta.x)
    }

    fn dolly(&mut self, offset: f32) -> bool {
        let offset = clamp_dolly(offset, self.camera.distance());
        let eye = self.camera.eye() + offset * self.camera.front();
        self.replace_camera(eye)
    }

    fn orbit(&mut self, longitude: f32, latitude: f32) -> bool {
        let center = self.camera.center();
        let rotation = Quat::from_axis_angle(self.world_up, latitude)
            * Quat::from_axis_angle(self.camera.left(), longitude);
        let eye = center + rotation * (self.camera.eye() - center);
        self.replace_camera(eye)
    }

    fn replace_camera(&mut self, eye: Vec3) -> bool {
        match Camera::new(eye, self.camera.center(), self.world_up) {
            Ok(camera) => {
                self.camera = camera;
                true
            }
            Err(e) => {
                debug!("trackball move rejected: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputState;
    use glam::Vec2;

    fn start_drag(controller: &mut TrackballController, input: &mut InputState) {
        input.set_cursor(Vec2::new(200.0, 200.0));
        input.set_button(MouseButton::Middle, true);
        assert!(!controller.update(input, 0.016));
    }

    fn camera_at_distance(distance: f32) -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, distance), Vec3::ZERO, Vec3::Y).unwrap()
    }

    #[test]
    fn test_requires_middle_button() {
        let mut controller = TrackballController::new(camera_at_distance(5.0));
        let mut input = InputState::new();
        input.set_cursor(Vec2::new(0.0, 0.0));
        input.set_button(MouseButton::Left, true);
        controller.update(&input, 0.016);
        input.set_cursor(Vec2::new(40.0, 0.0));
        assert!(!controller.update(&input, 0.016));
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut controller = TrackballController::new(camera_at_distance(5.0));
        let mut input = InputState::new();
        start_drag(&mut controller, &mut input);

        input.set_cursor(Vec2::new(230.0, 180.0));
        assert!(controller.update(&input, 0.016));
        let camera = controller.camera();
        assert_eq!(camera.center(), Vec3::ZERO);
        assert!((camera.distance() - 5.0).abs() < 1e-4);
        assert!(camera.eye().x < 0.0);
    }

    #[test]
    fn test_vertical_orbit_turns_around_left() {
        let camera = Camera::new(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y).unwrap();
        let left = camera.left();
        let mut controller = TrackballController::new(camera);
        let mut input = InputState::new();
        start_drag(&mut controller, &mut input);

        input.set_cursor(Vec2::new(200.0, 220.0));
        assert!(controller.update(&input, 0.016));
        let moved = controller.camera();
        let expected = Quat::from_axis_angle(left, 0.2) * Vec3::new(5.0, 0.0, 0.0);
        assert!((moved.eye() - expected).length() < 1e-4);
        assert!((moved.left() - left).length() < 1e-4);
        assert!((moved.distance() - 5.0).abs() < 1e-4);
        assert_eq!(moved.center(), Vec3::ZERO);
    }

    #[test]
    fn test_orbit_around_custom_world_up() {
        let camera = Camera::new(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::Z).unwrap();
        let mut controller = TrackballController::new(camera).with_world_up(Vec3::Z);
        assert_eq!(controller.world_up(), Vec3::Z);
        let mut input = InputState::new();
        start_drag(&mut controller, &mut input);

        input.set_cursor(Vec2::new(230.0, 200.0));
        assert!(controller.update(&input, 0.016));
        let moved = controller.camera();
        let expected = Quat::from_axis_angle(Vec3::Z, -0.3) * Vec3::new(5.0, 0.0, 0.0);
        assert!((moved.eye() - expected).length() < 1e-4);
        assert!(moved.eye().z.abs() < 1e-5);
        assert!((moved.up() - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_orbit_without_motion() {
        let mut controller = TrackballController::new(camera_at_distance(5.0));
        let mut input = InputState::new();
        start_drag(&mut controller, &mut input);
        assert!(!controller.update(&input, 0.016));
    }

    #[test]
    fn test_shift_pans() {
        let mut controller = TrackballController::new(camera_at_distance(5.0));
        let mut input = InputState::new();
        input.set_key(Key::LeftShift, true);
        start_drag(&mut controller, &mut input);

        input.set_cursor(Vec2::new(300.0, 200.0));
        assert!(controller.update(&input, 0.016));
        let camera = controller.camera();
        // left is -X when looking down -Z
        assert!((camera.eye() - Vec3::new(-1.0, 0.0, 5.0)).length() < 1e-5);
        assert!((camera.center() - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_ctrl_dolly() {
        let mut controller = TrackballController::new(camera_at_distance(5.0));
        let mut input = InputState::new();
        input.set_key(Key::LeftControl, true);
        start_drag(&mut controller, &mut input);

        input.set_cursor(Vec2::new(300.0, 200.0));
        assert!(controller.update(&input, 0.016));
        assert!((controller.camera().distance() - 4.0).abs() < 1e-5);

        // vertical motion alone does not dolly
        input.set_cursor(Vec2::new(300.0, 260.0));
        assert!(!controller.update(&input, 0.016));
    }

    #[test]
    fn test_dolly_never_crosses_center() {
        let mut controller = TrackballController::new(camera_at_distance(0.5));
        let mut input = InputState::new();
        input.set_key(Key::LeftControl, true);
        start_drag(&mut controller, &mut input);

        input.set_cursor(Vec2::new(1200.0, 200.0));
        assert!(controller.update(&input, 0.016));
        let camera = controller.camera();
        assert!(camera.eye().z > 0.0);
        assert!((camera.distance() - DOLLY_EPSILON).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_dolly() {
        assert_eq!(clamp_dolly(10.0, 3.0), 3.0 - DOLLY_EPSILON);
        assert_eq!(clamp_dolly(1.0, 3.0), 1.0);
        assert_eq!(clamp_dolly(-10.0, 3.0), -10.0);
    }

    #[test]
    fn test_release_stops_tracking() {
        let mut controller = TrackballController::new(camera_at_distance(5.0));
        let mut input = InputState::new();
        start_drag(&mut controller, &mut input);
        input.set_button(MouseButton::Middle, false);
        input.set_cursor(Vec2::new(400.0, 400.0));
        assert!(!controller.update(&input, 0.016));
        assert_eq!(controller.camera(), camera_at_distance(5.0));
    }
}
