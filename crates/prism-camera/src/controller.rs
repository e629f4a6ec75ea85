//! Runtime-swappable camera controller.

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::first_person::FirstPersonController;
use crate::input::InputSource;
use crate::trackball::TrackballController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    FirstPerson,
    #[default]
    Trackball,
}

impl ControllerKind {
    pub fn label(&self) -> &'static str {
        match self {
            ControllerKind::FirstPerson => "First person",
            ControllerKind::Trackball => "Trackball",
        }
    }
}

/// The active controller. Owns the camera.
#[derive(Debug, Clone)]
pub enum CameraController {
    FirstPerson(FirstPersonController),
    Trackball(TrackballController),
}

impl CameraController {
    /// `speed` is used by the first-person variant, now or after a switch.
    pub fn new(kind: ControllerKind, camera: Camera, speed: f32) -> Self {
        match kind {
            ControllerKind::FirstPerson => Self::FirstPerson(FirstPersonController::new(camera, speed)),
            ControllerKind::Trackball => Self::Trackball(TrackballController::new(camera)),
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::FirstPerson(_) => ControllerKind::FirstPerson,
            Self::Trackball(_) => ControllerKind::Trackball,
        }
    }

    pub fn update(&mut self, input: &dyn InputSource, elapsed: f32) -> bool {
        match self {
            Self::FirstPerson(c) => c.update(input, elapsed),
            Self::Trackball(c) => c.update(input, elapsed),
        }
    }

    pub fn camera(&self) -> Camera {
        match self {
            Self::FirstPerson(c) => c.camera(),
            Self::Trackball(c) => c.camera(),
        }
    }

    pub fn set_camera(&mut self, camera: Camera) {
        match self {
            Self::FirstPerson(c) => c.set_camera(camera),
            Self::Trackball(c) => c.set_camera(camera),
        }
    }

    /// Replace the controller, carrying the current camera over.
    pub fn switch_to(&mut self, kind: ControllerKind, speed: f32) {
        if kind == self.kind() {
            return;
        }
        let camera = self.camera();
        *self = Self::new(kind, camera, speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputState, Key};
    use glam::Vec3;

    #[test]
    fn test_switch_preserves_camera() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y).unwrap();
        let mut controller = CameraController::new(ControllerKind::Trackball, camera, 1.0);

        controller.switch_to(ControllerKind::FirstPerson, 1.0);
        assert_eq!(controller.kind(), ControllerKind::FirstPerson);
        assert_eq!(controller.camera(), camera);

        controller.switch_to(ControllerKind::Trackball, 1.0);
        assert_eq!(controller.camera(), camera);
    }

    #[test]
    fn test_dispatch_update() {
        let mut controller = CameraController::new(ControllerKind::FirstPerson, Camera::default(), 1.0);
        let mut input = InputState::new();
        input.set_key(Key::S, true);
        assert!(controller.update(&input, 1.0));
        assert!((controller.camera().eye() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ControllerKind::FirstPerson).unwrap();
        assert_eq!(json, "\"first_person\"");
    }
}
