//! Fly-style controller.

use glam::Vec3;

use crate::camera::{Camera, WORLD_UP};
use crate::input::{DragTracker, InputSource, Key, MouseButton};

/// Radians per pixel of left-button drag.
const MOUSE_SENSITIVITY: f32 = 0.01;
/// Radians of roll per update while Q or E is held.
const ROLL_STEP: f32 = 0.001;

/// WASD translation, arrow-key pedestal, Q/E roll and left-drag mouse look.
#[derive(Debug, Clone)]
pub struct FirstPersonController {
    camera: Camera,
    speed: f32,
    world_up: Vec3,
    drag: DragTracker,
}

impl FirstPersonController {
    /// `speed` is in world units per second.
    pub fn new(camera: Camera, speed: f32) -> Self {
        Self {
            camera,
            speed,
            world_up: WORLD_UP,
            drag: DragTracker::new(MouseButton::Left),
        }
    }

    /// Axis horizontal mouse look turns around. A zero vector leaves it unchanged.
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

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Apply one frame of input. Returns whether the camera moved.
    pub fn update(&mut self, input: &dyn InputSource, elapsed: f32) -> bool {
        let cursor_delta = self.drag.poll(input);
        let step = self.speed * elapsed;

        let axis = |positive: Key, negative: Key| -> f32 {
            let mut value = 0.0;
            if input.is_key_down(positive) {
                value += 1.0;
            }
            if input.is_key_down(negative) {
                value -= 1.0;
            }
            value
        };

        let dolly_in = step * axis(Key::W, Key::S);
        let truck_left = step * axis(Key::A, Key::D);
        let pedestal_up = step * axis(Key::Up, Key::Down);
        let roll_right = ROLL_STEP * axis(Key::E, Key::Q);

        let pan_left = -MOUSE_SENSITIVITY * cursor_delta.x;
        let tilt_down = MOUSE_SENSITIVITY * cursor_delta.y;

        if [dolly_in, truck_left, pedestal_up, roll_right, pan_left, tilt_down]
            .iter()
            .all(|v| *v == 0.0)
        {
            return false;
        }

        self.camera.move_local(truck_left, pedestal_up, dolly_in);
        self.camera.rotate_local(roll_right, tilt_down, 0.0);
        self.camera.rotate_world(pan_left, self.world_up);
        true
    }
}
