//! Camera model and interactive controllers.
//!
//! This crate provides:
//! - [`Camera`], an eye/center/up triple with local and world motion
//! - The `--lookat` interchange format for camera poses
//! - First-person and trackball controllers driven by an [`InputSource`]

mod camera;
mod controller;
mod errors;
mod first_person;
mod input;
mod lookat;
mod trackball;

pub use camera::{Camera, WORLD_UP};
pub use controller::{CameraController, ControllerKind};
pub use errors::CameraError;
pub use first_person::FirstPersonController;
pub use input::{InputSource, InputState, Key, MouseButton};
pub use lookat::{format_lookat, lookat_argument, parse_lookat};
pub use trackball::{clamp_dolly, TrackballController, DOLLY_EPSILON};
