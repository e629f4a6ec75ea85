//! Translation of winit events into controller input.

use glam::Vec2;
use prism_camera::{InputState, Key, MouseButton};
use winit::event::{ElementState, MouseButton as WinitButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::ControlLeft => Key::LeftControl,
        _ => return None,
    })
}

pub fn map_button(button: WinitButton) -> Option<MouseButton> {
    match button {
        WinitButton::Left => Some(MouseButton::Left),
        WinitButton::Middle => Some(MouseButton::Middle),
        WinitButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}

/// Fold a window event into `input`. Returns true when the event was input.
pub fn apply_event(input: &mut InputState, event: &WindowEvent) -> bool {
    match event {
        WindowEvent::KeyboardInput { event, .. } => {
            let PhysicalKey::Code(code) = event.physical_key else {
                return false;
            };
            let Some(key) = map_key(code) else {
                return false;
            };
            input.set_key(key, event.state == ElementState::Pressed);
            true
        }
        WindowEvent::MouseInput { state, button, .. } => {
            let Some(button) = map_button(*button) else {
                return false;
            };
            input.set_button(button, *state == ElementState::Pressed);
            true
        }
        WindowEvent::CursorMoved { position, .. } => {
            input.set_cursor(Vec2::new(position.x as f32, position.y as f32));
            true
        }
        WindowEvent::Focused(false) => {
            input.release_all();
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::ShiftLeft), Some(Key::LeftShift));
        assert_eq!(map_key(KeyCode::ShiftRight), None);
        assert_eq!(map_key(KeyCode::Escape), None);
    }

    #[test]
    fn test_button_mapping() {
        assert_eq!(map_button(WinitButton::Middle), Some(MouseButton::Middle));
        assert_eq!(map_button(WinitButton::Back), None);
    }
}
