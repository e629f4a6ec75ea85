//! Input abstraction for camera controllers.

use std::collections::HashSet;

use glam::Vec2;

/// Keys the controllers respond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    LeftShift,
    LeftControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Polled keyboard and mouse state.
pub trait InputSource {
    fn is_key_down(&self, key: Key) -> bool;

    fn is_button_down(&self, button: MouseButton) -> bool;

    /// Cursor position in window pixels, y down.
    fn cursor_position(&self) -> Vec2;
}

/// Input state fed by window events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: HashSet<Key>,
    buttons: HashSet<MouseButton>,
    cursor: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: Key, down: bool) {
        if down {
            self.keys.insert(key);
        } else {
            self.keys.remove(&key);
        }
    }

    pub fn set_button(&mut self, button: MouseButton, down: bool) {
        if down {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn set_cursor(&mut self, position: Vec2) {
        self.cursor = position;
    }

    /// Forget held keys and buttons, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }
}

impl InputSource for InputState {
    fn is_key_down(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn cursor_position(&self) -> Vec2 {
        self.cursor
    }
}

/// Tracks cursor motion while a button is held.
#[derive(Debug, Clone)]
pub(crate) struct DragTracker {
    button: MouseButton,
    pressed: bool,
    last: Vec2,
}

impl DragTracker {
    pub(crate) fn new(button: MouseButton) -> Self {
        Self {
            button,
            pressed: false,
            last: Vec2::ZERO,
        }
    }

    pub(crate) fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Cursor motion since the last poll; zero on the press itself.
    pub(crate) fn poll(&mut self, input: &dyn InputSource) -> Vec2 {
        if !input.is_button_down(self.button) {
            self.pressed = false;
            return Vec2::ZERO;
        }
        let position = input.cursor_position();
        if !self.pressed {
            self.pressed = true;
            self.last = position;
            return Vec2::ZERO;
        }
        let delta = position - self.last;
        self.last = position;
        delta
    }
}
