//! Keyboard state tracking.

use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::PhysicalKey;

pub use winit::keyboard::KeyCode;

/// Tracks which keys are held, plus the presses of the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently pressed keys
    pressed_keys: HashSet<KeyCode>,
    /// Keys that went down since the last `begin_frame`
    just_pressed_keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-frame state. Call once per frame before handling events.
    pub fn begin_frame(&mut self) {
        self.just_pressed_keys.clear();
    }

    /// Feeds a winit keyboard event. Keys without a physical key code are
    /// ignored.
    pub fn on_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(key) = event.physical_key else {
            return;
        };
        match event.state {
            ElementState::Pressed => self.on_key_pressed(key),
            ElementState::Released => self.on_key_released(key),
        }
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed_keys.insert(key);
        }
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    /// Check if a key is currently held.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Check if a key went down this frame.
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_pressed(KeyCode::KeyW));

        input.on_key_released(KeyCode::KeyW);
        assert!(!input.is_key_pressed(KeyCode::KeyW));
    }

    #[test]
    fn test_just_pressed_lasts_one_frame() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::Space);
        input.begin_frame();
        assert!(input.is_key_pressed(KeyCode::Space));
        assert!(!input.is_key_just_pressed(KeyCode::Space));

        // Key repeat does not count as a new press.
        input.on_key_pressed(KeyCode::Space);
        assert!(!input.is_key_just_pressed(KeyCode::Space));
    }
}
