//! Keyboard polling for scenes.

use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::PhysicalKey;

pub use winit::keyboard::KeyCode;

/// Set of currently held physical keys, fed by the runtime from window
/// events and polled by scenes.
#[derive(Debug, Default)]
pub struct InputState {
    pressed: HashSet<KeyCode>,
}

impl InputState {
    pub fn pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub(crate) fn apply_key(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match event.state {
            ElementState::Pressed => self.press(code),
            ElementState::Released => self.release(code),
        }
    }

    pub(crate) fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub(crate) fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    /// Dropped on focus loss so keys do not stick across focus changes.
    pub(crate) fn clear(&mut self) {
        self.pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_release_roundtrip() {
        let mut input = InputState::default();
        assert!(!input.pressed(KeyCode::Escape));

        input.press(KeyCode::Escape);
        assert!(input.pressed(KeyCode::Escape));

        // Key repeat re-inserts; still a single held key.
        input.press(KeyCode::Escape);
        input.release(KeyCode::Escape);
        assert!(!input.pressed(KeyCode::Escape));
    }

    #[test]
    fn clear_drops_all_held_keys() {
        let mut input = InputState::default();
        input.press(KeyCode::KeyW);
        input.press(KeyCode::Space);
        input.clear();
        assert!(!input.pressed(KeyCode::KeyW));
        assert!(!input.pressed(KeyCode::Space));
    }
}
