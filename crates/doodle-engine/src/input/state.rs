use std::collections::HashSet;

use super::types::{InputEvent, Key, KeyEvent, KeyState, Modifiers};

/// Held keys, modifiers, focus and pointer position of the game window.
///
/// Transitions themselves reach the game through the `on_key` and `on_text`
/// hooks; this is the state they leave behind.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,
    pub pointer_pos: Option<(f32, f32)>,
    pub keys_down: HashSet<Key>,
}

impl InputState {
    pub fn apply_event(&mut self, ev: &InputEvent) {
        match ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(focused) => {
                self.focused = *focused;
                // Releases are not delivered to unfocused windows.
                if !focused {
                    self.keys_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => self.pointer_pos = Some((*x, *y)),
            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key(KeyEvent { key, state, modifiers, .. }) => {
                self.modifiers = *modifiers;
                match state {
                    KeyState::Pressed => {
                        self.keys_down.insert(*key);
                    }
                    KeyState::Released => {
                        self.keys_down.remove(key);
                    }
                }
            }

            InputEvent::Text(_) => {}
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}
