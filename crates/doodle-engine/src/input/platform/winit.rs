use winit::event::{ElementState, Ime, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use crate::input::{InputEvent, Key, KeyEvent, KeyState, Modifiers, TextEvent};

/// Translates a winit `WindowEvent` into an [`InputEvent`].
///
/// `modifiers` is the currently tracked modifier state, attached to key
/// events. Events the input subsystem does not model yield `None`.
pub fn translate_window_event(event: &WindowEvent, modifiers: Modifiers) -> Option<InputEvent> {
    match event {
        WindowEvent::ModifiersChanged(m) => Some(InputEvent::ModifiersChanged(map_modifiers(m.state()))),
        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),
        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::KeyboardInput { event, .. } => {
            let state = match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            };
            let key = match event.physical_key {
                PhysicalKey::Code(code) => map_key(code),
                PhysicalKey::Unidentified(_) => Key::Unknown(0),
            };
            Some(InputEvent::Key(KeyEvent {
                key,
                state,
                modifiers,
                repeat: event.repeat,
            }))
        }
        _ => None,
    }
}

/// Text committed by a key press or an input method, if any.
///
/// Control characters produced by keys such as Backspace are not text.
pub fn committed_text(event: &WindowEvent) -> Option<TextEvent> {
    let text = match event {
        WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
            event.text.as_ref()?.to_string()
        }
        WindowEvent::Ime(Ime::Commit(text)) => text.clone(),
        _ => return None,
    };
    let text: String = text.chars().filter(|c| !c.is_control()).collect();
    (!text.is_empty()).then_some(TextEvent { text })
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

const LETTERS: [(KeyCode, Key); 26] = [
    (KeyCode::KeyA, Key::A), (KeyCode::KeyB, Key::B), (KeyCode::KeyC, Key::C),
    (KeyCode::KeyD, Key::D), (KeyCode::KeyE, Key::E), (KeyCode::KeyF, Key::F),
    (KeyCode::KeyG, Key::G), (KeyCode::KeyH, Key::H), (KeyCode::KeyI, Key::I),
    (KeyCode::KeyJ, Key::J), (KeyCode::KeyK, Key::K), (KeyCode::KeyL, Key::L),
    (KeyCode::KeyM, Key::M), (KeyCode::KeyN, Key::N), (KeyCode::KeyO, Key::O),
    (KeyCode::KeyP, Key::P), (KeyCode::KeyQ, Key::Q), (KeyCode::KeyR, Key::R),
    (KeyCode::KeyS, Key::S), (KeyCode::KeyT, Key::T), (KeyCode::KeyU, Key::U),
    (KeyCode::KeyV, Key::V), (KeyCode::KeyW, Key::W), (KeyCode::KeyX, Key::X),
    (KeyCode::KeyY, Key::Y), (KeyCode::KeyZ, Key::Z),
];

const DIGITS: [(KeyCode, Key); 10] = [
    (KeyCode::Digit0, Key::Digit0), (KeyCode::Digit1, Key::Digit1),
    (KeyCode::Digit2, Key::Digit2), (KeyCode::Digit3, Key::Digit3),
    (KeyCode::Digit4, Key::Digit4), (KeyCode::Digit5, Key::Digit5),
    (KeyCode::Digit6, Key::Digit6), (KeyCode::Digit7, Key::Digit7),
    (KeyCode::Digit8, Key::Digit8), (KeyCode::Digit9, Key::Digit9),
];

const FUNCTION: [(KeyCode, Key); 12] = [
    (KeyCode::F1, Key::F1), (KeyCode::F2, Key::F2), (KeyCode::F3, Key::F3),
    (KeyCode::F4, Key::F4), (KeyCode::F5, Key::F5), (KeyCode::F6, Key::F6),
    (KeyCode::F7, Key::F7), (KeyCode::F8, Key::F8), (KeyCode::F9, Key::F9),
    (KeyCode::F10, Key::F10), (KeyCode::F11, Key::F11), (KeyCode::F12, Key::F12),
];

/// Maps a physical key code; unmapped codes become `Key::Unknown`.
pub fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,

        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,

        KeyCode::ShiftLeft => Key::ShiftLeft,
        KeyCode::ShiftRight => Key::ShiftRight,
        KeyCode::ControlLeft => Key::ControlLeft,
        KeyCode::ControlRight => Key::ControlRight,
        KeyCode::AltLeft => Key::AltLeft,
        KeyCode::AltRight => Key::AltRight,

        other => LETTERS
            .iter()
            .chain(&DIGITS)
            .chain(&FUNCTION)
            .find(|(c, _)| *c == other)
            .map(|(_, k)| *k)
            .unwrap_or(Key::Unknown(other as u32)),
    }
}
