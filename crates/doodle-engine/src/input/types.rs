use std::fmt;

/// Keyboard key, identified by physical position.
///
/// Keys without a variant are reported as `Key::Unknown` carrying the
/// platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,

    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Held modifier keys.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// A key transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
    pub modifiers: Modifiers,
    /// True for auto-repeat presses.
    pub repeat: bool,
}

impl KeyEvent {
    /// Initial press, not an auto-repeat.
    pub fn is_press(&self) -> bool {
        self.state == KeyState::Pressed && !self.repeat
    }
}

/// Committed text, one or more characters.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TextEvent {
    pub text: String,
}

/// Platform-agnostic input events produced by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    ModifiersChanged(Modifiers),
    Key(KeyEvent),
    Text(TextEvent),
    /// Pointer position in physical pixels, origin at the top-left.
    PointerMoved { x: f32, y: f32 },
    PointerLeft,
    Focused(bool),
}
