//! Input subsystem.
//!
//! The public types do not expose winit. The runtime translates window events
//! with [`platform::translate_window_event`] and feeds them to the game.

pub mod platform;
mod state;
mod types;

pub use state::InputState;
pub use types::{InputEvent, Key, KeyEvent, KeyState, Modifiers, TextEvent};
