//! Doodle engine crate.
//!
//! OpenGL resource wrappers, the immediate-mode drawing front-end and the
//! windowed game loop used by the game crate.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod graphics;
pub mod paint;
pub mod text;
