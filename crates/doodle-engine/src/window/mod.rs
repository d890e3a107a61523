//! Window runtime (winit + glutin).
//!
//! Owns the event loop, the GL context and the update/draw pacing.

mod runtime;

pub use runtime::{GlInit, Runtime, RuntimeConfig};
