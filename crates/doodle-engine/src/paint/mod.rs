//! Color types used by the drawing tools.

mod color;

pub use color::Color;
