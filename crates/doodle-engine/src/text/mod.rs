//! Text rasterization with `fontdue`.

mod font_system;
mod text_renderer;

pub use font_system::{FontId, FontSystem, GlyphBitmap};
pub use text_renderer::{compose, TextRenderer};
