use super::font_system::{FontId, FontSystem, GlyphBitmap};
use crate::device::{GraphicsContext, GraphicsError, GraphicsResult, PixelFormat};
use crate::graphics::Texture2D;
use crate::paint::Color;

/// A string rasterized into a texture.
///
/// Every property change re-renders the texture. With auto-size on, the
/// texture is sized to the measured text; otherwise the size is set
/// explicitly with [`set_width`](Self::set_width) and
/// [`set_height`](Self::set_height).
///
/// The texture holds premultiplied RGBA with its first row at the bottom of
/// the text, matching the texture coordinates used by
/// [`GraphicsDevice::draw_textured_quad`](crate::graphics::GraphicsDevice::draw_textured_quad).
#[derive(Debug)]
pub struct TextRenderer {
    text: String,
    font: FontId,
    px: f32,
    color: Color,
    background: Color,
    auto_size: bool,
    width: u32,
    height: u32,
    texture: Texture2D,
}

impl TextRenderer {
    pub fn new(
        gl: &dyn GraphicsContext,
        fonts: &FontSystem,
        text: impl Into<String>,
        font: FontId,
        px: f32,
        color: Color,
        auto_size: bool,
    ) -> GraphicsResult<Self> {
        let mut renderer = Self {
            text: text.into(),
            font,
            px,
            color,
            background: Color::TRANSPARENT,
            auto_size,
            width: 1,
            height: 1,
            texture: Texture2D::new(gl, 1, 1, PixelFormat::Rgba8)?,
        };
        if let Err(e) = renderer.invalidate(gl, fonts) {
            renderer.dispose(gl);
            return Err(e);
        }
        Ok(renderer)
    }

    fn invalidate(&mut self, gl: &dyn GraphicsContext, fonts: &FontSystem) -> GraphicsResult<()> {
        if self.auto_size {
            let size = fonts.measure_text(&self.text, self.font, self.px)?;
            self.width = (size.x + 1.0) as u32;
            self.height = (size.y + 1.0) as u32;
        }
        let glyphs = fonts.rasterize(&self.text, self.font, self.px)?;
        let pixels = compose(self.width, self.height, self.background, self.color, &glyphs);
        self.texture.replace(gl, self.width, self.height, &pixels)
    }

    // ── properties ────────────────────────────────────────────────────────

    pub fn set_text(
        &mut self,
        gl: &dyn GraphicsContext,
        fonts: &FontSystem,
        text: impl Into<String>,
    ) -> GraphicsResult<()> {
        let text = text.into();
        if text == self.text {
            return Ok(());
        }
        self.text = text;
        self.invalidate(gl, fonts)
    }

    pub fn set_font(&mut self, gl: &dyn GraphicsContext, fonts: &FontSystem, font: FontId, px: f32) -> GraphicsResult<()> {
        if (font, px) == (self.font, self.px) {
            return Ok(());
        }
        self.font = font;
        self.px = px;
        self.invalidate(gl, fonts)
    }

    pub fn set_color(&mut self, gl: &dyn GraphicsContext, fonts: &FontSystem, color: Color) -> GraphicsResult<()> {
        if color == self.color {
            return Ok(());
        }
        self.color = color;
        self.invalidate(gl, fonts)
    }

    pub fn set_background(&mut self, gl: &dyn GraphicsContext, fonts: &FontSystem, color: Color) -> GraphicsResult<()> {
        if color == self.background {
            return Ok(());
        }
        self.background = color;
        self.invalidate(gl, fonts)
    }

    /// Turning auto-size on re-measures immediately.
    pub fn set_auto_size(&mut self, gl: &dyn GraphicsContext, fonts: &FontSystem, auto_size: bool) -> GraphicsResult<()> {
        let turned_on = auto_size && !self.auto_size;
        self.auto_size = auto_size;
        if turned_on {
            self.invalidate(gl, fonts)?;
        }
        Ok(())
    }

    /// Fails with [`GraphicsError::InvalidOperation`] while auto-size is on.
    pub fn set_width(&mut self, gl: &dyn GraphicsContext, fonts: &FontSystem, width: u32) -> GraphicsResult<()> {
        if self.auto_size {
            return Err(GraphicsError::InvalidOperation("cannot set width while auto-size is on"));
        }
        self.width = width.max(1);
        self.invalidate(gl, fonts)
    }

    /// Fails with [`GraphicsError::InvalidOperation`] while auto-size is on.
    pub fn set_height(&mut self, gl: &dyn GraphicsContext, fonts: &FontSystem, height: u32) -> GraphicsResult<()> {
        if self.auto_size {
            return Err(GraphicsError::InvalidOperation("cannot set height while auto-size is on"));
        }
        self.height = height.max(1);
        self.invalidate(gl, fonts)
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn auto_size(&self) -> bool {
        self.auto_size
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn texture(&self) -> &Texture2D {
        &self.texture
    }

    pub fn dispose(self, gl: &dyn GraphicsContext) {
        self.texture.dispose(gl);
    }
}

/// Paints `glyphs` in `color` over `background` into a `width x height`
/// premultiplied RGBA image, bottom row first.
pub fn compose(width: u32, height: u32, background: Color, color: Color, glyphs: &[GlyphBitmap]) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut image = vec![background.premultiplied(); w * h];
    let ink = color.premultiplied();

    for glyph in glyphs {
        for gy in 0..glyph.height {
            let y = glyph.y + gy as i32;
            if y < 0 || y as usize >= h {
                continue;
            }
            for gx in 0..glyph.width {
                let x = glyph.x + gx as i32;
                if x < 0 || x as usize >= w {
                    continue;
                }
                let coverage = glyph.coverage[gy * glyph.width + gx] as f32 / 255.0;
                if coverage <= 0.0 {
                    continue;
                }
                let dst = &mut image[y as usize * w + x as usize];
                let src = ink.map(|c| c * coverage);
                let keep = 1.0 - src[3];
                *dst = std::array::from_fn(|i| src[i] + dst[i] * keep);
            }
        }
    }

    // Top-left origin to bottom-left origin.
    image
        .chunks_exact(w.max(1))
        .rev()
        .flatten()
        .flat_map(|px| px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(image: &[u8], width: u32, x: u32, y_from_bottom: u32) -> [u8; 4] {
        let i = ((y_from_bottom * width + x) * 4) as usize;
        [image[i], image[i + 1], image[i + 2], image[i + 3]]
    }

    #[test]
    fn empty_text_is_background_only() {
        let bg = Color::rgba(0.0, 0.0, 0.0, 0.4);
        let image = compose(3, 2, bg, Color::WHITE, &[]);
        assert_eq!(image.len(), 3 * 2 * 4);
        assert!(image.chunks_exact(4).all(|px| px == [0, 0, 0, 102]));
    }

    #[test]
    fn full_coverage_replaces_background() {
        let glyph = GlyphBitmap { x: 1, y: 0, width: 1, height: 1, coverage: vec![255] };
        let image = compose(2, 2, Color::BLACK, Color::RED, &[glyph]);

        // Glyph sits in the top row, which is uploaded last.
        assert_eq!(pixel(&image, 2, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&image, 2, 1, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn partial_coverage_blends_premultiplied() {
        let glyph = GlyphBitmap { x: 0, y: 0, width: 1, height: 1, coverage: vec![128] };
        let image = compose(1, 1, Color::TRANSPARENT, Color::WHITE, &[glyph]);
        assert_eq!(pixel(&image, 1, 0, 0), [128, 128, 128, 128]);
    }

    #[test]
    fn glyphs_are_clipped_to_the_image() {
        let glyph = GlyphBitmap { x: -1, y: -1, width: 3, height: 3, coverage: vec![255; 9] };
        let image = compose(1, 1, Color::TRANSPARENT, Color::WHITE, &[glyph]);
        assert_eq!(image, vec![255; 4]);
    }
}
