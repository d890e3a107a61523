use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

use crate::coords::Vec2;
use crate::device::{GraphicsError, GraphicsResult};

/// Handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// A rasterized glyph coverage mask placed in a top-left-origin image.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
    /// Row-major coverage, `width * height` bytes, top row first.
    pub coverage: Vec<u8>,
}

/// Owns the loaded fonts.
///
/// Fonts are immutable once loaded. The game owns the system and passes it to
/// [`TextRenderer`](super::TextRenderer) whenever text has to be rendered.
#[derive(Default)]
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TrueType or OpenType font.
    pub fn load_font(&mut self, bytes: &[u8]) -> GraphicsResult<FontId> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| GraphicsError::Font(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        Ok(id)
    }

    pub fn load_font_file(&mut self, path: impl AsRef<Path>) -> GraphicsResult<FontId> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GraphicsError::FileNotFound(path.to_path_buf()),
            _ => GraphicsError::Io(e),
        })?;
        let id = self.load_font(&bytes)?;
        log::info!("loaded font {}", path.display());
        Ok(id)
    }

    /// Loads the first font in `candidates` that exists and parses.
    pub fn load_first_available<P: AsRef<Path>>(&mut self, candidates: &[P]) -> GraphicsResult<FontId> {
        for path in candidates {
            match self.load_font_file(path) {
                Ok(id) => return Ok(id),
                Err(GraphicsError::FileNotFound(_)) => {}
                Err(e) => log::warn!("skipping font {}: {e}", path.as_ref().display()),
            }
        }
        Err(GraphicsError::FileNotFound(
            candidates
                .first()
                .map(|p| p.as_ref().to_path_buf())
                .unwrap_or_else(PathBuf::new),
        ))
    }

    fn font(&self, id: FontId) -> GraphicsResult<&fontdue::Font> {
        self.fonts
            .get(id.0)
            .ok_or_else(|| GraphicsError::Font(format!("unknown font id {}", id.0)))
    }

    fn layout(&self, text: &str, font: &fontdue::Font, px: f32) -> Layout<()> {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[font], &TextStyle::new(text, px, 0));
        layout
    }

    /// Size of the laid-out `text` in pixels.
    ///
    /// The width runs to the pen position after the last glyph; the height
    /// covers at least one line.
    pub fn measure_text(&self, text: &str, id: FontId, px: f32) -> GraphicsResult<Vec2> {
        let font = self.font(id)?;
        let layout = self.layout(text, font, px);
        let line = font
            .horizontal_line_metrics(px)
            .map(|m| m.new_line_size)
            .unwrap_or(px * 1.2);

        let width = layout
            .glyphs()
            .iter()
            .map(|g| {
                let m = font.metrics_indexed(g.key.glyph_index, px);
                (g.x - m.xmin as f32 + m.advance_width).max(0.0)
            })
            .fold(0.0f32, f32::max);
        let height = layout
            .glyphs()
            .iter()
            .map(|g| g.y + g.height as f32)
            .fold(line.max(layout.height()), f32::max);
        Ok(Vec2::new(width, height))
    }

    /// Rasterizes every visible glyph of `text`.
    pub fn rasterize(&self, text: &str, id: FontId, px: f32) -> GraphicsResult<Vec<GlyphBitmap>> {
        let font = self.font(id)?;
        let layout = self.layout(text, font, px);
        Ok(layout
            .glyphs()
            .iter()
            .filter(|g| g.width > 0 && g.height > 0)
            .map(|g| {
                let (metrics, coverage) = font.rasterize_indexed(g.key.glyph_index, g.key.px);
                GlyphBitmap {
                    x: g.x.round() as i32,
                    y: g.y.round() as i32,
                    width: metrics.width,
                    height: metrics.height,
                    coverage,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_font_error() {
        let mut fonts = FontSystem::new();
        assert!(matches!(fonts.load_font(b"not a font"), Err(GraphicsError::Font(_))));
    }

    #[test]
    fn unknown_id_is_a_font_error() {
        let fonts = FontSystem::new();
        assert!(matches!(
            fonts.measure_text("x", FontId(3), 12.0),
            Err(GraphicsError::Font(_))
        ));
    }

    #[test]
    fn missing_candidates_are_file_not_found() {
        let mut fonts = FontSystem::new();
        let err = fonts
            .load_first_available(&["/no/such/font.ttf", "/nor/this.otf"])
            .unwrap_err();
        assert!(matches!(err, GraphicsError::FileNotFound(p) if p.ends_with("font.ttf")));
    }
}
