use std::path::Path;

use anyhow::{anyhow, Context, Result};
use doodle_engine::coords::Rectangle;
use doodle_engine::core::{Game, GameCtx};
use doodle_engine::device::{ClearFlags, GraphicsContext};
use doodle_engine::graphics::{
    DisplayList, GeometryType, GraphicsDevice, IndexBuffer, RenderTarget, RenderTargetFlags,
    ShaderProgram, VertexBuffer, VertexColor,
};
use doodle_engine::input::{Key, KeyEvent, KeyState, TextEvent};
use doodle_engine::paint::Color;
use doodle_engine::text::{FontSystem, TextRenderer};
use glam::{Mat4, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::scene::{CurveScene, SceneShader};

const CONTENT_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/content");
const TARGET_SIZE: u32 = 200;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// GPU resources created in `load_content`.
struct Content {
    target: RenderTarget,
    quad: VertexBuffer,
    quad_indices: IndexBuffer,
    basic: ShaderProgram,
    sample: ShaderProgram,
    textured: ShaderProgram,
    fonts: FontSystem,
    label: Option<TextRenderer>,
}

impl Content {
    /// Loads every resource, releasing the ones already created when a
    /// later step fails.
    fn load<C: GraphicsContext>(graphics: &GraphicsDevice<C>, samples: usize) -> Result<Self> {
        let gl = graphics.gl();
        let mut staged = Staged::default();
        match staged.fill(graphics, samples).and_then(|()| staged.take()) {
            Ok(content) => Ok(content),
            Err(e) => {
                staged.dispose(gl);
                Err(e)
            }
        }
    }

    fn refresh_label(&mut self, gl: &dyn GraphicsContext, samples: usize) -> Result<()> {
        if let Some(label) = self.label.as_mut() {
            label.set_text(gl, &self.fonts, label_text(samples))?;
        }
        Ok(())
    }

    fn dispose(self, gl: &dyn GraphicsContext) {
        self.target.dispose(gl);
        self.quad.dispose(gl);
        self.quad_indices.dispose(gl);
        self.basic.dispose(gl);
        self.sample.dispose(gl);
        self.textured.dispose(gl);
        if let Some(label) = self.label {
            label.dispose(gl);
        }
    }
}

/// Resources of a [`Content`] under construction.
#[derive(Default)]
struct Staged {
    basic: Option<ShaderProgram>,
    sample: Option<ShaderProgram>,
    textured: Option<ShaderProgram>,
    target: Option<RenderTarget>,
    quad: Option<VertexBuffer>,
    quad_indices: Option<IndexBuffer>,
    fonts: FontSystem,
    label: Option<TextRenderer>,
}

impl Staged {
    fn fill<C: GraphicsContext>(&mut self, graphics: &GraphicsDevice<C>, samples: usize) -> Result<()> {
        let gl = graphics.gl();
        let dir = Path::new(CONTENT_DIR);

        self.basic = Some(graphics.load_program(dir, Some("Basic")).context("loading Basic program")?);
        self.sample = Some(graphics.load_program(dir, Some("Sample")).context("loading Sample program")?);
        self.textured = Some(
            graphics
                .load_program(dir, Some("Textured"))
                .context("loading Textured program")?,
        );

        self.target = Some(RenderTarget::new(gl, TARGET_SIZE, TARGET_SIZE, RenderTargetFlags::COLOR)?);

        let quad = self.quad.insert(graphics.create_vertex_buffer(false)?);
        quad.set_data(
            gl,
            &[
                VertexColor::new(Vec2::new(0.0, 0.0), Color::RED),
                VertexColor::new(Vec2::new(0.0, 0.5), Color::BLUE),
                VertexColor::new(Vec2::new(0.5, 0.0), Color::GREEN),
                VertexColor::new(Vec2::new(0.5, 0.5), Color::WHITE),
            ],
        )?;
        let quad_indices = self.quad_indices.insert(graphics.create_index_buffer(false)?);
        quad_indices.set_data(gl, &[0, 1, 2, 3])?;

        let font = match self.fonts.load_first_available(FONT_CANDIDATES) {
            Ok(font) => font,
            Err(e) => {
                log::warn!("no usable font, text disabled: {e}");
                return Ok(());
            }
        };
        let label = self.label.insert(TextRenderer::new(
            gl,
            &self.fonts,
            label_text(samples),
            font,
            16.0,
            Color::WHITE,
            true,
        )?);
        label.set_background(gl, &self.fonts, Color::rgba(0.0, 0.0, 0.0, 0.4))?;
        Ok(())
    }

    fn take(&mut self) -> Result<Content> {
        let (
            Some(basic),
            Some(sample),
            Some(textured),
            Some(target),
            Some(quad),
            Some(quad_indices),
        ) = (
            self.basic.take(),
            self.sample.take(),
            self.textured.take(),
            self.target.take(),
            self.quad.take(),
            self.quad_indices.take(),
        )
        else {
            return Err(anyhow!("content was taken before it finished loading"));
        };
        Ok(Content {
            target,
            quad,
            quad_indices,
            basic,
            sample,
            textured,
            fonts: std::mem::take(&mut self.fonts),
            label: self.label.take(),
        })
    }

    fn dispose(self, gl: &dyn GraphicsContext) {
        for program in [self.basic, self.sample, self.textured].into_iter().flatten() {
            program.dispose(gl);
        }
        if let Some(target) = self.target {
            target.dispose(gl);
        }
        if let Some(quad) = self.quad {
            quad.dispose(gl);
        }
        if let Some(quad_indices) = self.quad_indices {
            quad_indices.dispose(gl);
        }
        if let Some(label) = self.label {
            label.dispose(gl);
        }
    }
}

fn label_text(samples: usize) -> String {
    format!("Sample text ({samples} samples)")
}

/// Bezier playground: a cubic with movable control points, a random
/// higher-order curve and a filled circle, rendered off-screen and shown
/// as a texture.
pub struct DoodleGame {
    scene: CurveScene,
    rng: StdRng,
    content: Option<Content>,
    /// Filled circle, recorded once per window aspect ratio.
    circle: Option<DisplayList>,
}

impl DoodleGame {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            scene: CurveScene::default(),
            rng,
            content: None,
            circle: None,
        }
    }

    fn draw_scene<C: GraphicsContext>(&mut self, graphics: &mut GraphicsDevice<C>, aspect: f32) -> Result<()> {
        let scene = &self.scene;
        let Some(content) = self.content.as_ref() else {
            return Ok(());
        };

        graphics.set_matrix(Mat4::from_scale(Vec3::new(0.5, 0.5 * aspect, 1.0)));
        graphics.set_line_width(3.0);

        graphics.draw_bezier_curve(
            scene.start,
            scene.end,
            scene.control_a,
            scene.control_b,
            Color::RED,
            scene.samples,
        )?;
        graphics.draw_curve(&scene.curve, Color::BLUE, scene.samples)?;

        let circle = match self.circle.take() {
            Some(list) => list,
            None => {
                graphics.start_display_list()?;
                graphics.draw_circle_filled(Vec2::ZERO, 0.75, Color::WHITE, Color::RED, scene.samples)?;
                graphics.stop_display_list()?
            }
        };
        graphics.call_display_list(&circle)?;
        self.circle = Some(circle);

        graphics.set_point_size(5.0);
        graphics.begin(GeometryType::Point)?;
        graphics.draw_points(&scene.curve, Color::BLUE)?;
        for handle in scene.handles() {
            graphics.draw_point(handle, Color::GREEN)?;
        }
        graphics.end()?;

        graphics.set_line_width(1.0);
        graphics.begin(GeometryType::LineList)?;
        graphics.draw_line(Vec2::new(-1.0, 0.75), Vec2::new(1.0, 0.75), Color::WHITE)?;
        graphics.end()?;

        graphics.draw_indexed_primitives(&content.quad, &content.quad_indices, GeometryType::TriangleStrip)?;
        Ok(())
    }

    /// Draws the scene into the render target, then shows the target and
    /// the label on the back buffer.
    fn render<C: GraphicsContext>(
        &mut self,
        graphics: &mut GraphicsDevice<C>,
        (width, height): (u32, u32),
    ) -> Result<()> {
        let aspect = match (width, height) {
            (w, h) if w > 0 && h > 0 => w as f32 / h as f32,
            _ => 1.0,
        };

        let Some(content) = self.content.as_ref() else {
            return Ok(());
        };
        let program = match self.scene.shader {
            SceneShader::Basic => &content.basic,
            SceneShader::Sample => &content.sample,
        };
        program.apply(graphics.gl())?;

        content.target.bind(graphics.gl());
        graphics.set_viewport(0, 0, TARGET_SIZE, TARGET_SIZE);
        graphics.clear_with(Color::BLACK, ClearFlags::COLOR, 1.0, 0);

        self.draw_scene(graphics, aspect)?;

        RenderTarget::unbind(graphics.gl());
        graphics.set_viewport(0, 0, width, height);
        graphics.clear();

        let Some(content) = self.content.as_ref() else {
            return Ok(());
        };
        content.textured.apply(graphics.gl())?;

        // Pixel space with the origin in the bottom-left corner.
        let (w, h) = (width as f32, height as f32);
        graphics.set_matrix(Mat4::orthographic_rh_gl(0.0, w, 0.0, h, -1.0, 1.0));

        let side = TARGET_SIZE as f32;
        if let Some(texture) = content.target.color() {
            graphics.draw_textured_quad(texture, Rectangle::new(0.0, h - side, side, side))?;
        }
        if let Some(label) = content.label.as_ref() {
            let (lw, lh) = label.size();
            let rect = Rectangle::new(0.0, h - side - lh as f32, lw as f32, lh as f32);
            graphics.draw_textured_quad(label.texture(), rect)?;
        }
        Ok(())
    }
}

impl Default for DoodleGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for DoodleGame {
    fn initialize(&mut self) -> Result<()> {
        self.scene.randomize_curve(&mut self.rng);
        log::info!("initial curve has {} points", self.scene.curve.len());
        Ok(())
    }

    fn load_content(&mut self, graphics: &mut GraphicsDevice) -> Result<()> {
        self.content = Some(Content::load(graphics, self.scene.samples)?);
        Ok(())
    }

    fn unload_content(&mut self, graphics: &mut GraphicsDevice) {
        if let Some(content) = self.content.take() {
            content.dispose(graphics.gl());
        }
        self.circle = None;
    }

    fn update(&mut self, _ctx: &mut GameCtx<'_>) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, ctx: &mut GameCtx<'_>) -> Result<()> {
        let window_size = ctx.window_size;
        self.render(&mut *ctx.graphics, window_size)
    }

    fn on_key(&mut self, ctx: &mut GameCtx<'_>, event: KeyEvent) -> Result<()> {
        if event.state != KeyState::Pressed {
            return Ok(());
        }
        if event.key == Key::Escape {
            ctx.exit();
            return Ok(());
        }

        let samples = self.scene.samples;
        if self.scene.handle_key(event.key) {
            ctx.graphics.set_polygon_mode(self.scene.polygon_mode);
        }
        if self.scene.samples != samples {
            self.circle = None;
            log::debug!("curve samples: {}", self.scene.samples);
            if let Some(content) = self.content.as_mut() {
                content.refresh_label(ctx.graphics.gl(), self.scene.samples)?;
            }
        }
        Ok(())
    }

    fn on_text(&mut self, _ctx: &mut GameCtx<'_>, event: &TextEvent) -> Result<()> {
        if event.text == "r" {
            self.scene.randomize_curve(&mut self.rng);
            log::debug!("new curve with {} points", self.scene.curve.len());
        }
        Ok(())
    }

    fn resized(&mut self, ctx: &mut GameCtx<'_>) -> Result<()> {
        log::debug!("resized to {}x{}", ctx.window_size.0, ctx.window_size.1);
        self.circle = None;
        Ok(())
    }

    fn closing(&mut self) -> bool {
        log::info!("closing");
        true
    }
}
