use glam::{Mat4, Vec2, Vec3};

use super::buffer::{IndexBuffer, VertexBuffer};
use super::curve;
use super::display_list::{Batch, DisplayList};
use super::geometry::GeometryType;
use super::program::ShaderProgram;
use super::texture::Texture2D;
use super::vertex::BatchVertex;
use crate::coords::Rectangle;
use crate::device::{
    check_error, BufferUsage, ClearFlags, GlContext, GraphicsContext, GraphicsError,
    GraphicsResult, PolygonMode, TextureHandle, UniformValue, VertexArrayHandle,
};
use crate::logging::LogSink;
use crate::paint::Color;

/// Uniforms the device writes before each immediate-mode draw, when the
/// program in use declares them.
pub mod uniform {
    pub const TRANSFORM: &str = "u_transform";
    pub const POINT_SIZE: &str = "u_point_size";
    pub const TEXTURED: &str = "u_textured";
    pub const TEXTURE: &str = "u_texture";
}

const BUILTIN_VERTEX: &str = r#"#version 330 core
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec4 a_color;
layout(location = 2) in vec2 a_tex_coord;

uniform mat4 u_transform;
uniform float u_point_size;

out vec4 v_color;
out vec2 v_tex_coord;

void main() {
    gl_Position = u_transform * vec4(a_position, 1.0);
    gl_PointSize = u_point_size;
    v_color = a_color;
    v_tex_coord = a_tex_coord;
}
"#;

const BUILTIN_FRAGMENT: &str = r#"#version 330 core
in vec4 v_color;
in vec2 v_tex_coord;

uniform sampler2D u_texture;
uniform int u_textured;

out vec4 frag_color;

void main() {
    vec4 color = vec4(v_color.rgb * v_color.a, v_color.a);
    if (u_textured != 0) {
        color *= texture(u_texture, v_tex_coord);
    }
    frag_color = color;
}
"#;

const NESTED_BEGIN: &str = "begin called while a batch is open";
const END_WITHOUT_BEGIN: &str = "end called without begin";
const VERTEX_OUTSIDE_BATCH: &str = "vertices can only be submitted between begin and end";
const TOOL_INSIDE_BATCH: &str = "this drawing tool opens its own batch and cannot run inside begin/end";
const ALREADY_RECORDING: &str = "a display list is already being recorded";
const NOT_RECORDING: &str = "no display list is being recorded";

/// Drawing front-end over a [`GraphicsContext`].
///
/// Besides the buffer-based draw calls, the device offers an immediate-mode
/// API: vertices pushed between [`begin`](Self::begin) and [`end`](Self::end)
/// are streamed to the GPU as one batch and drawn with the program currently
/// in use, or with a built-in color/texture program when none is.
///
/// The device owns its context; [`dispose`](Self::dispose) releases the
/// device's own objects and hands the context back.
pub struct GraphicsDevice<C: GraphicsContext = GlContext> {
    gl: C,
    log: LogSink,
    clear_color: Color,

    stream: VertexBuffer,
    vao: VertexArrayHandle,
    builtin: ShaderProgram,

    transform: Mat4,
    line_width: f32,
    point_size: f32,
    color: Color,
    tex_coord: Vec2,

    batch: Option<(GeometryType, Vec<BatchVertex>)>,
    recording: Option<DisplayList>,
}

impl<C: GraphicsContext> GraphicsDevice<C> {
    pub fn new(gl: C, log: LogSink) -> GraphicsResult<Self> {
        let stream = VertexBuffer::new(&gl, BufferUsage::Stream)?;
        let vao = match gl.create_vertex_array() {
            Ok(vao) => vao,
            Err(e) => {
                stream.dispose(&gl);
                return Err(e);
            }
        };
        let builtin =
            match ShaderProgram::from_sources(&gl, &log, BUILTIN_VERTEX, BUILTIN_FRAGMENT) {
                Ok(program) => program,
                Err(e) => {
                    stream.dispose(&gl);
                    gl.delete_vertex_array(vao);
                    return Err(e);
                }
            };

        gl.clear_color(Color::CORNFLOWER_BLUE);
        log::debug!("graphics device ready (built-in program {})", builtin.handle());

        Ok(Self {
            gl,
            log,
            clear_color: Color::CORNFLOWER_BLUE,
            stream,
            vao,
            builtin,
            transform: Mat4::IDENTITY,
            line_width: 1.0,
            point_size: 1.0,
            color: Color::WHITE,
            tex_coord: Vec2::ZERO,
            batch: None,
            recording: None,
        })
    }

    pub fn gl(&self) -> &C {
        &self.gl
    }

    /// Sink for driver diagnostics, shared with programs created through the device.
    pub fn log(&self) -> &LogSink {
        &self.log
    }

    // ── resources ─────────────────────────────────────────────────────────

    pub fn create_vertex_buffer(&self, dynamic: bool) -> GraphicsResult<VertexBuffer> {
        VertexBuffer::new(&self.gl, usage(dynamic))
    }

    pub fn create_index_buffer(&self, dynamic: bool) -> GraphicsResult<IndexBuffer> {
        IndexBuffer::new(&self.gl, usage(dynamic))
    }

    pub fn create_program(&self) -> GraphicsResult<ShaderProgram> {
        ShaderProgram::new(&self.gl)
    }

    /// Loads `<name>.vert` / `<name>*.frag` from `dir`; see
    /// [`ShaderProgram::load_from_path`].
    pub fn load_program(
        &self,
        dir: impl AsRef<std::path::Path>,
        name: Option<&str>,
    ) -> GraphicsResult<ShaderProgram> {
        ShaderProgram::load_from_path(&self.gl, &self.log, dir, name)
    }

    // ── buffer drawing ────────────────────────────────────────────────────

    /// Draws every vertex in `buffer` with the program currently in use.
    ///
    /// Quad lists cannot be drawn from a buffer because their vertices would
    /// need rewriting; upload triangles instead.
    pub fn draw_primitives(&self, buffer: &VertexBuffer, mode: GeometryType) -> GraphicsResult<()> {
        let mode = buffer_mode(mode)?;
        if buffer.is_empty() {
            return Ok(());
        }
        self.gl.bind_vertex_array(Some(self.vao));
        buffer.bind(&self.gl);
        self.gl.draw_arrays(mode, 0, buffer.len() as i32);
        self.gl.bind_vertex_array(None);
        check_error(&self.gl)
    }

    /// Draws `vertices` in the order given by the `u16` indices of `indices`.
    pub fn draw_indexed_primitives(
        &self,
        vertices: &VertexBuffer,
        indices: &IndexBuffer,
        mode: GeometryType,
    ) -> GraphicsResult<()> {
        let mode = buffer_mode(mode)?;
        if indices.is_empty() {
            return Ok(());
        }
        self.gl.bind_vertex_array(Some(self.vao));
        vertices.bind(&self.gl);
        indices.bind(&self.gl);
        self.gl.draw_elements_u16(mode, indices.len() as i32, 0);
        self.gl.bind_vertex_array(None);
        check_error(&self.gl)
    }

    // ── immediate mode ────────────────────────────────────────────────────

    /// Opens a batch of `mode` primitives.
    pub fn begin(&mut self, mode: GeometryType) -> GraphicsResult<()> {
        if self.batch.is_some() {
            return Err(GraphicsError::InvalidOperation(NESTED_BEGIN));
        }
        self.batch = Some((mode, Vec::new()));
        Ok(())
    }

    /// Closes the open batch and draws it, or appends it to the display list
    /// being recorded.
    pub fn end(&mut self) -> GraphicsResult<()> {
        let (mode, vertices) = self
            .batch
            .take()
            .ok_or(GraphicsError::InvalidOperation(END_WITHOUT_BEGIN))?;
        self.emit(mode, vertices, None)
    }

    pub fn is_batch_open(&self) -> bool {
        self.batch.is_some()
    }

    /// Color given to subsequent vertices.
    pub fn color(&mut self, color: Color) {
        self.color = color;
    }

    /// Texture coordinate given to subsequent vertices.
    pub fn tex_coord(&mut self, uv: Vec2) {
        self.tex_coord = uv;
    }

    pub fn vertex2(&mut self, position: Vec2) -> GraphicsResult<()> {
        self.vertex3(position.extend(0.0))
    }

    pub fn vertex3(&mut self, position: Vec3) -> GraphicsResult<()> {
        let vertex = BatchVertex {
            position: position.to_array(),
            color: self.color.to_array(),
            tex_coord: self.tex_coord.to_array(),
        };
        self.open_batch()?.push(vertex);
        Ok(())
    }

    fn open_batch(&mut self) -> GraphicsResult<&mut Vec<BatchVertex>> {
        self.batch
            .as_mut()
            .map(|(_, vertices)| vertices)
            .ok_or(GraphicsError::InvalidOperation(VERTEX_OUTSIDE_BATCH))
    }

    fn ensure_idle(&self) -> GraphicsResult<()> {
        match self.batch {
            Some(_) => Err(GraphicsError::InvalidOperation(TOOL_INSIDE_BATCH)),
            None => Ok(()),
        }
    }

    fn emit(
        &mut self,
        mode: GeometryType,
        vertices: Vec<BatchVertex>,
        texture: Option<TextureHandle>,
    ) -> GraphicsResult<()> {
        // Nothing is drawn or recorded for a batch without vertices.
        if vertices.is_empty() {
            return Ok(());
        }
        let batch = Batch {
            mode,
            vertices,
            transform: self.transform,
            line_width: self.line_width,
            point_size: self.point_size,
            texture,
        };
        match self.recording.as_mut() {
            Some(list) => {
                list.push(batch);
                Ok(())
            }
            None => self.submit(&batch),
        }
    }

    fn submit(&mut self, batch: &Batch) -> GraphicsResult<()> {
        let (mode, converted) = batch.mode.to_core(&batch.vertices);
        let vertices: &[BatchVertex] = &converted;
        if vertices.is_empty() {
            return Ok(());
        }

        let gl: &dyn GraphicsContext = &self.gl;
        let program = match gl.current_program() {
            Some(program) => program,
            None => {
                self.builtin.apply(gl)?;
                self.builtin.handle()
            }
        };
        let set = |name: &str, value: UniformValue| {
            if let Some(location) = gl.uniform_location(program, name) {
                gl.set_uniform(location, value);
            }
        };
        set(uniform::TRANSFORM, UniformValue::Mat4(batch.transform.to_cols_array()));
        set(uniform::POINT_SIZE, UniformValue::F32(batch.point_size));
        set(uniform::TEXTURED, UniformValue::I32(batch.texture.is_some() as i32));

        if let Some(texture) = batch.texture {
            set(uniform::TEXTURE, UniformValue::I32(0));
            gl.active_texture_unit(0);
            gl.bind_texture(Some(texture));
            gl.set_blending(true);
        }

        gl.bind_vertex_array(Some(self.vao));
        self.stream.set_data(gl, vertices)?;
        self.stream.bind(gl);
        gl.draw_arrays(mode, 0, vertices.len() as i32);
        gl.bind_vertex_array(None);

        if batch.texture.is_some() {
            gl.set_blending(false);
            gl.bind_texture(None);
        }
        check_error(gl)
    }

    // ── state ─────────────────────────────────────────────────────────────

    /// Transform applied to immediate-mode vertices.
    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.transform = matrix;
    }

    pub fn matrix(&self) -> Mat4 {
        self.transform
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
        self.gl.line_width(width);
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.point_size = size;
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
        self.gl.clear_color(color);
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Clears color, depth and stencil with the device clear color.
    pub fn clear(&self) {
        self.gl.clear(ClearFlags::all());
    }

    /// Clears `flags` with explicit values, then restores the device clear color.
    pub fn clear_with(&self, color: Color, flags: ClearFlags, depth: f32, stencil: i32) {
        self.gl.clear_color(color);
        self.gl.clear_depth(depth);
        self.gl.clear_stencil(stencil);
        self.gl.clear(flags);
        self.gl.clear_color(self.clear_color);
    }

    pub fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.gl.viewport(x, y, width as i32, height as i32);
    }

    pub fn set_polygon_mode(&self, mode: PolygonMode) {
        self.gl.polygon_mode(mode);
    }

    // ── batch drawing tools ───────────────────────────────────────────────
    //
    // These push vertices into the open batch.

    pub fn draw_point(&mut self, position: Vec2, color: Color) -> GraphicsResult<()> {
        self.color(color);
        self.vertex2(position)
    }

    pub fn draw_points(&mut self, positions: &[Vec2], color: Color) -> GraphicsResult<()> {
        self.open_batch()?;
        self.color(color);
        for &p in positions {
            self.vertex2(p)?;
        }
        Ok(())
    }

    pub fn draw_line(&mut self, start: Vec2, end: Vec2, color: Color) -> GraphicsResult<()> {
        self.draw_line_gradient(start, end, color, color)
    }

    pub fn draw_line_gradient(
        &mut self,
        start: Vec2,
        end: Vec2,
        start_color: Color,
        end_color: Color,
    ) -> GraphicsResult<()> {
        self.open_batch()?;
        self.draw_point(start, start_color)?;
        self.draw_point(end, end_color)
    }

    // ── self-contained drawing tools ──────────────────────────────────────

    pub fn draw_rectangle(
        &mut self,
        rect: Rectangle,
        color: Color,
        filled: bool,
        line_width: f32,
    ) -> GraphicsResult<()> {
        self.ensure_idle()?;
        if filled {
            self.emit(GeometryType::TriangleStrip, fill_strip(rect, color), None)
        } else {
            self.set_line_width(line_width);
            self.emit(GeometryType::LineLoop, outline_loop(rect, color), None)
        }
    }

    pub fn draw_filled_rectangle(
        &mut self,
        rect: Rectangle,
        fill: Color,
        outline: Color,
        line_width: f32,
    ) -> GraphicsResult<()> {
        self.ensure_idle()?;
        self.emit(GeometryType::TriangleStrip, fill_strip(rect, fill), None)?;
        self.set_line_width(line_width);
        self.emit(GeometryType::LineLoop, outline_loop(rect, outline), None)
    }

    /// Cubic Bezier from `start` to `end` shaped by two control points.
    pub fn draw_bezier_curve(
        &mut self,
        start: Vec2,
        end: Vec2,
        control1: Vec2,
        control2: Vec2,
        color: Color,
        samples: usize,
    ) -> GraphicsResult<()> {
        self.draw_curve(&[start, control1, control2, end], color, samples)
    }

    /// Quadratic Bezier from `start` to `end`.
    pub fn draw_arc(
        &mut self,
        start: Vec2,
        end: Vec2,
        control: Vec2,
        color: Color,
        samples: usize,
    ) -> GraphicsResult<()> {
        self.draw_curve(&[start, control, end], color, samples)
    }

    /// Bezier curve of degree `points.len() - 1`, drawn as a line strip.
    pub fn draw_curve(&mut self, points: &[Vec2], color: Color, samples: usize) -> GraphicsResult<()> {
        self.ensure_idle()?;
        let sampled = curve::sample(points, samples);
        if sampled.is_empty() {
            return Ok(());
        }
        self.emit(GeometryType::LineStrip, colored(sampled, color), None)
    }

    pub fn draw_circle(
        &mut self,
        centre: Vec2,
        radius: f32,
        color: Color,
        samples: usize,
    ) -> GraphicsResult<()> {
        self.ensure_idle()?;
        for half in curve::circle_halves(centre, radius) {
            self.draw_curve(&half, color, samples)?;
        }
        Ok(())
    }

    /// Filled circle: one fan per half anchored at the centre, then an outline.
    pub fn draw_circle_filled(
        &mut self,
        centre: Vec2,
        radius: f32,
        fill: Color,
        outline: Color,
        samples: usize,
    ) -> GraphicsResult<()> {
        self.ensure_idle()?;
        let halves = curve::filled_circle_halves(centre, radius);
        for half in &halves {
            let fan = std::iter::once(centre).chain(curve::sample(half, samples));
            self.emit(GeometryType::TriangleFan, colored(fan, fill), None)?;
        }
        for half in &halves {
            self.draw_curve(half, outline, samples)?;
        }
        Ok(())
    }

    /// Draws `texture` stretched over `rect` with premultiplied-alpha blending.
    pub fn draw_textured_quad(&mut self, texture: &Texture2D, rect: Rectangle) -> GraphicsResult<()> {
        self.ensure_idle()?;
        let corners = [
            (rect.bottom_left(), [0.0, 0.0]),
            (rect.bottom_right(), [1.0, 0.0]),
            (rect.top_right(), [1.0, 1.0]),
            (rect.top_left(), [0.0, 1.0]),
        ];
        let vertices = corners
            .into_iter()
            .map(|(p, uv)| BatchVertex {
                position: p.extend(0.0).to_array(),
                color: Color::WHITE.to_array(),
                tex_coord: uv,
            })
            .collect();
        self.emit(GeometryType::TriangleFan, vertices, Some(texture.handle()))
    }

    // ── display lists ─────────────────────────────────────────────────────

    /// Routes subsequent immediate-mode draws into a new display list.
    pub fn start_display_list(&mut self) -> GraphicsResult<()> {
        if self.recording.is_some() {
            return Err(GraphicsError::InvalidOperation(ALREADY_RECORDING));
        }
        self.recording = Some(DisplayList::default());
        Ok(())
    }

    /// Stops recording and returns the captured draws.
    pub fn stop_display_list(&mut self) -> GraphicsResult<DisplayList> {
        self.ensure_idle()?;
        self.recording
            .take()
            .ok_or(GraphicsError::InvalidOperation(NOT_RECORDING))
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Replays `list` with the transform, line width and point size captured
    /// at record time. While recording, the draws are appended to the current
    /// list instead.
    pub fn call_display_list(&mut self, list: &DisplayList) -> GraphicsResult<()> {
        self.ensure_idle()?;
        if let Some(recording) = self.recording.as_mut() {
            for batch in list.batches() {
                recording.push(batch.clone());
            }
            return Ok(());
        }

        for batch in list.batches() {
            self.gl.line_width(batch.line_width);
            self.submit(batch)?;
        }
        self.gl.line_width(self.line_width);
        Ok(())
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Releases the stream buffer, vertex array and built-in program and
    /// returns the context.
    pub fn dispose(self) -> C {
        let Self { gl, stream, vao, builtin, .. } = self;
        stream.dispose(&gl);
        gl.delete_vertex_array(vao);
        builtin.dispose(&gl);
        gl
    }
}

fn usage(dynamic: bool) -> BufferUsage {
    if dynamic {
        BufferUsage::Dynamic
    } else {
        BufferUsage::Static
    }
}

fn buffer_mode(mode: GeometryType) -> GraphicsResult<GeometryType> {
    match mode {
        GeometryType::QuadList => Err(GraphicsError::InvalidArgument(
            "quad lists cannot be drawn from a buffer".into(),
        )),
        other => Ok(other.core_equivalent()),
    }
}

fn colored(points: impl IntoIterator<Item = Vec2>, color: Color) -> Vec<BatchVertex> {
    let color = color.to_array();
    points
        .into_iter()
        .map(|p| BatchVertex {
            position: p.extend(0.0).to_array(),
            color,
            tex_coord: [0.0, 0.0],
        })
        .collect()
}

fn fill_strip(rect: Rectangle, color: Color) -> Vec<BatchVertex> {
    colored(
        [rect.top_left(), rect.top_right(), rect.bottom_left(), rect.bottom_right()],
        color,
    )
}

fn outline_loop(rect: Rectangle, color: Color) -> Vec<BatchVertex> {
    colored(
        [rect.top_left(), rect.top_right(), rect.bottom_right(), rect.bottom_left()],
        color,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{Call, ObjectKind};
    use crate::device::{BufferTarget, GlErrorCode, MockContext};

    fn device() -> GraphicsDevice<MockContext> {
        let gl = MockContext::new();
        gl.set_active_uniforms([
            uniform::TRANSFORM,
            uniform::POINT_SIZE,
            uniform::TEXTURED,
            uniform::TEXTURE,
        ]);
        let device = GraphicsDevice::new(gl, LogSink::memory()).unwrap();
        device.gl().clear_calls();
        device
    }

    fn draw_counts(gl: &MockContext) -> Vec<(GeometryType, i32)> {
        gl.draws()
            .into_iter()
            .filter_map(|c| match c {
                Call::DrawArrays { mode, count, .. } | Call::DrawElements { mode, count } => {
                    Some((mode, count))
                }
                _ => None,
            })
            .collect()
    }

    fn uploaded(gl: &MockContext) -> Vec<Vec<BatchVertex>> {
        gl.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::BufferData { target: BufferTarget::Array, bytes } => Some(
                    bytes
                        .chunks_exact(std::mem::size_of::<BatchVertex>())
                        .map(bytemuck::pod_read_unaligned)
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn new_sets_cornflower_clear_color() {
        let gl = MockContext::new();
        let device = GraphicsDevice::new(gl, LogSink::memory()).unwrap();
        assert_eq!(device.clear_color(), Color::CORNFLOWER_BLUE);
        assert!(device.gl().calls().contains(&Call::ClearColor(Color::CORNFLOWER_BLUE)));
    }

    #[test]
    fn builtin_compile_failure_is_reported() {
        let gl = MockContext::new();
        gl.fail_compile("bad");
        let log = LogSink::memory();

        let err = GraphicsDevice::new(gl, log.clone()).err().unwrap();
        assert!(matches!(err, GraphicsError::CompileFailed { kind: crate::graphics::ShaderKind::Vertex, .. }));
        assert_eq!(log.messages(), vec!["bad".to_string()]);
    }

    #[test]
    fn dispose_releases_device_objects() {
        let device = device();
        let gl = device.dispose();
        assert!(gl.live(ObjectKind::Buffer).is_empty());
        assert!(gl.live(ObjectKind::VertexArray).is_empty());
        assert!(gl.live(ObjectKind::Program).is_empty());
        assert!(gl.live(ObjectKind::Shader).is_empty());
    }

    // ── immediate mode ────────────────────────────────────────────────────

    #[test]
    fn nested_begin_fails() {
        let mut device = device();
        device.begin(GeometryType::Point).unwrap();
        assert!(matches!(
            device.begin(GeometryType::LineList),
            Err(GraphicsError::InvalidOperation(_))
        ));
    }

    #[test]
    fn end_without_begin_fails() {
        let mut device = device();
        assert!(matches!(device.end(), Err(GraphicsError::InvalidOperation(_))));
    }

    #[test]
    fn vertex_outside_batch_fails() {
        let mut device = device();
        assert!(device.vertex2(Vec2::ZERO).is_err());
        assert!(device.draw_point(Vec2::ZERO, Color::RED).is_err());
        assert!(device.draw_points(&[], Color::RED).is_err());
    }

    #[test]
    fn batch_is_streamed_with_current_color() {
        let mut device = device();
        device.begin(GeometryType::LineList).unwrap();
        device.draw_line_gradient(Vec2::ZERO, Vec2::ONE, Color::RED, Color::BLUE).unwrap();
        device.end().unwrap();

        let gl = device.gl();
        assert_eq!(draw_counts(gl), vec![(GeometryType::LineList, 2)]);
        let batch = &uploaded(gl)[0];
        assert_eq!(batch[0].color, Color::RED.to_array());
        assert_eq!(batch[1].color, Color::BLUE.to_array());
        assert_eq!(batch[1].position, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_batch_draws_nothing() {
        let mut device = device();
        device.begin(GeometryType::TriangleList).unwrap();
        device.end().unwrap();
        assert!(device.gl().draws().is_empty());
    }

    #[test]
    fn quads_are_split_into_triangles() {
        let mut device = device();
        device.begin(GeometryType::QuadList).unwrap();
        device
            .draw_points(&[Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y], Color::WHITE)
            .unwrap();
        device.end().unwrap();
        assert_eq!(draw_counts(device.gl()), vec![(GeometryType::TriangleList, 6)]);
    }

    #[test]
    fn builtin_program_is_used_when_none_is_current() {
        let mut device = device();
        device.begin(GeometryType::Point).unwrap();
        device.vertex2(Vec2::ZERO).unwrap();
        device.end().unwrap();

        let builtin = device.builtin.handle();
        assert_eq!(device.gl().current_program(), Some(builtin));
    }

    #[test]
    fn applied_program_is_kept() {
        let mut device = device();
        let program = ShaderProgram::from_sources(device.gl(), device.log(), "v", "f").unwrap();
        program.apply(device.gl()).unwrap();

        device.begin(GeometryType::Point).unwrap();
        device.vertex2(Vec2::ZERO).unwrap();
        device.end().unwrap();
        assert_eq!(device.gl().current_program(), Some(program.handle()));
    }

    #[test]
    fn transform_and_point_size_are_uploaded() {
        let mut device = device();
        let m = Mat4::from_scale(Vec3::splat(2.0));
        device.set_matrix(m);
        device.set_point_size(5.0);

        device.begin(GeometryType::Point).unwrap();
        device.vertex2(Vec2::ZERO).unwrap();
        device.end().unwrap();

        let calls = device.gl().calls();
        assert!(calls.contains(&Call::SetUniform(
            crate::device::UniformLocation(0),
            UniformValue::Mat4(m.to_cols_array())
        )));
        assert!(calls.contains(&Call::SetUniform(
            crate::device::UniformLocation(1),
            UniformValue::F32(5.0)
        )));
    }

    #[test]
    fn pending_error_fails_the_draw() {
        let mut device = device();
        device.begin(GeometryType::Point).unwrap();
        device.vertex2(Vec2::ZERO).unwrap();
        device.gl().inject_error(GlErrorCode::INVALID_OPERATION);
        assert!(matches!(
            device.end(),
            Err(GraphicsError::Context(GlErrorCode::INVALID_OPERATION))
        ));
    }

    // ── drawing tools ─────────────────────────────────────────────────────

    #[test]
    fn tools_refuse_to_run_inside_a_batch() {
        let mut device = device();
        let rect = Rectangle::new(0.0, 0.0, 1.0, 1.0);
        device.begin(GeometryType::LineList).unwrap();

        assert!(device.draw_rectangle(rect, Color::RED, true, 1.0).is_err());
        assert!(device.draw_circle(Vec2::ZERO, 1.0, Color::RED, 10).is_err());
        assert!(device.draw_curve(&[Vec2::ZERO, Vec2::ONE], Color::RED, 10).is_err());
        assert!(device.gl().draws().is_empty());
    }

    #[test]
    fn filled_rectangle_is_a_strip_plus_outline() {
        let mut device = device();
        let rect = Rectangle::new(-1.0, -1.0, 2.0, 2.0);
        device.draw_filled_rectangle(rect, Color::RED, Color::BLACK, 3.0).unwrap();

        let gl = device.gl();
        assert_eq!(
            draw_counts(gl),
            vec![(GeometryType::TriangleStrip, 4), (GeometryType::LineLoop, 4)]
        );
        assert!(gl.calls().contains(&Call::LineWidth(3.0)));
        assert_eq!(device.line_width(), 3.0);

        let strip = &uploaded(gl)[0];
        assert_eq!(strip[0].position, [-1.0, 1.0, 0.0]);
        assert_eq!(strip[3].position, [1.0, -1.0, 0.0]);
    }

    #[test]
    fn outline_rectangle_sets_line_width() {
        let mut device = device();
        device
            .draw_rectangle(Rectangle::new(0.0, 0.0, 1.0, 1.0), Color::RED, false, 2.0)
            .unwrap();
        assert_eq!(draw_counts(device.gl()), vec![(GeometryType::LineLoop, 4)]);
        assert!(device.gl().calls().contains(&Call::LineWidth(2.0)));
    }

    #[test]
    fn bezier_curve_samples_between_end_points() {
        let mut device = device();
        let (start, end) = (Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        device
            .draw_bezier_curve(start, end, Vec2::new(-0.5, 1.0), Vec2::new(0.5, 1.0), Color::RED, 12)
            .unwrap();

        let gl = device.gl();
        assert_eq!(draw_counts(gl), vec![(GeometryType::LineStrip, 12)]);
        let curve = &uploaded(gl)[0];
        assert_eq!(curve[0].position, [-1.0, 0.0, 0.0]);
        assert_eq!(curve[11].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn sample_count_is_raised_to_minimum() {
        let mut device = device();
        device.draw_arc(Vec2::ZERO, Vec2::X, Vec2::Y, Color::RED, 0).unwrap();
        assert_eq!(draw_counts(device.gl()), vec![(GeometryType::LineStrip, 2)]);
    }

    #[test]
    fn empty_curve_draws_nothing() {
        let mut device = device();
        device.draw_curve(&[], Color::RED, 10).unwrap();
        assert!(device.gl().draws().is_empty());
    }

    #[test]
    fn circle_is_two_strips() {
        let mut device = device();
        device.draw_circle(Vec2::ZERO, 1.0, Color::RED, 20).unwrap();
        assert_eq!(
            draw_counts(device.gl()),
            vec![(GeometryType::LineStrip, 20), (GeometryType::LineStrip, 20)]
        );
    }

    #[test]
    fn filled_circle_fans_from_centre_then_outlines() {
        let mut device = device();
        let centre = Vec2::new(0.5, 0.5);
        device
            .draw_circle_filled(centre, 0.25, Color::RED, Color::BLACK, 8)
            .unwrap();

        let gl = device.gl();
        assert_eq!(
            draw_counts(gl),
            vec![
                (GeometryType::TriangleFan, 9),
                (GeometryType::TriangleFan, 9),
                (GeometryType::LineStrip, 8),
                (GeometryType::LineStrip, 8),
            ]
        );
        let batches = uploaded(gl);
        assert_eq!(batches[0][0].position, [0.5, 0.5, 0.0]);
        assert_eq!(batches[0][1].color, Color::RED.to_array());
        assert_eq!(batches[2][0].color, Color::BLACK.to_array());
    }

    #[test]
    fn textured_quad_binds_texture_and_blends() {
        let mut device = device();
        let texture = Texture2D::from_rgba8(device.gl(), 1, 1, &[255; 4]).unwrap();
        device.gl().clear_calls();

        device
            .draw_textured_quad(&texture, Rectangle::new(0.0, 0.0, 1.0, 1.0))
            .unwrap();

        let calls = device.gl().calls();
        let raw = texture.handle().raw();
        let bind = calls.iter().position(|c| *c == Call::BindTexture(Some(raw))).unwrap();
        let draw = calls.iter().position(|c| matches!(c, Call::DrawArrays { .. })).unwrap();
        let unbind = calls.iter().rposition(|c| *c == Call::BindTexture(None)).unwrap();
        assert!(bind < draw && draw < unbind);
        let blend_on = calls.iter().position(|c| *c == Call::Blending(true)).unwrap();
        let blend_off = calls.iter().position(|c| *c == Call::Blending(false)).unwrap();
        assert!(blend_on < draw && draw < blend_off);
        assert!(calls.contains(&Call::SetUniform(
            crate::device::UniformLocation(2),
            UniformValue::I32(1)
        )));

        let quad = &uploaded(device.gl())[0];
        assert_eq!(quad[0].tex_coord, [0.0, 0.0]);
        assert_eq!(quad[2].tex_coord, [1.0, 1.0]);
    }

    // ── buffers ───────────────────────────────────────────────────────────

    #[test]
    fn draw_primitives_uses_buffer_length() {
        let device = device();
        let mut vb = device.create_vertex_buffer(false).unwrap();
        vb.set_data(device.gl(), &[BatchVertex::default(); 3]).unwrap();

        device.draw_primitives(&vb, GeometryType::TriangleList).unwrap();
        device.draw_primitives(&vb, GeometryType::Polygon).unwrap();
        assert_eq!(
            draw_counts(device.gl()),
            vec![(GeometryType::TriangleList, 3), (GeometryType::TriangleFan, 3)]
        );
        assert!(device.draw_primitives(&vb, GeometryType::QuadList).is_err());
    }

    #[test]
    fn indexed_draw_binds_element_buffer() {
        let device = device();
        let mut vb = device.create_vertex_buffer(true).unwrap();
        let mut ib = device.create_index_buffer(false).unwrap();
        vb.set_data(device.gl(), &[BatchVertex::default(); 4]).unwrap();
        ib.set_data(device.gl(), &[0, 1, 2, 0, 2, 3]).unwrap();
        device.gl().clear_calls();

        device
            .draw_indexed_primitives(&vb, &ib, GeometryType::TriangleList)
            .unwrap();

        let calls = device.gl().calls();
        assert!(calls.contains(&Call::BindBuffer(BufferTarget::ElementArray, Some(ib.handle().raw()))));
        assert_eq!(draw_counts(device.gl()), vec![(GeometryType::TriangleList, 6)]);
    }

    // ── clearing ──────────────────────────────────────────────────────────

    #[test]
    fn clear_with_restores_clear_color() {
        let mut device = device();
        device.set_clear_color(Color::BLACK);
        device.clear_with(Color::RED, ClearFlags::COLOR, 1.0, 0);

        let calls = device.gl().calls();
        assert_eq!(
            calls[calls.len() - 3..],
            [
                Call::ClearColor(Color::RED),
                Call::Clear(ClearFlags::COLOR),
                Call::ClearColor(Color::BLACK),
            ]
        );
    }

    #[test]
    fn clear_clears_every_buffer() {
        let device = device();
        device.clear();
        assert_eq!(device.gl().calls(), vec![Call::Clear(ClearFlags::all())]);
    }

    // ── display lists ─────────────────────────────────────────────────────

    #[test]
    fn recording_defers_draws_until_called() {
        let mut device = device();
        device.start_display_list().unwrap();
        device.set_line_width(4.0);
        device.draw_circle(Vec2::ZERO, 1.0, Color::RED, 10).unwrap();
        device.begin(GeometryType::Point).unwrap();
        device.vertex2(Vec2::ZERO).unwrap();
        device.end().unwrap();
        let list = device.stop_display_list().unwrap();

        assert!(device.gl().draws().is_empty());
        assert_eq!(list.len(), 3);
        assert_eq!(list.vertex_count(), 21);

        device.set_line_width(1.0);
        device.gl().clear_calls();
        device.call_display_list(&list).unwrap();
        device.call_display_list(&list).unwrap();

        let gl = device.gl();
        assert_eq!(gl.draws().len(), 6);
        assert!(gl.calls().contains(&Call::LineWidth(4.0)));
        assert_eq!(gl.calls().last(), Some(&Call::LineWidth(1.0)));
    }

    #[test]
    fn display_list_nesting_rules() {
        let mut device = device();
        assert!(device.stop_display_list().is_err());

        device.start_display_list().unwrap();
        assert!(device.start_display_list().is_err());

        device.begin(GeometryType::Point).unwrap();
        assert!(device.stop_display_list().is_err());
        device.end().unwrap();

        let empty = device.stop_display_list().unwrap();
        assert!(empty.is_empty());
        assert!(!device.is_recording());
    }

    #[test]
    fn empty_batches_are_not_recorded() {
        let mut device = device();
        device.start_display_list().unwrap();
        device.begin(GeometryType::Point).unwrap();
        device.end().unwrap();
        device.draw_curve(&[], Color::RED, 8).unwrap();
        device.begin(GeometryType::LineList).unwrap();
        device.draw_line(Vec2::ZERO, Vec2::X, Color::RED).unwrap();
        device.end().unwrap();

        let list = device.stop_display_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.vertex_count(), 2);
    }

    #[test]
    fn calling_a_list_while_recording_appends_it() {
        let mut device = device();
        device.start_display_list().unwrap();
        device.draw_arc(Vec2::ZERO, Vec2::X, Vec2::Y, Color::RED, 4).unwrap();
        let inner = device.stop_display_list().unwrap();

        device.start_display_list().unwrap();
        device.call_display_list(&inner).unwrap();
        device.call_display_list(&inner).unwrap();
        let outer = device.stop_display_list().unwrap();

        assert_eq!(outer.len(), 2);
        assert!(device.gl().draws().is_empty());
    }
}
