use std::ffi::{c_void, CStr};

use glow::HasContext;

use super::context::{
    ActiveUniform, Attachment, BufferHandle, BufferTarget, BufferUsage, ClearFlags,
    FramebufferHandle, GraphicsContext, PixelFormat, PolygonMode, ProgramHandle,
    RenderbufferHandle, ShaderHandle, TextureFilter, TextureHandle, TextureWrap,
    UniformLocation, UniformValue, VertexArrayHandle, VertexAttribute,
};
use super::error::{GlErrorCode, GraphicsError, GraphicsResult};
use crate::graphics::{GeometryType, ShaderKind};
use crate::paint::Color;

/// OpenGL 3.3 core context backed by `glow`.
///
/// Every call assumes the underlying GL context is current on the calling
/// thread. [`GlContext::from_loader`] is the only place where that is
/// promised, which keeps the rest of the crate free of `unsafe`.
pub struct GlContext {
    gl: glow::Context,
    line_widths: [f32; 2],
}

impl GlContext {
    /// Loads GL entry points through `loader`.
    ///
    /// # Safety
    ///
    /// The GL context the loader belongs to must be current on this thread for
    /// as long as the returned value is used, and must not be used from any
    /// other thread.
    pub unsafe fn from_loader<F>(loader: F) -> Self
    where
        F: FnMut(&CStr) -> *const c_void,
    {
        let gl = unsafe { glow::Context::from_loader_function_cstr(loader) };

        // Point sizes come from `gl_PointSize` in the vertex stage.
        unsafe { gl.enable(glow::PROGRAM_POINT_SIZE) };
        // Client pixel rows are tightly packed, including 3-byte RGB.
        unsafe { gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1) };

        let mut line_widths = [1.0f32; 2];
        unsafe { gl.get_parameter_f32_slice(glow::ALIASED_LINE_WIDTH_RANGE, &mut line_widths) };

        let version = gl.version();
        log::info!(
            "GL context ready: {}.{} {}",
            version.major,
            version.minor,
            version.vendor_info
        );

        Self { gl, line_widths }
    }

    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }
}

// ── conversions ───────────────────────────────────────────────────────────

fn buffer(h: BufferHandle) -> glow::NativeBuffer {
    glow::NativeBuffer(h.non_zero())
}

fn texture(h: TextureHandle) -> glow::NativeTexture {
    glow::NativeTexture(h.non_zero())
}

fn shader(h: ShaderHandle) -> glow::NativeShader {
    glow::NativeShader(h.non_zero())
}

fn program(h: ProgramHandle) -> glow::NativeProgram {
    glow::NativeProgram(h.non_zero())
}

fn framebuffer(h: FramebufferHandle) -> glow::NativeFramebuffer {
    glow::NativeFramebuffer(h.non_zero())
}

fn renderbuffer(h: RenderbufferHandle) -> glow::NativeRenderbuffer {
    glow::NativeRenderbuffer(h.non_zero())
}

fn vertex_array(h: VertexArrayHandle) -> glow::NativeVertexArray {
    glow::NativeVertexArray(h.non_zero())
}

fn buffer_target(t: BufferTarget) -> u32 {
    match t {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn buffer_usage(u: BufferUsage) -> u32 {
    match u {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        BufferUsage::Stream => glow::STREAM_DRAW,
    }
}

fn attachment(a: Attachment) -> u32 {
    match a {
        Attachment::Color0 => glow::COLOR_ATTACHMENT0,
        Attachment::Depth => glow::DEPTH_ATTACHMENT,
        Attachment::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
    }
}

fn shader_type(kind: ShaderKind) -> u32 {
    match kind {
        ShaderKind::Vertex => glow::VERTEX_SHADER,
        ShaderKind::Fragment => glow::FRAGMENT_SHADER,
        ShaderKind::Geometry => glow::GEOMETRY_SHADER,
        ShaderKind::TessControl => glow::TESS_CONTROL_SHADER,
        ShaderKind::TessEvaluation => glow::TESS_EVALUATION_SHADER,
        ShaderKind::Compute => glow::COMPUTE_SHADER,
    }
}

/// `(internal format, format, type)` triple for a pixel format.
fn pixel_format(f: PixelFormat) -> (u32, u32, u32) {
    match f {
        PixelFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        PixelFormat::Rgb8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        PixelFormat::Depth24Stencil8 => (
            glow::DEPTH24_STENCIL8,
            glow::DEPTH_STENCIL,
            glow::UNSIGNED_INT_24_8,
        ),
    }
}

fn created<T>(what: &str, result: Result<T, String>) -> GraphicsResult<T> {
    result.map_err(|e| GraphicsError::ResourceCreation(format!("{what}: {e}")))
}

fn bound_name(raw: i32) -> Option<std::num::NonZeroU32> {
    std::num::NonZeroU32::new(raw as u32)
}

impl GraphicsContext for GlContext {
    fn error(&self) -> Option<GlErrorCode> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => None,
            code => Some(GlErrorCode(code)),
        }
    }

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> GraphicsResult<BufferHandle> {
        let raw = created("buffer", unsafe { self.gl.create_buffer() })?;
        Ok(BufferHandle::from_non_zero(raw.0))
    }

    fn delete_buffer(&self, h: BufferHandle) {
        unsafe { self.gl.delete_buffer(buffer(h)) }
    }

    fn bind_buffer(&self, target: BufferTarget, h: Option<BufferHandle>) {
        unsafe { self.gl.bind_buffer(buffer_target(target), h.map(buffer)) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, buffer_usage(usage))
        }
    }

    fn create_vertex_array(&self) -> GraphicsResult<VertexArrayHandle> {
        let raw = created("vertex array", unsafe { self.gl.create_vertex_array() })?;
        Ok(VertexArrayHandle::from_non_zero(raw.0))
    }

    fn delete_vertex_array(&self, h: VertexArrayHandle) {
        unsafe { self.gl.delete_vertex_array(vertex_array(h)) }
    }

    fn bind_vertex_array(&self, h: Option<VertexArrayHandle>) {
        unsafe { self.gl.bind_vertex_array(h.map(vertex_array)) }
    }

    fn vertex_attribute(&self, attr: VertexAttribute, stride: i32) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                attr.location,
                attr.components,
                glow::FLOAT,
                false,
                stride,
                attr.offset,
            );
            self.gl.enable_vertex_attrib_array(attr.location);
        }
    }

    fn disable_vertex_attribute(&self, location: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(location) }
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> GraphicsResult<TextureHandle> {
        let raw = created("texture", unsafe { self.gl.create_texture() })?;
        Ok(TextureHandle::from_non_zero(raw.0))
    }

    fn delete_texture(&self, h: TextureHandle) {
        unsafe { self.gl.delete_texture(texture(h)) }
    }

    fn bind_texture(&self, h: Option<TextureHandle>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, h.map(texture)) }
    }

    fn bound_texture(&self) -> Option<TextureHandle> {
        let raw = unsafe { self.gl.get_parameter_i32(glow::TEXTURE_BINDING_2D) };
        bound_name(raw).map(TextureHandle::from_non_zero)
    }

    fn active_texture_unit(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: Option<&[u8]>) {
        let (internal, format, ty) = pixel_format(format);
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                width as i32,
                height as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn tex_sampling(&self, filter: TextureFilter, wrap: TextureWrap) {
        let filter = match filter {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
        } as i32;
        let wrap = match wrap {
            TextureWrap::Repeat => glow::REPEAT,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        } as i32;
        unsafe {
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
        }
    }

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&self) -> GraphicsResult<FramebufferHandle> {
        let raw = created("framebuffer", unsafe { self.gl.create_framebuffer() })?;
        Ok(FramebufferHandle::from_non_zero(raw.0))
    }

    fn delete_framebuffer(&self, h: FramebufferHandle) {
        unsafe { self.gl.delete_framebuffer(framebuffer(h)) }
    }

    fn bind_framebuffer(&self, h: Option<FramebufferHandle>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, h.map(framebuffer)) }
    }

    fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        let raw = unsafe { self.gl.get_parameter_i32(glow::FRAMEBUFFER_BINDING) };
        bound_name(raw).map(FramebufferHandle::from_non_zero)
    }

    fn framebuffer_texture(&self, a: Attachment, h: Option<TextureHandle>) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment(a),
                glow::TEXTURE_2D,
                h.map(texture),
                0,
            )
        }
    }

    fn framebuffer_renderbuffer(&self, a: Attachment, h: Option<RenderbufferHandle>) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment(a),
                glow::RENDERBUFFER,
                h.map(renderbuffer),
            )
        }
    }

    fn framebuffer_status(&self) -> u32 {
        unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) }
    }

    fn create_renderbuffer(&self) -> GraphicsResult<RenderbufferHandle> {
        let raw = created("renderbuffer", unsafe { self.gl.create_renderbuffer() })?;
        Ok(RenderbufferHandle::from_non_zero(raw.0))
    }

    fn delete_renderbuffer(&self, h: RenderbufferHandle) {
        unsafe { self.gl.delete_renderbuffer(renderbuffer(h)) }
    }

    fn bind_renderbuffer(&self, h: Option<RenderbufferHandle>) {
        unsafe { self.gl.bind_renderbuffer(glow::RENDERBUFFER, h.map(renderbuffer)) }
    }

    fn renderbuffer_storage(&self, format: PixelFormat, width: u32, height: u32) {
        let (internal, _, _) = pixel_format(format);
        unsafe {
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, internal, width as i32, height as i32)
        }
    }

    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&self, kind: ShaderKind) -> GraphicsResult<ShaderHandle> {
        let raw = created("shader", unsafe { self.gl.create_shader(shader_type(kind)) })?;
        Ok(ShaderHandle::from_non_zero(raw.0))
    }

    fn delete_shader(&self, h: ShaderHandle) {
        unsafe { self.gl.delete_shader(shader(h)) }
    }

    fn shader_source(&self, h: ShaderHandle, source: &str) {
        unsafe { self.gl.shader_source(shader(h), source) }
    }

    fn compile_shader(&self, h: ShaderHandle) {
        unsafe { self.gl.compile_shader(shader(h)) }
    }

    fn shader_compile_status(&self, h: ShaderHandle) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader(h)) }
    }

    fn shader_info_log(&self, h: ShaderHandle) -> String {
        unsafe { self.gl.get_shader_info_log(shader(h)) }
    }

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> GraphicsResult<ProgramHandle> {
        let raw = created("program", unsafe { self.gl.create_program() })?;
        Ok(ProgramHandle::from_non_zero(raw.0))
    }

    fn delete_program(&self, h: ProgramHandle) {
        unsafe { self.gl.delete_program(program(h)) }
    }

    fn attach_shader(&self, p: ProgramHandle, s: ShaderHandle) {
        unsafe { self.gl.attach_shader(program(p), shader(s)) }
    }

    fn detach_shader(&self, p: ProgramHandle, s: ShaderHandle) {
        unsafe { self.gl.detach_shader(program(p), shader(s)) }
    }

    fn link_program(&self, h: ProgramHandle) {
        unsafe { self.gl.link_program(program(h)) }
    }

    fn program_link_status(&self, h: ProgramHandle) -> bool {
        unsafe { self.gl.get_program_link_status(program(h)) }
    }

    fn program_info_log(&self, h: ProgramHandle) -> String {
        unsafe { self.gl.get_program_info_log(program(h)) }
    }

    fn is_program(&self, h: ProgramHandle) -> bool {
        unsafe { self.gl.is_program(program(h)) }
    }

    fn use_program(&self, h: Option<ProgramHandle>) {
        unsafe { self.gl.use_program(h.map(program)) }
    }

    fn current_program(&self) -> Option<ProgramHandle> {
        let raw = unsafe { self.gl.get_parameter_i32(glow::CURRENT_PROGRAM) };
        bound_name(raw).map(ProgramHandle::from_non_zero)
    }

    fn active_uniforms(&self, h: ProgramHandle) -> Vec<ActiveUniform> {
        let p = program(h);
        let count = unsafe { self.gl.get_active_uniforms(p) };
        (0..count)
            .filter_map(|index| unsafe { self.gl.get_active_uniform(p, index) })
            .map(|u| ActiveUniform {
                name: u.name,
                size: u.size,
                utype: u.utype,
            })
            .collect()
    }

    fn uniform_location(&self, h: ProgramHandle, name: &str) -> Option<UniformLocation> {
        unsafe { self.gl.get_uniform_location(program(h), name) }.map(|l| UniformLocation(l.0))
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        let loc = glow::NativeUniformLocation(location.0);
        let loc = Some(&loc);
        unsafe {
            match value {
                UniformValue::I32(v) => self.gl.uniform_1_i32(loc, v),
                UniformValue::F32(v) => self.gl.uniform_1_f32(loc, v),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(loc, x, y),
                UniformValue::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(loc, x, y, z, w),
                UniformValue::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(loc, false, &m),
            }
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────

    fn draw_arrays(&self, mode: GeometryType, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode.native(), first, count) }
    }

    fn draw_elements_u16(&self, mode: GeometryType, count: i32, offset: i32) {
        unsafe {
            self.gl
                .draw_elements(mode.native(), count, glow::UNSIGNED_SHORT, offset)
        }
    }

    // ── state ─────────────────────────────────────────────────────────────

    fn clear_color(&self, c: Color) {
        unsafe { self.gl.clear_color(c.r, c.g, c.b, c.a) }
    }

    fn clear_depth(&self, depth: f32) {
        unsafe { self.gl.clear_depth_f32(depth) }
    }

    fn clear_stencil(&self, stencil: i32) {
        unsafe { self.gl.clear_stencil(stencil) }
    }

    fn clear(&self, flags: ClearFlags) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(mask) }
    }

    fn line_width(&self, width: f32) {
        // Core contexts reject widths outside the supported range.
        let [min, max] = self.line_widths;
        unsafe { self.gl.line_width(width.clamp(min, max.max(min))) }
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        let mode = match mode {
            PolygonMode::Point => glow::POINT,
            PolygonMode::Line => glow::LINE,
            PolygonMode::Fill => glow::FILL,
        };
        unsafe { self.gl.polygon_mode(glow::FRONT_AND_BACK, mode) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn set_blending(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::BLEND);
                self.gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
            } else {
                self.gl.disable(glow::BLEND);
            }
        }
    }
}
