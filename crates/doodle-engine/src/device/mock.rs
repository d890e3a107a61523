//! Recording context for exercising wrappers without a GPU.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};

use super::context::{
    ActiveUniform, Attachment, BufferHandle, BufferTarget, BufferUsage, ClearFlags,
    FramebufferHandle, GraphicsContext, PixelFormat, PolygonMode, ProgramHandle,
    RenderbufferHandle, ShaderHandle, TextureFilter, TextureHandle, TextureWrap,
    UniformLocation, UniformValue, VertexArrayHandle, VertexAttribute, FRAMEBUFFER_COMPLETE,
};
use super::error::{GlErrorCode, GraphicsError, GraphicsResult};
use crate::graphics::{GeometryType, ShaderKind};
use crate::paint::Color;

/// Kind of native object tracked by [`MockContext`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ObjectKind {
    Buffer,
    Texture,
    Shader,
    Program,
    Framebuffer,
    Renderbuffer,
    VertexArray,
}

/// A call observed by the mock, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BindBuffer(BufferTarget, Option<u32>),
    BufferData { target: BufferTarget, bytes: Vec<u8> },
    BindVertexArray(Option<u32>),
    VertexAttribute(VertexAttribute),
    BindTexture(Option<u32>),
    TexImage { width: u32, height: u32, format: PixelFormat, uploaded: bool },
    BindFramebuffer(Option<u32>),
    FramebufferTexture(Attachment, Option<u32>),
    FramebufferRenderbuffer(Attachment, Option<u32>),
    RenderbufferStorage { format: PixelFormat, width: u32, height: u32 },
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    UseProgram(Option<u32>),
    SetUniform(UniformLocation, UniformValue),
    DrawArrays { mode: GeometryType, first: i32, count: i32 },
    DrawElements { mode: GeometryType, count: i32 },
    ClearColor(Color),
    Clear(ClearFlags),
    LineWidth(f32),
    PolygonMode(PolygonMode),
    Viewport(i32, i32, i32, i32),
    Blending(bool),
}

#[derive(Debug, Default)]
struct ProgramState {
    attached: BTreeSet<u32>,
    linked: bool,
}

/// In-memory [`GraphicsContext`] that issues sequential names, tracks which
/// objects are alive, and records state-changing calls.
///
/// Compilation and linking succeed unless a failure log is configured with
/// [`fail_compile`](Self::fail_compile) or [`fail_link`](Self::fail_link).
#[derive(Debug, Default)]
pub struct MockContext {
    next_name: Cell<u32>,
    live: RefCell<BTreeSet<(ObjectKind, u32)>>,
    released: RefCell<Vec<(ObjectKind, u32)>>,
    calls: RefCell<Vec<Call>>,

    programs: RefCell<HashMap<u32, ProgramState>>,
    sources: RefCell<HashMap<u32, String>>,
    current_program: Cell<Option<u32>>,
    bound_texture: Cell<Option<u32>>,
    bound_framebuffer: Cell<Option<u32>>,

    compile_failure: RefCell<Option<String>>,
    link_failure: RefCell<Option<String>>,
    info_log: RefCell<String>,
    uniforms: RefCell<Vec<String>>,
    framebuffer_status: Cell<Option<u32>>,
    pending_error: Cell<Option<u32>>,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ── configuration ─────────────────────────────────────────────────────

    /// Makes subsequent compilations fail with `log`.
    pub fn fail_compile(&self, log: impl Into<String>) {
        *self.compile_failure.borrow_mut() = Some(log.into());
    }

    /// Makes subsequent links fail with `log`.
    pub fn fail_link(&self, log: impl Into<String>) {
        *self.link_failure.borrow_mut() = Some(log.into());
    }

    /// Info log returned for successful compiles and links.
    pub fn set_info_log(&self, log: impl Into<String>) {
        *self.info_log.borrow_mut() = log.into();
    }

    /// Uniform names reported as active by linked programs, in location order.
    pub fn set_active_uniforms<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.uniforms.borrow_mut() = names.into_iter().map(Into::into).collect();
    }

    pub fn set_framebuffer_status(&self, status: u32) {
        self.framebuffer_status.set(Some(status));
    }

    /// Queues an error code to be returned by the next [`GraphicsContext::error`].
    pub fn inject_error(&self, code: GlErrorCode) {
        self.pending_error.set(Some(code.0));
    }

    /// Destroys a program behind the wrapper's back.
    pub fn lose_program(&self, program: ProgramHandle) {
        self.release(ObjectKind::Program, program.raw());
        self.programs.borrow_mut().remove(&program.raw());
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn live(&self, kind: ObjectKind) -> Vec<u32> {
        self.live
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn is_live(&self, kind: ObjectKind, name: u32) -> bool {
        self.live.borrow().contains(&(kind, name))
    }

    /// Objects released so far, in release order.
    pub fn released(&self) -> Vec<(ObjectKind, u32)> {
        self.released.borrow().clone()
    }

    pub fn attached_shaders(&self, program: ProgramHandle) -> Vec<u32> {
        self.programs
            .borrow()
            .get(&program.raw())
            .map(|p| p.attached.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn shader_source_of(&self, shader: ShaderHandle) -> Option<String> {
        self.sources.borrow().get(&shader.raw()).cloned()
    }

    /// Every `DrawArrays` / `DrawElements` call recorded so far.
    pub fn draws(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::DrawArrays { .. } | Call::DrawElements { .. }))
            .cloned()
            .collect()
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn issue(&self, kind: ObjectKind) -> u32 {
        let name = self.next_name.get() + 1;
        self.next_name.set(name);
        self.live.borrow_mut().insert((kind, name));
        name
    }

    fn release(&self, kind: ObjectKind, name: u32) {
        if self.live.borrow_mut().remove(&(kind, name)) {
            self.released.borrow_mut().push((kind, name));
        } else {
            self.pending_error.set(Some(GlErrorCode::INVALID_VALUE.0));
        }
    }
}

fn named<T>(raw: u32, make: impl FnOnce(u32) -> Option<T>, what: &str) -> GraphicsResult<T> {
    make(raw).ok_or_else(|| GraphicsError::ResourceCreation(what.to_string()))
}

impl GraphicsContext for MockContext {
    fn error(&self) -> Option<GlErrorCode> {
        self.pending_error.take().map(GlErrorCode)
    }

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> GraphicsResult<BufferHandle> {
        named(self.issue(ObjectKind::Buffer), BufferHandle::from_raw, "buffer")
    }

    fn delete_buffer(&self, h: BufferHandle) {
        self.release(ObjectKind::Buffer, h.raw());
    }

    fn bind_buffer(&self, target: BufferTarget, h: Option<BufferHandle>) {
        self.record(Call::BindBuffer(target, h.map(BufferHandle::raw)));
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        self.record(Call::BufferData { target, bytes: data.to_vec() });
    }

    fn create_vertex_array(&self) -> GraphicsResult<VertexArrayHandle> {
        named(self.issue(ObjectKind::VertexArray), VertexArrayHandle::from_raw, "vertex array")
    }

    fn delete_vertex_array(&self, h: VertexArrayHandle) {
        self.release(ObjectKind::VertexArray, h.raw());
    }

    fn bind_vertex_array(&self, h: Option<VertexArrayHandle>) {
        self.record(Call::BindVertexArray(h.map(VertexArrayHandle::raw)));
    }

    fn vertex_attribute(&self, attribute: VertexAttribute, _stride: i32) {
        self.record(Call::VertexAttribute(attribute));
    }

    fn disable_vertex_attribute(&self, _location: u32) {}

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> GraphicsResult<TextureHandle> {
        named(self.issue(ObjectKind::Texture), TextureHandle::from_raw, "texture")
    }

    fn delete_texture(&self, h: TextureHandle) {
        self.release(ObjectKind::Texture, h.raw());
        if self.bound_texture.get() == Some(h.raw()) {
            self.bound_texture.set(None);
        }
    }

    fn bind_texture(&self, h: Option<TextureHandle>) {
        self.bound_texture.set(h.map(TextureHandle::raw));
        self.record(Call::BindTexture(h.map(TextureHandle::raw)));
    }

    fn bound_texture(&self) -> Option<TextureHandle> {
        self.bound_texture.get().and_then(TextureHandle::from_raw)
    }

    fn active_texture_unit(&self, _unit: u32) {}

    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: Option<&[u8]>) {
        self.record(Call::TexImage { width, height, format, uploaded: pixels.is_some() });
    }

    fn tex_sampling(&self, _filter: TextureFilter, _wrap: TextureWrap) {}

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&self) -> GraphicsResult<FramebufferHandle> {
        named(self.issue(ObjectKind::Framebuffer), FramebufferHandle::from_raw, "framebuffer")
    }

    fn delete_framebuffer(&self, h: FramebufferHandle) {
        self.release(ObjectKind::Framebuffer, h.raw());
        if self.bound_framebuffer.get() == Some(h.raw()) {
            self.bound_framebuffer.set(None);
        }
    }

    fn bind_framebuffer(&self, h: Option<FramebufferHandle>) {
        self.bound_framebuffer.set(h.map(FramebufferHandle::raw));
        self.record(Call::BindFramebuffer(h.map(FramebufferHandle::raw)));
    }

    fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.bound_framebuffer.get().and_then(FramebufferHandle::from_raw)
    }

    fn framebuffer_texture(&self, attachment: Attachment, h: Option<TextureHandle>) {
        self.record(Call::FramebufferTexture(attachment, h.map(TextureHandle::raw)));
    }

    fn framebuffer_renderbuffer(&self, attachment: Attachment, h: Option<RenderbufferHandle>) {
        self.record(Call::FramebufferRenderbuffer(attachment, h.map(RenderbufferHandle::raw)));
    }

    fn framebuffer_status(&self) -> u32 {
        self.framebuffer_status.get().unwrap_or(FRAMEBUFFER_COMPLETE)
    }

    fn create_renderbuffer(&self) -> GraphicsResult<RenderbufferHandle> {
        named(self.issue(ObjectKind::Renderbuffer), RenderbufferHandle::from_raw, "renderbuffer")
    }

    fn delete_renderbuffer(&self, h: RenderbufferHandle) {
        self.release(ObjectKind::Renderbuffer, h.raw());
    }

    fn bind_renderbuffer(&self, _h: Option<RenderbufferHandle>) {}

    fn renderbuffer_storage(&self, format: PixelFormat, width: u32, height: u32) {
        self.record(Call::RenderbufferStorage { format, width, height });
    }

    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&self, _kind: ShaderKind) -> GraphicsResult<ShaderHandle> {
        named(self.issue(ObjectKind::Shader), ShaderHandle::from_raw, "shader")
    }

    fn delete_shader(&self, h: ShaderHandle) {
        self.release(ObjectKind::Shader, h.raw());
        self.sources.borrow_mut().remove(&h.raw());
    }

    fn shader_source(&self, h: ShaderHandle, source: &str) {
        self.sources.borrow_mut().insert(h.raw(), source.to_string());
    }

    fn compile_shader(&self, _h: ShaderHandle) {}

    fn shader_compile_status(&self, _h: ShaderHandle) -> bool {
        self.compile_failure.borrow().is_none()
    }

    fn shader_info_log(&self, _h: ShaderHandle) -> String {
        match &*self.compile_failure.borrow() {
            Some(log) => log.clone(),
            None => self.info_log.borrow().clone(),
        }
    }

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> GraphicsResult<ProgramHandle> {
        let name = self.issue(ObjectKind::Program);
        self.programs.borrow_mut().insert(name, ProgramState::default());
        named(name, ProgramHandle::from_raw, "program")
    }

    fn delete_program(&self, h: ProgramHandle) {
        self.release(ObjectKind::Program, h.raw());
        self.programs.borrow_mut().remove(&h.raw());
        if self.current_program.get() == Some(h.raw()) {
            self.current_program.set(None);
        }
    }

    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(p) = self.programs.borrow_mut().get_mut(&program.raw()) {
            p.attached.insert(shader.raw());
        }
        self.record(Call::AttachShader { program: program.raw(), shader: shader.raw() });
    }

    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(p) = self.programs.borrow_mut().get_mut(&program.raw()) {
            p.attached.remove(&shader.raw());
        }
        self.record(Call::DetachShader { program: program.raw(), shader: shader.raw() });
    }

    fn link_program(&self, h: ProgramHandle) {
        let ok = self.link_failure.borrow().is_none();
        if let Some(p) = self.programs.borrow_mut().get_mut(&h.raw()) {
            p.linked = ok;
        }
        self.record(Call::LinkProgram(h.raw()));
    }

    fn program_link_status(&self, h: ProgramHandle) -> bool {
        self.programs.borrow().get(&h.raw()).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, _h: ProgramHandle) -> String {
        match &*self.link_failure.borrow() {
            Some(log) => log.clone(),
            None => self.info_log.borrow().clone(),
        }
    }

    fn is_program(&self, h: ProgramHandle) -> bool {
        self.is_live(ObjectKind::Program, h.raw())
    }

    fn use_program(&self, h: Option<ProgramHandle>) {
        self.current_program.set(h.map(ProgramHandle::raw));
        self.record(Call::UseProgram(h.map(ProgramHandle::raw)));
    }

    fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program.get().and_then(ProgramHandle::from_raw)
    }

    fn active_uniforms(&self, h: ProgramHandle) -> Vec<ActiveUniform> {
        if !self.program_link_status(h) {
            return Vec::new();
        }
        self.uniforms
            .borrow()
            .iter()
            .map(|name| ActiveUniform { name: name.clone(), size: 1, utype: 0 })
            .collect()
    }

    fn uniform_location(&self, h: ProgramHandle, name: &str) -> Option<UniformLocation> {
        if !self.program_link_status(h) {
            return None;
        }
        self.uniforms
            .borrow()
            .iter()
            .position(|n| n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        self.record(Call::SetUniform(location, value));
    }

    // ── drawing ───────────────────────────────────────────────────────────

    fn draw_arrays(&self, mode: GeometryType, first: i32, count: i32) {
        self.record(Call::DrawArrays { mode, first, count });
    }

    fn draw_elements_u16(&self, mode: GeometryType, count: i32, _offset: i32) {
        self.record(Call::DrawElements { mode, count });
    }

    // ── state ─────────────────────────────────────────────────────────────

    fn clear_color(&self, color: Color) {
        self.record(Call::ClearColor(color));
    }

    fn clear_depth(&self, _depth: f32) {}

    fn clear_stencil(&self, _stencil: i32) {}

    fn clear(&self, flags: ClearFlags) {
        self.record(Call::Clear(flags));
    }

    fn line_width(&self, width: f32) {
        self.record(Call::LineWidth(width));
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        self.record(Call::PolygonMode(mode));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }

    fn set_blending(&self, enabled: bool) {
        self.record(Call::Blending(enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sequential_and_tracked() {
        let gl = MockContext::new();
        let a = gl.create_buffer().unwrap();
        let b = gl.create_texture().unwrap();
        assert_eq!((a.raw(), b.raw()), (1, 2));
        assert_eq!(gl.live(ObjectKind::Buffer), vec![1]);

        gl.delete_buffer(a);
        assert!(gl.live(ObjectKind::Buffer).is_empty());
        assert_eq!(gl.released(), vec![(ObjectKind::Buffer, 1)]);
    }

    #[test]
    fn double_release_raises_invalid_value() {
        let gl = MockContext::new();
        let s = gl.create_shader(ShaderKind::Vertex).unwrap();
        gl.delete_shader(s);
        assert!(gl.error().is_none());
        gl.delete_shader(s);
        assert_eq!(gl.error(), Some(GlErrorCode::INVALID_VALUE));
        assert_eq!(gl.released().len(), 1);
    }

    #[test]
    fn configured_link_failure_reports_log() {
        let gl = MockContext::new();
        let p = gl.create_program().unwrap();
        gl.fail_link("undefined main");
        gl.link_program(p);
        assert!(!gl.program_link_status(p));
        assert_eq!(gl.program_info_log(p), "undefined main");
    }
}
