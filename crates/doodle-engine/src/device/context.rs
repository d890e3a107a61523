use std::fmt;
use std::num::NonZeroU32;

use bitflags::bitflags;

use super::error::{GlErrorCode, GraphicsError, GraphicsResult};
use crate::graphics::{GeometryType, ShaderKind};
use crate::paint::Color;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wraps a raw native name. Returns `None` for `0`, which never names an object.
            #[inline]
            pub const fn from_raw(raw: u32) -> Option<Self> {
                match NonZeroU32::new(raw) {
                    Some(v) => Some(Self(v)),
                    None => None,
                }
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0.get()
            }

            #[inline]
            pub(crate) const fn from_non_zero(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            #[inline]
            pub(crate) const fn non_zero(self) -> NonZeroU32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

native_handle!(
    /// Buffer object name.
    BufferHandle
);
native_handle!(
    /// Texture object name.
    TextureHandle
);
native_handle!(
    /// Shader object name.
    ShaderHandle
);
native_handle!(
    /// Program object name.
    ProgramHandle
);
native_handle!(FramebufferHandle);
native_handle!(RenderbufferHandle);
native_handle!(VertexArrayHandle);

/// Location of a uniform inside a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// Expected update frequency of a buffer's contents.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
    Depth24Stencil8,
}

impl PixelFormat {
    /// Size of one tightly packed client-side pixel; `None` for formats that
    /// cannot be uploaded from client memory.
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgba8 => Some(4),
            Self::Rgb8 => Some(3),
            Self::Depth24Stencil8 => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureWrap {
    #[default]
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Attachment {
    Color0,
    Depth,
    DepthStencil,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum PolygonMode {
    Point,
    Line,
    #[default]
    Fill,
}

bitflags! {
    /// Buffers affected by a clear.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// One float vertex attribute inside an interleaved vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    /// Number of `f32` components (1-4).
    pub components: i32,
    /// Byte offset from the start of a vertex.
    pub offset: i32,
}

/// Description of an active uniform as reported after linking.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActiveUniform {
    pub name: String,
    pub size: i32,
    pub utype: u32,
}

/// Values accepted by [`GraphicsContext::set_uniform`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    I32(i32),
    F32(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
}

/// `GL_FRAMEBUFFER_COMPLETE`.
pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;

/// Native graphics calls used by the wrappers.
///
/// A context is owned by one thread and is never shared; methods take `&self`
/// so that wrappers can hold a plain shared borrow while issuing calls.
pub trait GraphicsContext {
    // ── diagnostics ───────────────────────────────────────────────────────

    /// Returns and clears the oldest pending error flag.
    fn error(&self) -> Option<GlErrorCode>;

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> GraphicsResult<BufferHandle>;
    fn delete_buffer(&self, buffer: BufferHandle);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>);
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    fn create_vertex_array(&self) -> GraphicsResult<VertexArrayHandle>;
    fn delete_vertex_array(&self, vao: VertexArrayHandle);
    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>);
    /// Declares a float attribute for the bound array buffer and enables it.
    fn vertex_attribute(&self, attribute: VertexAttribute, stride: i32);
    fn disable_vertex_attribute(&self, location: u32);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> GraphicsResult<TextureHandle>;
    fn delete_texture(&self, texture: TextureHandle);
    fn bind_texture(&self, texture: Option<TextureHandle>);
    fn bound_texture(&self) -> Option<TextureHandle>;
    fn active_texture_unit(&self, unit: u32);
    /// (Re)allocates storage for the bound 2D texture, optionally uploading pixels.
    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: Option<&[u8]>);
    fn tex_sampling(&self, filter: TextureFilter, wrap: TextureWrap);

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&self) -> GraphicsResult<FramebufferHandle>;
    fn delete_framebuffer(&self, framebuffer: FramebufferHandle);
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>);
    fn bound_framebuffer(&self) -> Option<FramebufferHandle>;
    fn framebuffer_texture(&self, attachment: Attachment, texture: Option<TextureHandle>);
    fn framebuffer_renderbuffer(&self, attachment: Attachment, renderbuffer: Option<RenderbufferHandle>);
    fn framebuffer_status(&self) -> u32;

    fn create_renderbuffer(&self) -> GraphicsResult<RenderbufferHandle>;
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle);
    fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>);
    fn renderbuffer_storage(&self, format: PixelFormat, width: u32, height: u32);

    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&self, kind: ShaderKind) -> GraphicsResult<ShaderHandle>;
    fn delete_shader(&self, shader: ShaderHandle);
    fn shader_source(&self, shader: ShaderHandle, source: &str);
    fn compile_shader(&self, shader: ShaderHandle);
    fn shader_compile_status(&self, shader: ShaderHandle) -> bool;
    fn shader_info_log(&self, shader: ShaderHandle) -> String;

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> GraphicsResult<ProgramHandle>;
    fn delete_program(&self, program: ProgramHandle);
    fn attach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    fn detach_shader(&self, program: ProgramHandle, shader: ShaderHandle);
    fn link_program(&self, program: ProgramHandle);
    fn program_link_status(&self, program: ProgramHandle) -> bool;
    fn program_info_log(&self, program: ProgramHandle) -> String;
    fn is_program(&self, program: ProgramHandle) -> bool;
    fn use_program(&self, program: Option<ProgramHandle>);
    fn current_program(&self) -> Option<ProgramHandle>;
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform>;
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    /// Sets a uniform on the program currently in use.
    fn set_uniform(&self, location: UniformLocation, value: UniformValue);

    // ── drawing ───────────────────────────────────────────────────────────

    fn draw_arrays(&self, mode: GeometryType, first: i32, count: i32);
    /// Draws `count` `u16` indices from the bound element buffer.
    fn draw_elements_u16(&self, mode: GeometryType, count: i32, offset: i32);

    // ── state ─────────────────────────────────────────────────────────────

    fn clear_color(&self, color: Color);
    fn clear_depth(&self, depth: f32);
    fn clear_stencil(&self, stencil: i32);
    fn clear(&self, flags: ClearFlags);
    fn line_width(&self, width: f32);
    fn polygon_mode(&self, mode: PolygonMode);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Enables premultiplied-alpha blending (`ONE`, `ONE_MINUS_SRC_ALPHA`).
    fn set_blending(&self, enabled: bool);
}

/// Converts a pending native error into [`GraphicsError::Context`].
pub fn check_error(gl: &dyn GraphicsContext) -> GraphicsResult<()> {
    match gl.error() {
        Some(code) => Err(GraphicsError::Context(code)),
        None => Ok(()),
    }
}
