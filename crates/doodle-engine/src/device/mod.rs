//! Native graphics context seam.
//!
//! Wrappers in [`crate::graphics`] talk to the GPU exclusively through the
//! [`GraphicsContext`] trait. [`GlContext`] implements it on top of `glow`;
//! [`MockContext`] records calls for tests.

mod context;
mod error;
mod gl;
pub mod mock;

pub use context::{
    check_error, ActiveUniform, Attachment, BufferHandle, BufferTarget, BufferUsage, ClearFlags,
    FramebufferHandle, GraphicsContext, PixelFormat, PolygonMode, ProgramHandle,
    RenderbufferHandle, ShaderHandle, TextureFilter, TextureHandle, TextureWrap,
    UniformLocation, UniformValue, VertexArrayHandle, VertexAttribute, FRAMEBUFFER_COMPLETE,
};
pub use error::{GlErrorCode, GraphicsError, GraphicsResult};
pub use gl::GlContext;
pub use mock::MockContext;
