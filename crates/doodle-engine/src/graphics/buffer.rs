use super::vertex::{Vertex, VertexLayout};
use crate::device::{
    BufferHandle, BufferTarget, BufferUsage, GraphicsContext, GraphicsError, GraphicsResult,
};

/// Array buffer holding interleaved vertices.
///
/// The buffer remembers the layout of the last upload and declares it when
/// bound for drawing.
#[derive(Debug)]
pub struct VertexBuffer {
    handle: BufferHandle,
    usage: BufferUsage,
    len: usize,
    layout: Option<VertexLayout>,
}

impl VertexBuffer {
    pub fn new(gl: &dyn GraphicsContext, usage: BufferUsage) -> GraphicsResult<Self> {
        Ok(Self {
            handle: gl.create_buffer()?,
            usage,
            len: 0,
            layout: None,
        })
    }

    /// Uploads `vertices`, replacing the previous contents.
    pub fn set_data<V: Vertex>(&mut self, gl: &dyn GraphicsContext, vertices: &[V]) -> GraphicsResult<()> {
        if vertices.is_empty() {
            return Err(GraphicsError::InvalidArgument(
                "vertex data must not be empty".into(),
            ));
        }
        gl.bind_buffer(BufferTarget::Array, Some(self.handle));
        gl.buffer_data(BufferTarget::Array, bytemuck::cast_slice(vertices), self.usage);
        self.len = vertices.len();
        self.layout = Some(V::LAYOUT);
        Ok(())
    }

    /// Binds the buffer and declares its vertex layout.
    pub fn bind(&self, gl: &dyn GraphicsContext) {
        gl.bind_buffer(BufferTarget::Array, Some(self.handle));
        if let Some(layout) = &self.layout {
            layout.apply(gl);
        }
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Number of vertices uploaded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn layout(&self) -> Option<VertexLayout> {
        self.layout
    }

    pub fn dispose(self, gl: &dyn GraphicsContext) {
        gl.delete_buffer(self.handle);
    }
}

/// Element buffer of `u16` indices.
#[derive(Debug)]
pub struct IndexBuffer {
    handle: BufferHandle,
    usage: BufferUsage,
    len: usize,
}

impl IndexBuffer {
    pub fn new(gl: &dyn GraphicsContext, usage: BufferUsage) -> GraphicsResult<Self> {
        Ok(Self {
            handle: gl.create_buffer()?,
            usage,
            len: 0,
        })
    }

    pub fn set_data(&mut self, gl: &dyn GraphicsContext, indices: &[u16]) -> GraphicsResult<()> {
        if indices.is_empty() {
            return Err(GraphicsError::InvalidArgument(
                "index data must not be empty".into(),
            ));
        }
        gl.bind_buffer(BufferTarget::ElementArray, Some(self.handle));
        gl.buffer_data(BufferTarget::ElementArray, bytemuck::cast_slice(indices), self.usage);
        self.len = indices.len();
        Ok(())
    }

    pub fn bind(&self, gl: &dyn GraphicsContext) {
        gl.bind_buffer(BufferTarget::ElementArray, Some(self.handle));
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dispose(self, gl: &dyn GraphicsContext) {
        gl.delete_buffer(self.handle);
    }
}
