use bytemuck::{Pod, Zeroable};

use crate::device::{GraphicsContext, VertexAttribute};

/// Attribute locations shared by every shader in the crate.
pub mod location {
    pub const POSITION: u32 = 0;
    pub const COLOR: u32 = 1;
    pub const TEX_COORD: u32 = 2;
}

/// Interleaved layout of a vertex type.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub stride: i32,
    pub attributes: &'static [VertexAttribute],
}

impl VertexLayout {
    /// Declares the layout for the currently bound array buffer.
    ///
    /// Shared locations the layout does not use are disabled so that a vertex
    /// array reused across buffers never reads stale attribute pointers.
    pub fn apply(&self, gl: &dyn GraphicsContext) {
        for loc in [location::POSITION, location::COLOR, location::TEX_COORD] {
            if !self.attributes.iter().any(|a| a.location == loc) {
                gl.disable_vertex_attribute(loc);
            }
        }
        for attribute in self.attributes {
            gl.vertex_attribute(*attribute, self.stride);
        }
    }
}

/// A plain-old-data vertex that can be uploaded to a vertex buffer.
pub trait Vertex: Pod {
    const LAYOUT: VertexLayout;
}

/// Position, color and texture coordinate; the format of immediate-mode batches.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl Vertex for BatchVertex {
    const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>() as i32,
        attributes: &[
            VertexAttribute { location: location::POSITION, components: 3, offset: 0 },
            VertexAttribute { location: location::COLOR, components: 4, offset: 12 },
            VertexAttribute { location: location::TEX_COORD, components: 2, offset: 28 },
        ],
    };
}

/// 2D position with a color.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct VertexColor {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl VertexColor {
    pub fn new(position: glam::Vec2, color: crate::paint::Color) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }
}

impl Vertex for VertexColor {
    const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>() as i32,
        attributes: &[
            VertexAttribute { location: location::POSITION, components: 2, offset: 0 },
            VertexAttribute { location: location::COLOR, components: 4, offset: 8 },
        ],
    };
}
