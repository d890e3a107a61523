//! GPU resource wrappers and the drawing front-end.
//!
//! - [`ShaderProgram`] / [`ShaderStage`]: program link state machine
//! - [`VertexBuffer`], [`IndexBuffer`], [`Texture2D`], [`RenderTarget`]
//! - [`GraphicsDevice`]: immediate-mode batches, drawing tools, display lists
//! - [`curve`]: Bezier sampling used by the curve tools

mod buffer;
pub mod curve;
mod device;
mod display_list;
mod geometry;
mod program;
mod render_target;
mod shader;
mod texture;
mod vertex;

pub use buffer::{IndexBuffer, VertexBuffer};
pub use device::{uniform, GraphicsDevice};
pub use display_list::DisplayList;
pub use geometry::GeometryType;
pub use program::{ShaderProgram, ShaderResource};
pub use render_target::{RenderTarget, RenderTargetFlags};
pub use shader::{ShaderKind, ShaderStage};
pub use texture::Texture2D;
pub use vertex::{location, BatchVertex, Vertex, VertexColor, VertexLayout};
