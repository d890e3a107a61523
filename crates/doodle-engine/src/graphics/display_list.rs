use glam::Mat4;

use super::geometry::GeometryType;
use super::vertex::BatchVertex;
use crate::device::TextureHandle;

/// One recorded draw together with the device state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Batch {
    pub mode: GeometryType,
    pub vertices: Vec<BatchVertex>,
    pub transform: Mat4,
    pub line_width: f32,
    pub point_size: f32,
    pub texture: Option<TextureHandle>,
}

/// Draws captured between `start_display_list` and `stop_display_list` on a
/// [`GraphicsDevice`](super::GraphicsDevice).
///
/// A list holds no GPU objects; replaying it streams the recorded vertices
/// again. Textures referenced by a list must outlive it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    batches: Vec<Batch>,
}

impl DisplayList {
    pub(crate) fn push(&mut self, batch: Batch) {
        self.batches.push(batch);
    }

    pub(crate) fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Number of recorded draws.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.batches.iter().map(|b| b.vertices.len()).sum()
    }
}
