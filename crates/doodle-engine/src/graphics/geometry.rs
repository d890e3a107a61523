use std::borrow::Cow;

/// Primitive topology for draw calls.
///
/// Discriminants are the native primitive enumerants.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum GeometryType {
    Point = 0x0,
    LineList = 0x1,
    LineLoop = 0x2,
    LineStrip = 0x3,
    TriangleList = 0x4,
    TriangleStrip = 0x5,
    TriangleFan = 0x6,
    QuadList = 0x7,
    QuadStrip = 0x8,
    Polygon = 0x9,
    LineListAdjacency = 0xA,
    LineStripAdjacency = 0xB,
    TriangleListAdjacency = 0xC,
    TriangleStripAdjacency = 0xD,
    Patches = 0xE,
}

impl GeometryType {
    #[inline]
    pub const fn native(self) -> u32 {
        self as u32
    }

    /// `false` for the kinds removed from core profiles.
    pub const fn is_core(self) -> bool {
        !matches!(self, Self::QuadList | Self::QuadStrip | Self::Polygon)
    }

    /// Core-profile topology that rasterizes the same area.
    ///
    /// Quad strips share their vertex order with triangle strips and convex
    /// polygons with triangle fans. Quad lists need their vertices rewritten,
    /// see [`to_core`](Self::to_core).
    pub const fn core_equivalent(self) -> Self {
        match self {
            Self::QuadList => Self::TriangleList,
            Self::QuadStrip => Self::TriangleStrip,
            Self::Polygon => Self::TriangleFan,
            other => other,
        }
    }

    /// Rewrites `vertices` for the core-profile equivalent of `self`.
    ///
    /// Each complete quad `a b c d` becomes triangles `a b c` and `a c d`;
    /// trailing vertices that do not form a full quad are dropped.
    pub fn to_core<T: Copy>(self, vertices: &[T]) -> (Self, Cow<'_, [T]>) {
        match self {
            Self::QuadList => {
                let mut out = Vec::with_capacity(vertices.len() / 4 * 6);
                for quad in vertices.chunks_exact(4) {
                    out.extend_from_slice(&[quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
                }
                (Self::TriangleList, Cow::Owned(out))
            }
            other => (other.core_equivalent(), Cow::Borrowed(vertices)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_values_match_enumerants() {
        assert_eq!(GeometryType::Point.native(), 0);
        assert_eq!(GeometryType::TriangleFan.native(), 6);
        assert_eq!(GeometryType::Patches.native(), 0xE);
    }

    #[test]
    fn quads_become_two_triangles_each() {
        let (mode, verts) = GeometryType::QuadList.to_core(&[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(mode, GeometryType::TriangleList);
        assert_eq!(&*verts, &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn strips_and_polygons_keep_their_vertices() {
        let data = [1, 2, 3, 4];
        let (mode, verts) = GeometryType::QuadStrip.to_core(&data);
        assert_eq!(mode, GeometryType::TriangleStrip);
        assert!(matches!(verts, Cow::Borrowed(_)));

        assert_eq!(GeometryType::Polygon.core_equivalent(), GeometryType::TriangleFan);
        assert_eq!(GeometryType::LineLoop.core_equivalent(), GeometryType::LineLoop);
        assert!(!GeometryType::Polygon.is_core());
    }
}
