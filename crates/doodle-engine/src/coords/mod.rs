//! Geometry types shared by the drawing tools.
//!
//! World space is Y-up: a [`Rectangle`]'s `top` is `y + height`. Vectors and
//! matrices are `glam` types, re-exported here so callers need a single import.

mod rect;

pub use glam::{Mat4, Vec2, Vec3};
pub use rect::Rectangle;
