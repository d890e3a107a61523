use glam::Vec2;

/// Axis-aligned rectangle in world units, Y pointing up.
///
/// `y` is the bottom edge; `top() == y + height`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn from_corners(bottom_left: Vec2, top_right: Vec2) -> Self {
        let size = top_right - bottom_left;
        Self::new(bottom_left.x, bottom_left.y, size.x, size.y)
    }

    // ── edges ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn left(self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.y
    }

    #[inline]
    pub fn top(self) -> f32 {
        self.y + self.height
    }

    /// Moves the right edge, keeping the left edge fixed.
    pub fn set_right(&mut self, right: f32) {
        self.width = right - self.x;
    }

    /// Moves the top edge, keeping the bottom edge fixed.
    pub fn set_top(&mut self, top: f32) {
        self.height = top - self.y;
    }

    // ── corners ───────────────────────────────────────────────────────────

    #[inline]
    pub fn top_left(self) -> Vec2 {
        Vec2::new(self.left(), self.top())
    }

    #[inline]
    pub fn top_right(self) -> Vec2 {
        Vec2::new(self.right(), self.top())
    }

    #[inline]
    pub fn bottom_left(self) -> Vec2 {
        Vec2::new(self.left(), self.bottom())
    }

    #[inline]
    pub fn bottom_right(self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    #[inline]
    pub fn centre(self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Closed-interval overlap test; rectangles sharing an edge intersect.
    pub fn intersects(self, other: Rectangle) -> bool {
        other.left() <= self.right()
            && other.right() >= self.left()
            && other.bottom() <= self.top()
            && other.top() >= self.bottom()
    }

    /// Integer pixel bounds, grown by one pixel so the area is fully covered.
    pub fn to_pixel_bounds(self) -> (i32, i32, u32, u32) {
        (
            self.x as i32,
            self.y as i32,
            (self.width + 1.0).max(0.0) as u32,
            (self.height + 1.0).max(0.0) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rectangle {
        Rectangle::new(x, y, w, h)
    }

    // ── edges ─────────────────────────────────────────────────────────────

    #[test]
    fn top_is_above_bottom() {
        let rect = r(1.0, 2.0, 3.0, 4.0);
        assert_eq!(rect.bottom(), 2.0);
        assert_eq!(rect.top(), 6.0);
        assert_eq!(rect.right(), 4.0);
        assert_eq!(rect.top_left(), Vec2::new(1.0, 6.0));
        assert_eq!(rect.bottom_right(), Vec2::new(4.0, 2.0));
    }

    #[test]
    fn setting_edges_resizes() {
        let mut rect = r(1.0, 1.0, 1.0, 1.0);
        rect.set_right(5.0);
        rect.set_top(3.0);
        assert_eq!(rect, r(1.0, 1.0, 4.0, 2.0));
    }

    #[test]
    fn from_corners_round_trips() {
        let rect = Rectangle::from_corners(Vec2::new(-0.25, -0.25), Vec2::new(0.25, 0.5));
        assert_eq!(rect, r(-0.25, -0.25, 0.5, 0.75));
    }

    // ── intersects ────────────────────────────────────────────────────────

    #[test]
    fn overlapping_rectangles_intersect() {
        assert!(r(0.0, 0.0, 10.0, 10.0).intersects(r(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn shared_edge_counts_as_intersection() {
        assert!(r(0.0, 0.0, 10.0, 10.0).intersects(r(10.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn horizontally_disjoint_rectangles_do_not_intersect() {
        assert!(!r(0.0, 0.0, 5.0, 5.0).intersects(r(20.0, 0.0, 5.0, 5.0)));
        assert!(!r(20.0, 0.0, 5.0, 5.0).intersects(r(0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn vertically_disjoint_rectangles_do_not_intersect() {
        assert!(!r(0.0, 0.0, 5.0, 5.0).intersects(r(0.0, 6.0, 5.0, 5.0)));
    }

    #[test]
    fn pixel_bounds_grow_by_one() {
        assert_eq!(r(2.7, 3.2, 10.0, 4.5).to_pixel_bounds(), (2, 3, 11, 5));
    }
}
