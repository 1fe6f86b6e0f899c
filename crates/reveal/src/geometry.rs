//! Layout geometry for viewport intersection.

/// An axis-aligned rectangle in layout coordinates.
///
/// Widths and heights may end up negative after a negative root margin is
/// applied; such rectangles intersect nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Rect {
    /// The zero-sized rectangle at the origin.
    pub const ZERO: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    /// Create a new rectangle from origin and size.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the left edge.
    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Get the top edge.
    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Get the right edge.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom edge.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area, or zero for degenerate rectangles.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Move the rectangle by an offset.
    #[inline]
    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow each edge outward by its own amount. Negative amounts shrink.
    pub fn expand(&self, top: f32, right: f32, bottom: f32, left: f32) -> Rect {
        Rect::new(
            self.x - left,
            self.y - top,
            self.width + left + right,
            self.height + top + bottom,
        )
    }

    /// Compute the intersection of two rectangles.
    ///
    /// Unlike a strict overlap test, rectangles that only share an edge
    /// produce a zero-area intersection instead of `None`. A sentinel sitting
    /// exactly on the viewport edge counts as touching it.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if self.width < 0.0 || self.height < 0.0 || other.width < 0.0 || other.height < 0.0 {
            return None;
        }

        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left <= right && top <= bottom {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    /// Fraction of `self` that lies within `root`, or `None` when they do
    /// not touch at all. Zero-area rectangles report `1.0` when touching.
    pub fn visible_fraction(&self, root: &Rect) -> Option<f32> {
        let overlap = self.intersect(root)?;
        let area = self.area();
        if area > 0.0 {
            Some((overlap.area() / area).clamp(0.0, 1.0))
        } else {
            Some(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_overlapping() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 80.0, 100.0, 100.0);
        assert_eq!(a.intersect(&b), Some(Rect::new(50.0, 80.0, 50.0, 20.0)));
    }

    #[test]
    fn test_intersect_edge_touching_is_zero_area() {
        let viewport = Rect::new(0.0, 0.0, 300.0, 600.0);
        let below = Rect::new(0.0, 600.0, 300.0, 40.0);
        let hit = viewport.intersect(&below).unwrap();
        assert_eq!(hit.area(), 0.0);

        let far_below = below.translate(0.0, 1.0);
        assert!(viewport.intersect(&far_below).is_none());
    }

    #[test]
    fn test_negative_size_intersects_nothing() {
        let collapsed = Rect::new(0.0, 0.0, 100.0, 100.0).expand(-60.0, 0.0, -60.0, 0.0);
        assert!(collapsed.height < 0.0);
        assert!(collapsed.intersect(&Rect::new(0.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn test_visible_fraction() {
        let root = Rect::new(0.0, 0.0, 100.0, 100.0);
        let half_in = Rect::new(0.0, 90.0, 100.0, 20.0);
        let fraction = half_in.visible_fraction(&root).unwrap();
        assert!((fraction - 0.5).abs() < 1e-6);

        let line = Rect::new(0.0, 50.0, 100.0, 0.0);
        assert_eq!(line.visible_fraction(&root), Some(1.0));
        assert_eq!(line.translate(0.0, 200.0).visible_fraction(&root), None);
    }

    #[test]
    fn test_expand_per_edge() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0).expand(5.0, 1.0, 15.0, 2.0);
        assert_eq!(r, Rect::new(8.0, 5.0, 103.0, 70.0));
    }
}
