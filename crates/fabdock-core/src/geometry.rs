#![forbid(unsafe_code)]

//! Geometric primitives for dock zones and widget placement.
//!
//! Coordinates are screen pixels (`f32`, origin at top-left). Widgets are
//! square; a widget is fully described by its top-left corner plus a side
//! length.

/// A point in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A rectangle for dock zones, viewports, and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl RectF {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from origin with given size.
    #[inline]
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if the rectangle has zero (or negative) area.
    ///
    /// Zones report empty rectangles while their host element is hidden or
    /// mid-transition; empty zones are skipped by snap searches.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }
}

/// Clamp the top-left corner of a square widget so it stays inside the
/// viewport.
///
/// Each axis clamps to `[origin + margin, origin + extent - size]`: the
/// margin keeps the widget off the top/left edges, while the high bound
/// only guarantees the widget itself stays on screen. Degenerate viewports
/// (extent smaller than `size + margin`) resolve to the low bound.
pub fn clamp_to_viewport(pos: Point, size: f32, viewport: RectF, margin: f32) -> Point {
    let min_x = viewport.x + margin;
    let min_y = viewport.y + margin;
    let max_x = (viewport.right() - size).max(min_x);
    let max_y = (viewport.bottom() - size).max(min_y);
    Point::new(pos.x.clamp(min_x, max_x), pos.y.clamp(min_y, max_y))
}
