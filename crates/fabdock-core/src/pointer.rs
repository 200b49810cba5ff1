#![forbid(unsafe_code)]

//! Raw pointer input events.
//!
//! The embedding host translates whatever pointer mechanism it has (mouse,
//! touch, pen) into these four kinds. Pointer capture is the host's job:
//! the engine assumes that once it sees `Down`, every subsequent event for
//! that pointer is delivered until `Up` or `Cancel`.

use crate::geometry::Point;

/// The kind of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// Pointer pressed on the widget.
    Down,
    /// Pointer moved while pressed.
    Move,
    /// Pointer released.
    Up,
    /// Gesture interrupted by the platform (e.g. an OS gesture). Treated
    /// like `Up` for cleanup but never commits anything.
    Cancel,
}

/// A raw pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    /// Pointer pressed at `(x, y)`.
    pub const fn down(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Down,
            x,
            y,
        }
    }

    /// Pointer moved to `(x, y)` while pressed.
    pub const fn moved(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Move,
            x,
            y,
        }
    }

    /// Pointer released at `(x, y)`.
    pub const fn up(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Up,
            x,
            y,
        }
    }

    /// Gesture cancelled at `(x, y)`.
    pub const fn cancel(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Cancel,
            x,
            y,
        }
    }

    /// Event position as a [`Point`].
    #[inline]
    pub const fn pos(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
