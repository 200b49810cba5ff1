#![forbid(unsafe_code)]

//! Gesture recognition: classifies a pointer session as tap, drag, or hold.
//!
//! [`DragGesture`] is instantiated once per floating widget. It consumes
//! raw [`PointerEvent`]s plus periodic [`tick`](DragGesture::tick) calls
//! and emits [`GestureEvent`]s the widget controller acts on.
//!
//! # State Machine
//!
//! ```text
//! Idle ──Down──▶ Armed ──move ≥ threshold──▶ Dragging ──Up──▶ Idle
//!                  │ │                          │
//!                  │ └──hold elapses──▶ Holding─┘ (same promotion rule)
//!                  └──Up──▶ Tap ──▶ Idle
//! ```
//!
//! Movement below the drag threshold is buffered: it neither moves the
//! widget nor broadcasts anything, so a slightly shaky tap is still a tap.
//! The optional hold timer (set while the widget is docked) emits
//! [`GestureEvent::HoldArmed`] as an undock-ready affordance when the
//! pointer stays put long enough.
//!
//! # Invariants
//!
//! 1. `Tap` and `DragStart` never both emit for one down/up pair.
//! 2. Every `Down` returns to `Idle` via `Up` or `Cancel`; no state leaks.
//! 3. Movement past the threshold always promotes to `Dragging` and
//!    cancels a pending hold timer (movement wins over hold).
//! 4. A `Cancel` after promotion emits `DragCancel`, never `DragEnd`; a
//!    `Cancel` before promotion emits nothing (in particular, no `Tap`).
//!
//! # Failure Modes
//!
//! - `Move`/`Up` without a prior `Down` (possible when a widget mounts
//!   mid-gesture) are ignored.
//! - A second `Down` without an intervening release restarts the session;
//!   the half-finished session is discarded without emitting.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::geometry::Point;
use crate::pointer::{PointerEvent, PointerKind};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds and timeouts for gesture classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Minimum Euclidean distance (px) before a drag starts (default: 5.0).
    pub drag_threshold: f32,
    /// When set, a stationary press this long arms the undock affordance.
    /// Controllers set this while the widget is snapped and clear it while
    /// it free-floats.
    pub hold_to_drag: Option<Duration>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
            hold_to_drag: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Events and internal state
// ---------------------------------------------------------------------------

/// A classified gesture event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Released without ever crossing the drag threshold.
    Tap { pos: Point },
    /// The hold timer elapsed with the pointer still within the threshold.
    HoldArmed,
    /// Movement crossed the drag threshold. Carries the session's start
    /// position.
    DragStart { pos: Point },
    /// Pointer moved while dragging.
    DragMove { pos: Point },
    /// Pointer released while dragging.
    DragEnd { pos: Point },
    /// Gesture interrupted while dragging. Cleanup only; never commits.
    DragCancel,
}

/// The ephemeral per-press session. Lives between `Down` and `Up`/`Cancel`.
#[derive(Debug, Clone, Copy)]
struct Session {
    start: Point,
    hold_deadline: Option<Instant>,
    hold_fired: bool,
    dragging: bool,
}

// ---------------------------------------------------------------------------
// DragGesture
// ---------------------------------------------------------------------------

/// Per-widget tap/drag/hold state machine.
///
/// Call [`process`](Self::process) for each incoming pointer event and
/// [`tick`](Self::tick) periodically to run the hold timer.
#[derive(Debug)]
pub struct DragGesture {
    config: GestureConfig,
    session: Option<Session>,
}

impl DragGesture {
    /// Create a new gesture machine with the given configuration.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Process a raw pointer event, returning any gesture events produced.
    ///
    /// Most events produce 0 or 1 gesture events; the move that crosses
    /// the threshold produces both `DragStart` and the first `DragMove`.
    pub fn process(&mut self, event: &PointerEvent, now: Instant) -> Vec<GestureEvent> {
        let mut out = Vec::with_capacity(2);
        match event.kind {
            PointerKind::Down => {
                if self.session.is_some() {
                    trace!("pointer down with live session; discarding old session");
                }
                self.session = Some(Session {
                    start: event.pos(),
                    hold_deadline: self.config.hold_to_drag.map(|d| now + d),
                    hold_fired: false,
                    dragging: false,
                });
            }
            PointerKind::Move => {
                let threshold = self.config.drag_threshold;
                if let Some(session) = self.session.as_mut() {
                    if !session.dragging && session.start.distance(event.pos()) >= threshold {
                        session.dragging = true;
                        // Movement wins over hold: a timer that would fire
                        // after this point is dead.
                        session.hold_deadline = None;
                        out.push(GestureEvent::DragStart { pos: session.start });
                    }
                    if session.dragging {
                        out.push(GestureEvent::DragMove { pos: event.pos() });
                    }
                }
            }
            PointerKind::Up => {
                if let Some(session) = self.session.take() {
                    if session.dragging {
                        out.push(GestureEvent::DragEnd { pos: event.pos() });
                    } else {
                        out.push(GestureEvent::Tap { pos: event.pos() });
                    }
                }
            }
            PointerKind::Cancel => {
                if let Some(session) = self.session.take()
                    && session.dragging
                {
                    out.push(GestureEvent::DragCancel);
                }
            }
        }
        out
    }

    /// Run the hold timer. Call periodically (e.g. once per host frame).
    ///
    /// Returns `Some(HoldArmed)` exactly once per session, when the
    /// pointer has been held stationary beyond the configured duration.
    pub fn tick(&mut self, now: Instant) -> Option<GestureEvent> {
        let session = self.session.as_mut()?;
        if session.hold_fired || session.dragging {
            return None;
        }
        let deadline = session.hold_deadline?;
        if now >= deadline {
            session.hold_fired = true;
            session.hold_deadline = None;
            return Some(GestureEvent::HoldArmed);
        }
        None
    }

    /// Whether a drag is currently in progress.
    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.session.is_some_and(|s| s.dragging)
    }

    /// Whether a pointer session (of any phase) is live.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Discard any live session without emitting.
    pub fn reset(&mut self) {
        self.session = None;
    }

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Set or clear the hold-to-drag duration. Takes effect on the next
    /// pointer down; a live session keeps its original deadline.
    pub fn set_hold_to_drag(&mut self, hold: Option<Duration>) {
        self.config.hold_to_drag = hold;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
