#![forbid(unsafe_code)]

//! Core: geometry, pointer events, gesture recognition, and the
//! coordination bus for the FAB docking engine.
//!
//! # Role in fabdock
//! `fabdock-core` is the input layer. It owns the pure geometry used for
//! clamping and snap distance checks, the per-widget drag/tap/hold gesture
//! state machine, and the typed broadcast channel that independently
//! mounted widgets use to coordinate without a shared parent.
//!
//! # Primary responsibilities
//! - **Geometry**: `Point`/`RectF` in screen pixels, viewport clamping.
//! - **PointerEvent**: the four raw pointer kinds the engine consumes.
//! - **DragGesture**: classifies a down/move/up sequence as tap, drag, or
//!   hold, driven by explicit `Instant`s so every timing path is testable.
//! - **DockBus**: queued pub/sub carrying [`bus::DockEvent`] between
//!   sibling controllers.
//!
//! # How it fits in the system
//! `fabdock-registry` consumes the geometry types and publishes on the
//! bus; `fabdock-runtime` drives `DragGesture` with host pointer input and
//! drains its bus receiver once per tick.

pub mod bus;
pub mod geometry;
pub mod gesture;
pub mod pointer;

pub use bus::{BusReceiver, DockBus, DockEvent};
pub use geometry::{Point, RectF, clamp_to_viewport};
pub use gesture::{DragGesture, GestureConfig, GestureEvent};
pub use pointer::{PointerEvent, PointerKind};
