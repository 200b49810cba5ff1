#![forbid(unsafe_code)]

//! Runtime layer: the controllers that tie gestures, registry, store, and
//! bus together.
//!
//! # Role in fabdock
//! `fabdock-runtime` hosts one [`FabController`] per floating widget and
//! one [`TrayController`] for the collapsible slot tray. Both are driven
//! by the embedding host: pointer events go to
//! [`FabController::on_pointer`], and both controllers expect a `tick`
//! once per host frame with the current `Instant`.
//!
//! # Concurrency model
//! Single-threaded and cooperative. There are no background threads and
//! no hidden timers; every delayed behavior (hold-to-undock, layout
//! settle, tray auto-close) is an explicit deadline polled from `tick`.
//! Within one widget's gesture session events are strictly ordered by the
//! host's pointer capture; across widgets there is no ordering guarantee,
//! and occupancy correctness relies on check-then-claim against the
//! shared registry (human gestures cannot contend simultaneously).

pub mod fab;
pub mod settle;
pub mod tray;

pub use fab::{FabConfig, FabController};
pub use settle::{FRAME, SettleTimer};
pub use tray::{AUTO_CLOSE_DELAY, SlotHost, TrayController};
