#![forbid(unsafe_code)]

//! Per-widget controller: restore-on-mount, gesture wiring, and commit.
//!
//! One [`FabController`] runs per floating widget. It owns the widget's
//! live position and visibility, interprets pointer input through a
//! [`DragGesture`], and talks to the rest of the engine only through the
//! injected registry, store, and bus handles.
//!
//! # Commit discipline
//!
//! Live position updates during a drag are session-local. Durable state
//! (the position record and the snap flag) is written at exactly two
//! points: when a drag is permitted to start (the un-dock is recorded)
//! and when a drag ends in a commit. A cancelled drag broadcasts the same
//! cleanup as a finished one but commits nothing.
//!
//! # Failure Modes
//!
//! - Storage failures on commit are logged and swallowed; the widget
//!   keeps its live position for the session.
//! - A snap restore onto a zone held by another live widget gives up the
//!   snap and falls back to a free position (the occupancy-conflict rule
//!   applied to the mount path).

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use fabdock_core::bus::{BusReceiver, DockBus, DockEvent};
use fabdock_core::geometry::{Point, RectF, clamp_to_viewport};
use fabdock_core::gesture::{DragGesture, GestureConfig, GestureEvent};
use fabdock_core::pointer::{PointerEvent, PointerKind};
use fabdock_registry::registry::{DockRegistry, FabDescriptor, TRAY_SLOT_PREFIX};
use fabdock_registry::store::{PersistedPosition, PositionStore};

use crate::settle::SettleTimer;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-widget tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FabConfig {
    /// Side length of the square widget, px.
    pub size: f32,
    /// Minimum distance from the viewport's top/left edges, px.
    pub margin: f32,
    /// Drag promotion threshold, px.
    pub drag_threshold: f32,
    /// Stationary-press duration that arms the undock affordance while
    /// the widget is snapped. Varies per widget in practice (150–300 ms).
    pub hold_to_drag: Duration,
}

impl Default for FabConfig {
    fn default() -> Self {
        Self {
            size: 48.0,
            margin: 8.0,
            drag_threshold: 5.0,
            hold_to_drag: Duration::from_millis(200),
        }
    }
}

// ---------------------------------------------------------------------------
// FabController
// ---------------------------------------------------------------------------

/// Controller for one floating widget.
pub struct FabController {
    descriptor: FabDescriptor,
    config: FabConfig,
    registry: DockRegistry,
    store: PositionStore,
    bus: DockBus,
    rx: BusReceiver,
    gesture: DragGesture,
    viewport: RectF,
    position: Point,
    grab_offset: (f32, f32),
    hidden: bool,
    panel_open: bool,
    undock_armed: bool,
    near_zone: Option<String>,
    restore: SettleTimer,
    mounted: bool,
}

impl std::fmt::Debug for FabController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FabController")
            .field("id", &self.descriptor.id)
            .field("position", &self.position)
            .field("hidden", &self.hidden)
            .field("dragging", &self.gesture.is_dragging())
            .finish()
    }
}

impl FabController {
    /// Wire up a controller. Call [`mount`](Self::mount) to run the
    /// restore protocol and make the widget eligible for docking.
    #[must_use]
    pub fn new(
        descriptor: FabDescriptor,
        config: FabConfig,
        viewport: RectF,
        registry: DockRegistry,
        store: PositionStore,
        bus: DockBus,
    ) -> Self {
        let rx = bus.subscribe();
        let gesture = DragGesture::new(GestureConfig {
            drag_threshold: config.drag_threshold,
            hold_to_drag: None,
        });
        Self {
            descriptor,
            config,
            registry,
            store,
            bus,
            rx,
            gesture,
            viewport,
            position: Point::default(),
            grab_offset: (0.0, 0.0),
            hidden: false,
            panel_open: false,
            undock_armed: false,
            near_zone: None,
            restore: SettleTimer::new(),
            mounted: false,
        }
    }

    /// Widget id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Register the descriptor and run the restore-on-mount protocol.
    pub fn mount(&mut self, now: Instant) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.registry.register_fab(self.descriptor.clone());

        // Free fallback first so an unresolved snap never leaves the
        // widget at the origin.
        self.position = self.free_fallback_position();

        if let Some(zone_id) = self.registry.get_snapped_zone_id(self.id()) {
            // A tray-snapped widget stays hidden until its slot has real
            // geometry again, even if the tray is not mounted at all.
            self.hidden = zone_id.starts_with(TRAY_SLOT_PREFIX);
            self.registry.ensure_zone(&zone_id);
            self.gesture.set_hold_to_drag(Some(self.config.hold_to_drag));
            // Rail zones register shortly after layout; wait one settle
            // window, then keep listening for zone updates.
            self.restore.arm(now, Duration::ZERO);
            self.resolve_snap();
        }
    }

    /// Unregister the descriptor (releasing any occupied zone). Durable
    /// state stays for the next mount.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.gesture.reset();
        self.restore.cancel();
        self.registry.unregister_fab(&self.descriptor.id);
    }

    /// Feed one pointer event.
    pub fn on_pointer(&mut self, event: &PointerEvent, now: Instant) {
        if !self.mounted || self.hidden {
            return;
        }
        if event.kind == PointerKind::Down {
            self.grab_offset = (event.x - self.position.x, event.y - self.position.y);
        }
        for gesture in self.gesture.process(event, now) {
            self.on_gesture(gesture, now);
        }
    }

    /// Drive timers and consume coordination events. Call once per host
    /// frame.
    pub fn tick(&mut self, now: Instant) {
        if !self.mounted {
            return;
        }
        for event in self.rx.drain() {
            self.on_bus_event(&event);
        }
        if self.restore.fire(now) {
            self.resolve_snap();
        }
        if let Some(gesture) = self.gesture.tick(now) {
            self.on_gesture(gesture, now);
        }
    }

    /// Update the viewport (host resize). Free positions re-clamp;
    /// snapped positions re-derive from zone geometry.
    pub fn set_viewport(&mut self, viewport: RectF) {
        self.viewport = viewport;
        if self.registry.get_snapped_zone_id(self.id()).is_some() {
            self.resolve_snap();
        } else {
            self.position = self.clamp(self.position);
        }
    }

    // --- accessors ---

    /// Current top-left position.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Whether the widget is rendered hidden (tray-snapped with its slot
    /// currently gone).
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the widget's own panel is open (toggled by taps).
    #[must_use]
    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_dragging()
    }

    /// Whether a hold has armed the undock affordance this session.
    #[must_use]
    pub fn is_undock_armed(&self) -> bool {
        self.undock_armed
    }

    /// The zone id last broadcast as the near-snap target, if any.
    #[must_use]
    pub fn near_zone(&self) -> Option<&str> {
        self.near_zone.as_deref()
    }

    // --- internals ---

    fn on_gesture(&mut self, gesture: GestureEvent, _now: Instant) {
        match gesture {
            GestureEvent::Tap { .. } => {
                self.panel_open = !self.panel_open;
                self.undock_armed = false;
            }
            GestureEvent::HoldArmed => {
                self.undock_armed = true;
            }
            GestureEvent::DragStart { .. } => {
                self.undock_armed = false;
                if self.registry.get_snapped_zone_id(self.id()).is_some() {
                    self.registry.release_zone(&self.descriptor.id);
                    self.registry.set_snapped(self.id(), false, None);
                }
                self.bus.publish(DockEvent::DragStart {
                    fab_id: self.descriptor.id.clone(),
                });
            }
            GestureEvent::DragMove { pos } => {
                self.position = self.clamp(Point::new(
                    pos.x - self.grab_offset.0,
                    pos.y - self.grab_offset.1,
                ));
                trace!(fab = %self.descriptor.id, x = pos.x, y = pos.y, "drag move");
                let near = self
                    .registry
                    .find_snap_zone(pos.x, pos.y, self.id())
                    .map(|z| z.id);
                if near != self.near_zone {
                    self.near_zone.clone_from(&near);
                    self.bus.publish(DockEvent::NearSnapZone { zone_id: near });
                }
            }
            GestureEvent::DragEnd { pos } => {
                self.position = self.clamp(Point::new(
                    pos.x - self.grab_offset.0,
                    pos.y - self.grab_offset.1,
                ));
                self.bus.publish(DockEvent::DragEnd {
                    fab_id: self.descriptor.id.clone(),
                });
                match self.registry.find_snap_zone(pos.x, pos.y, self.id()) {
                    Some(zone) => {
                        self.registry.occupy_zone(&zone.id, &self.descriptor.id);
                        self.position = self.registry.get_snap_position(&zone, self.config.size);
                        self.registry.set_snapped(self.id(), true, Some(&zone.id));
                        self.gesture
                            .set_hold_to_drag(Some(self.config.hold_to_drag));
                        debug!(fab = %self.descriptor.id, zone = %zone.id, "snapped");
                    }
                    None => {
                        self.registry.set_snapped(self.id(), false, None);
                        self.gesture.set_hold_to_drag(None);
                    }
                }
                self.persist_position();
                self.clear_near_zone();
            }
            GestureEvent::DragCancel => {
                // Cleanup contract only: same broadcasts as a finished
                // drag, but nothing is committed.
                self.bus.publish(DockEvent::DragEnd {
                    fab_id: self.descriptor.id.clone(),
                });
                self.clear_near_zone();
            }
        }
    }

    fn on_bus_event(&mut self, event: &DockEvent) {
        match event {
            DockEvent::SnapZonesUpdated => self.resolve_snap(),
            DockEvent::TrayStateChange { open: false, .. } => {
                let tray_snapped = self
                    .registry
                    .get_snapped_zone_id(self.id())
                    .is_some_and(|z| z.starts_with(TRAY_SLOT_PREFIX));
                if tray_snapped && !self.gesture.is_dragging() {
                    self.hidden = true;
                }
            }
            _ => {}
        }
    }

    /// Try to turn the durable snap flag into an actual occupied zone and
    /// on-screen position. Tolerant: missing or unmeasured geometry keeps
    /// waiting for the next zone update instead of teleporting anywhere.
    fn resolve_snap(&mut self) {
        let Some(zone_id) = self.registry.get_snapped_zone_id(self.id()) else {
            return;
        };
        self.registry.ensure_zone(&zone_id);
        self.registry.occupy_zone(&zone_id, &self.descriptor.id);
        let Some(zone) = self.registry.get_zone(&zone_id) else {
            return;
        };
        if zone.occupied_by.as_deref() != Some(self.id()) {
            // Another live widget holds the zone: do not snap.
            debug!(fab = %self.descriptor.id, zone = %zone_id, "restore conflict; free-floating");
            self.registry.set_snapped(self.id(), false, None);
            self.gesture.set_hold_to_drag(None);
            self.position = self.free_fallback_position();
            self.hidden = false;
            return;
        }
        if zone.rect.is_empty() {
            return;
        }
        self.position = self.registry.get_snap_position(&zone, self.config.size);
        self.hidden = false;
    }

    fn persist_position(&self) {
        let record = PersistedPosition {
            x: self.position.x,
            y: self.position.y,
        };
        if let Err(e) = self.store.save_position(&self.descriptor.id, record) {
            warn!(fab = %self.descriptor.id, error = %e, "position persist failed");
        }
    }

    fn clear_near_zone(&mut self) {
        if self.near_zone.take().is_some() {
            self.bus.publish(DockEvent::NearSnapZone { zone_id: None });
        }
    }

    fn clamp(&self, pos: Point) -> Point {
        clamp_to_viewport(pos, self.config.size, self.viewport, self.config.margin)
    }

    fn free_fallback_position(&self) -> Point {
        let pos = self
            .store
            .load_position(&self.descriptor.id)
            .map_or_else(|| self.default_position(), |p| Point::new(p.x, p.y));
        self.clamp(pos)
    }

    /// Computed default: bottom-right corner, inside the margin.
    fn default_position(&self) -> Point {
        Point::new(
            self.viewport.right() - self.config.size - self.config.margin,
            self.viewport.bottom() - self.config.size - self.config.margin,
        )
    }
}
