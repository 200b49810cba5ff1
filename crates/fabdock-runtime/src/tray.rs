#![forbid(unsafe_code)]

//! The dock tray: a collapsible host of dynamic slot zones.
//!
//! The tray owns one visual slot per registered widget, used as a
//! secondary dock target next to the always-present rail. Slots only have
//! meaningful on-screen geometry while the tray is open and done
//! transitioning, so the controller runs the force-then-measure protocol:
//! jump the visuals to the resting state, arm a [`SettleTimer`], and read
//! each slot's rectangle only when it fires.
//!
//! # Behavior
//!
//! - Slot count tracks the registry's widget count.
//! - `open`/`close` are idempotent. Close unregisters every tray-slot
//!   zone *before* touching the visuals, so a dragging widget never sees
//!   a slot that is about to disappear.
//! - Any widget's drag-start auto-opens the tray; after drag-end a 1.5 s
//!   auto-close fires unless the open was user-initiated or a widget
//!   ended up occupying a slot. A user-initiated open is never auto-closed.
//! - A slot that measures empty is skipped for that pass; its previous
//!   registration (if any) stays until a later pass succeeds. Callers
//!   re-measure generously instead of trusting any single pass.

use std::time::{Duration, Instant};

use tracing::debug;

use fabdock_core::bus::{BusReceiver, DockBus, DockEvent};
use fabdock_core::geometry::RectF;
use fabdock_registry::registry::{DockRegistry, TRAY_SLOT_PREFIX, tray_slot_id};

use crate::settle::SettleTimer;

/// How long after a drag ends an automatic open stays up with no occupant.
pub const AUTO_CLOSE_DELAY: Duration = Duration::from_millis(1500);

/// The host-UI seam the tray controller drives.
///
/// Implementations wrap whatever actually renders the tray. Measurement
/// may legitimately fail (empty rect) while the host is hidden or
/// mid-transition; the controller tolerates that.
pub trait SlotHost {
    /// Jump the tray visuals to their final open/closed state so
    /// measurement reflects resting geometry.
    fn force_resting_state(&mut self, open: bool);

    /// The current screen rectangle of slot `index`. Empty when the slot
    /// cannot be measured yet.
    fn measure_slot(&mut self, index: usize) -> RectF;

    /// Remove inline positioning so the host's styling can fully hide the
    /// closed tray.
    fn clear_inline_styles(&mut self);

    /// Duration of the host's open/close transition.
    fn transition_duration(&self) -> Duration {
        Duration::from_millis(200)
    }
}

/// Controller for the dock tray. Owns the dynamic `fab-tray-slot-*` zones.
pub struct TrayController<H: SlotHost> {
    host: H,
    registry: DockRegistry,
    bus: DockBus,
    rx: BusReceiver,
    open: bool,
    user_opened: bool,
    slot_count: usize,
    measure: SettleTimer,
    auto_close: Option<Instant>,
}

impl<H: SlotHost> TrayController<H> {
    /// Create a tray controller. The slot count seeds from the widgets
    /// already registered.
    #[must_use]
    pub fn new(host: H, registry: DockRegistry, bus: DockBus) -> Self {
        let rx = bus.subscribe();
        let slot_count = registry.registered_fab_count();
        Self {
            host,
            registry,
            bus,
            rx,
            open: false,
            user_opened: false,
            slot_count,
            measure: SettleTimer::new(),
            auto_close: None,
        }
    }

    /// Open the tray. Idempotent; a user-initiated open (re)marks the
    /// tray as user-held even if it was already auto-opened.
    pub fn open(&mut self, now: Instant, user_initiated: bool) {
        if self.open {
            self.user_opened |= user_initiated;
            return;
        }
        self.open = true;
        self.user_opened = user_initiated;
        self.auto_close = None;
        self.host.force_resting_state(true);
        self.measure.arm(now, self.host.transition_duration());
        self.bus.publish(DockEvent::TrayStateChange {
            open: true,
            unmounting: false,
            mounting: false,
        });
    }

    /// Close the tray. Idempotent. Unregisters all tray-slot zones before
    /// clearing the host's inline styles.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.unregister_all_slots();
        self.host.clear_inline_styles();
        self.open = false;
        self.user_opened = false;
        self.measure.cancel();
        self.auto_close = None;
        self.bus.publish(DockEvent::TrayStateChange {
            open: false,
            unmounting: false,
            mounting: false,
        });
    }

    /// Tear the tray down (host unmount). Closes if open and broadcasts
    /// the unmounting flavor of the state change.
    pub fn unmount(mut self) {
        if self.open {
            self.unregister_all_slots();
            self.host.clear_inline_styles();
            self.open = false;
        }
        self.bus.publish(DockEvent::TrayStateChange {
            open: false,
            unmounting: true,
            mounting: false,
        });
    }

    /// Re-run force-then-measure (host resize hook). No-op while closed.
    pub fn remeasure(&mut self, now: Instant) {
        if self.open {
            self.host.force_resting_state(true);
            self.measure.arm(now, self.host.transition_duration());
        }
    }

    /// Drive timers and consume coordination events. Call once per host
    /// frame.
    pub fn tick(&mut self, now: Instant) {
        for event in self.rx.drain() {
            match event {
                DockEvent::DragStart { .. } => {
                    self.auto_close = None;
                    self.open(now, false);
                }
                DockEvent::DragEnd { .. } => {
                    if self.open && !self.user_opened {
                        self.auto_close = Some(now + AUTO_CLOSE_DELAY);
                    }
                }
                DockEvent::RegistryChanged { count } => {
                    self.slot_count = count;
                    if self.open {
                        self.measure.arm(now, self.host.transition_duration());
                    }
                }
                _ => {}
            }
        }

        if self.measure.fire(now) && self.open {
            self.register_tray_slots();
        }

        if let Some(deadline) = self.auto_close
            && now >= deadline
        {
            self.auto_close = None;
            if !self.user_opened && !self.any_slot_occupied() {
                self.close();
            }
        }
    }

    /// Whether the tray is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether the current open was user-initiated.
    #[must_use]
    pub fn is_user_opened(&self) -> bool {
        self.user_opened
    }

    /// Current slot count (tracks the registry's widget count).
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Access the host (mainly for tests and host adapters).
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Measure every slot and register the results as zones, then tell
    /// everyone to re-read zone geometry.
    fn register_tray_slots(&mut self) {
        for index in 0..self.slot_count {
            let rect = self.host.measure_slot(index);
            if rect.is_empty() {
                debug!(slot = index, "slot unmeasurable; keeping stale registration");
                continue;
            }
            self.registry.register_zone(&tray_slot_id(index), rect);
        }
        // Slots past the current count no longer exist.
        for zone in self.registry.get_zones() {
            if let Some(rest) = zone.id.strip_prefix(TRAY_SLOT_PREFIX)
                && rest.parse::<usize>().is_ok_and(|i| i >= self.slot_count)
            {
                self.registry.unregister_zone(&zone.id);
            }
        }
        self.bus.publish(DockEvent::SnapZonesUpdated);
    }

    fn unregister_all_slots(&mut self) {
        for zone in self.registry.get_zones() {
            if zone.id.starts_with(TRAY_SLOT_PREFIX) {
                self.registry.unregister_zone(&zone.id);
            }
        }
    }

    fn any_slot_occupied(&self) -> bool {
        self.registry
            .get_zones()
            .iter()
            .any(|z| z.id.starts_with(TRAY_SLOT_PREFIX) && z.occupied_by.is_some())
    }
}
