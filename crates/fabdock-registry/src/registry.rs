#![forbid(unsafe_code)]

//! The dock registry: widgets, zones, occupancy, and snap bookkeeping.
//!
//! One registry instance is shared (by handle clone) across every floating
//! widget controller and the tray controller. Mutations are synchronous
//! and immediately observable through any handle; widget membership
//! changes broadcast [`DockEvent::RegistryChanged`] on the bus.
//!
//! # Ownership conventions
//!
//! There is no locking; safety is by convention. A widget mutates only its
//! own descriptor, occupancy, and snap flags. Only the tray controller
//! adds or removes `fab-tray-slot-*` zones. The registry itself never
//! enforces this.
//!
//! # Failure Modes
//!
//! Operating on an unknown widget or zone id is a silent (debug-logged)
//! no-op, never an error: widgets mount and unmount independently, and a
//! race between one widget's drag handler and another's unmount is
//! routine, not exceptional.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, warn};

use fabdock_core::bus::{DockBus, DockEvent};
use fabdock_core::geometry::{Point, RectF};

use crate::store::{PositionStore, SnapFlag};

/// Snap search radius: a zone is eligible when its center lies within this
/// distance of the query point.
pub const SNAP_THRESHOLD: f32 = 150.0;

/// Id prefix for the tray's dynamic slot zones.
pub const TRAY_SLOT_PREFIX: &str = "fab-tray-slot-";

/// Zone id for the tray slot at `index`.
#[must_use]
pub fn tray_slot_id(index: usize) -> String {
    format!("{TRAY_SLOT_PREFIX}{index}")
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A registered floating widget. At most one live descriptor per id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabDescriptor {
    pub id: String,
    pub label: String,
    pub icon: String,
}

impl FabDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: icon.into(),
        }
    }
}

/// A named rectangular snap target.
#[derive(Debug, Clone, PartialEq)]
pub struct DockZone {
    pub id: String,
    pub rect: RectF,
    /// The widget holding an exclusive claim on this zone, if any.
    pub occupied_by: Option<String>,
}

// ---------------------------------------------------------------------------
// DockRegistry
// ---------------------------------------------------------------------------

struct RegistryInner {
    /// Registration order matters: it is the documented tie-break for
    /// equidistant zones.
    fabs: Vec<FabDescriptor>,
    zones: Vec<DockZone>,
    snaps: AHashMap<String, SnapFlag>,
    bus: DockBus,
    store: PositionStore,
}

/// Shared registry handle. Cloning creates another handle to the same
/// underlying state.
pub struct DockRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl Clone for DockRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for DockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("DockRegistry")
            .field("fabs", &inner.fabs.len())
            .field("zones", &inner.zones.len())
            .finish()
    }
}

impl DockRegistry {
    /// Create a registry publishing on `bus` and persisting snap flags
    /// through `store`.
    #[must_use]
    pub fn new(bus: DockBus, store: PositionStore) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                fabs: Vec::new(),
                zones: Vec::new(),
                snaps: AHashMap::new(),
                bus,
                store,
            })),
        }
    }

    // --- widgets ---

    /// Register a widget descriptor. Idempotent: re-registering an id
    /// updates the descriptor in place without a membership broadcast.
    ///
    /// First registration of an id seeds its snap flag from durable
    /// storage, so a widget's "last known snap" survives reloads.
    pub fn register_fab(&self, descriptor: FabDescriptor) {
        let (bus, count) = {
            let mut inner = self.inner.borrow_mut();
            if let Some(existing) = inner.fabs.iter_mut().find(|f| f.id == descriptor.id) {
                *existing = descriptor;
                return;
            }
            if !inner.snaps.contains_key(&descriptor.id) {
                let flag = inner.store.load_snap(&descriptor.id).unwrap_or_default();
                inner.snaps.insert(descriptor.id.clone(), flag);
            }
            debug!(fab = %descriptor.id, "fab registered");
            inner.fabs.push(descriptor);
            (inner.bus.clone(), inner.fabs.len())
        };
        bus.publish(DockEvent::RegistryChanged { count });
    }

    /// Unregister a widget. Idempotent; also releases any zone the widget
    /// occupied. Snap flags are durable and survive unregistration.
    pub fn unregister_fab(&self, id: &str) {
        let published = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.fabs.len();
            inner.fabs.retain(|f| f.id != id);
            if inner.fabs.len() == before {
                debug!(fab = id, "unregister of unknown fab; ignoring");
                None
            } else {
                for zone in &mut inner.zones {
                    if zone.occupied_by.as_deref() == Some(id) {
                        zone.occupied_by = None;
                    }
                }
                debug!(fab = id, "fab unregistered");
                Some((inner.bus.clone(), inner.fabs.len()))
            }
        };
        if let Some((bus, count)) = published {
            bus.publish(DockEvent::RegistryChanged { count });
        }
    }

    /// All registered descriptors, in registration order.
    #[must_use]
    pub fn get_registered_fabs(&self) -> Vec<FabDescriptor> {
        self.inner.borrow().fabs.clone()
    }

    /// Number of registered widgets. Drives the tray's slot count.
    #[must_use]
    pub fn registered_fab_count(&self) -> usize {
        self.inner.borrow().fabs.len()
    }

    fn is_fab_registered(inner: &RegistryInner, id: &str) -> bool {
        inner.fabs.iter().any(|f| f.id == id)
    }

    // --- zones ---

    /// Upsert a zone definition by id.
    ///
    /// Tray slots call this repeatedly with fresh geometry on every layout
    /// reflow; an update keeps the zone's registration-order slot and its
    /// current occupant.
    pub fn register_zone(&self, id: &str, rect: RectF) {
        let mut inner = self.inner.borrow_mut();
        if let Some(zone) = inner.zones.iter_mut().find(|z| z.id == id) {
            zone.rect = rect;
        } else {
            inner.zones.push(DockZone {
                id: id.to_owned(),
                rect,
                occupied_by: None,
            });
        }
    }

    /// Remove a zone definition. Unknown ids are a silent no-op.
    pub fn unregister_zone(&self, id: &str) {
        let mut inner = self.inner.borrow_mut();
        let before = inner.zones.len();
        inner.zones.retain(|z| z.id != id);
        if inner.zones.len() == before {
            debug!(zone = id, "unregister of unknown zone; ignoring");
        }
    }

    /// Create a zero-sized placeholder if the zone does not exist yet, so
    /// snap-restore lookups do not fail while real geometry is pending.
    pub fn ensure_zone(&self, id: &str) {
        let mut inner = self.inner.borrow_mut();
        if !inner.zones.iter().any(|z| z.id == id) {
            inner.zones.push(DockZone {
                id: id.to_owned(),
                rect: RectF::default(),
                occupied_by: None,
            });
        }
    }

    /// All zones, in registration order.
    #[must_use]
    pub fn get_zones(&self) -> Vec<DockZone> {
        self.inner.borrow().zones.clone()
    }

    /// Look up a single zone by id.
    #[must_use]
    pub fn get_zone(&self, id: &str) -> Option<DockZone> {
        self.inner.borrow().zones.iter().find(|z| z.id == id).cloned()
    }

    // --- snapping ---

    /// Nearest zone whose center lies within [`SNAP_THRESHOLD`] of
    /// `(px, py)`, excluding zones occupied by a widget other than
    /// `excluding_fab_id`.
    ///
    /// Zones with unmeasured (empty) geometry are skipped. Occupancy held
    /// by a no-longer-registered widget is stale and treated as free.
    /// Equidistant zones resolve to the earlier-registered one.
    #[must_use]
    pub fn find_snap_zone(&self, px: f32, py: f32, excluding_fab_id: &str) -> Option<DockZone> {
        let inner = self.inner.borrow();
        let p = Point::new(px, py);
        let mut best: Option<(f32, &DockZone)> = None;
        for zone in &inner.zones {
            if zone.rect.is_empty() {
                continue;
            }
            if let Some(owner) = zone.occupied_by.as_deref()
                && owner != excluding_fab_id
                && Self::is_fab_registered(&inner, owner)
            {
                continue;
            }
            let d = zone.rect.center().distance(p);
            if d > SNAP_THRESHOLD {
                continue;
            }
            if best.is_none_or(|(best_d, _)| d < best_d) {
                best = Some((d, zone));
            }
        }
        best.map(|(_, z)| z.clone())
    }

    /// Top-left coordinate that centers a square widget of `widget_size`
    /// inside `zone`.
    #[must_use]
    pub fn get_snap_position(&self, zone: &DockZone, widget_size: f32) -> Point {
        let c = zone.rect.center();
        Point::new(c.x - widget_size / 2.0, c.y - widget_size / 2.0)
    }

    /// Claim a zone for a widget.
    ///
    /// The caller must have confirmed the zone is free: a claim against a
    /// live occupant is refused (warn-logged no-op), never an eviction.
    /// A stale occupant (unregistered widget) is overwritten.
    pub fn occupy_zone(&self, zone_id: &str, fab_id: &str) {
        let mut inner = self.inner.borrow_mut();
        let taken = inner
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .and_then(|z| z.occupied_by.clone());
        if let Some(owner) = taken
            && owner != fab_id
            && Self::is_fab_registered(&inner, &owner)
        {
            warn!(zone = zone_id, fab = fab_id, owner = %owner, "occupy refused: zone taken");
            return;
        }
        match inner.zones.iter_mut().find(|z| z.id == zone_id) {
            Some(zone) => zone.occupied_by = Some(fab_id.to_owned()),
            None => debug!(zone = zone_id, fab = fab_id, "occupy of unknown zone; ignoring"),
        }
    }

    /// Release whichever zone, if any, `fab_id` currently occupies.
    pub fn release_zone(&self, fab_id: &str) {
        let mut inner = self.inner.borrow_mut();
        for zone in &mut inner.zones {
            if zone.occupied_by.as_deref() == Some(fab_id) {
                zone.occupied_by = None;
            }
        }
    }

    // --- snap flags ---

    /// Record a widget's snap state. Write-through: the flag is also
    /// persisted durably (a storage failure is logged, not surfaced).
    pub fn set_snapped(&self, id: &str, snapped: bool, zone_id: Option<&str>) {
        let inner = self.inner.borrow();
        let flag = if snapped {
            match zone_id {
                Some(z) => SnapFlag::to_zone(z),
                None => {
                    debug!(fab = id, "set_snapped(true) without zone id; ignoring");
                    return;
                }
            }
        } else {
            SnapFlag::free()
        };
        if let Err(e) = inner.store.save_snap(id, &flag) {
            warn!(fab = id, error = %e, "snap flag persist failed");
        }
        drop(inner);
        self.inner.borrow_mut().snaps.insert(id.to_owned(), flag);
    }

    /// The zone a widget's last committed snap points at, if snapped.
    #[must_use]
    pub fn get_snapped_zone_id(&self, id: &str) -> Option<String> {
        let inner = self.inner.borrow();
        inner
            .snaps
            .get(id)
            .filter(|f| f.snapped)
            .and_then(|f| f.zone_id.clone())
    }

    /// Whether the widget's last committed snap targets a rail zone (as
    /// opposed to a tray slot).
    #[must_use]
    pub fn is_snapped_to_rail(&self, id: &str) -> bool {
        self.get_snapped_zone_id(id)
            .is_some_and(|z| !z.starts_with(TRAY_SLOT_PREFIX))
    }

    /// Ids of all widgets whose snap flag is currently set.
    #[must_use]
    pub fn get_snapped_fabs(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        inner
            .fabs
            .iter()
            .filter(|f| inner.snaps.get(&f.id).is_some_and(|s| s.snapped))
            .map(|f| f.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry() -> DockRegistry {
        DockRegistry::new(DockBus::new(), PositionStore::in_memory())
    }

    fn fab(id: &str) -> FabDescriptor {
        FabDescriptor::new(id, id.to_uppercase(), "icon")
    }

    #[test]
    fn register_zone_is_idempotent_upsert() {
        let reg = registry();
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        let zones = reg.get_zones();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].rect, RectF::new(0.0, 0.0, 48.0, 48.0));
    }

    #[test]
    fn register_zone_update_keeps_occupant() {
        let reg = registry();
        reg.register_fab(fab("fab-1"));
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.occupy_zone("rail-0", "fab-1");
        reg.register_zone("rail-0", RectF::new(10.0, 0.0, 48.0, 48.0));
        assert_eq!(
            reg.get_zone("rail-0").unwrap().occupied_by.as_deref(),
            Some("fab-1")
        );
    }

    #[test]
    fn find_snap_zone_within_threshold() {
        let reg = registry();
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        let hit = reg.find_snap_zone(20.0, 20.0, "fab-1");
        assert_eq!(hit.unwrap().id, "rail-0");
    }

    #[test]
    fn find_snap_zone_outside_threshold_is_none() {
        let reg = registry();
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        assert!(reg.find_snap_zone(500.0, 500.0, "fab-1").is_none());
    }

    #[test]
    fn find_snap_zone_prefers_nearest() {
        let reg = registry();
        reg.register_zone("far", RectF::new(100.0, 0.0, 48.0, 48.0));
        reg.register_zone("near", RectF::new(0.0, 0.0, 48.0, 48.0));
        let hit = reg.find_snap_zone(10.0, 10.0, "fab-1");
        assert_eq!(hit.unwrap().id, "near");
    }

    #[test]
    fn find_snap_zone_tie_resolves_to_registration_order() {
        let reg = registry();
        reg.register_zone("left", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.register_zone("right", RectF::new(48.0, 0.0, 48.0, 48.0));
        // Query point equidistant from both centers.
        let hit = reg.find_snap_zone(48.0, 24.0, "fab-1");
        assert_eq!(hit.unwrap().id, "left");
    }

    #[test]
    fn find_snap_zone_excludes_foreign_occupancy() {
        let reg = registry();
        reg.register_fab(fab("fab-1"));
        reg.register_fab(fab("fab-2"));
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.occupy_zone("rail-0", "fab-1");

        assert!(reg.find_snap_zone(20.0, 20.0, "fab-2").is_none());
        // The occupant itself still sees its own zone.
        assert!(reg.find_snap_zone(20.0, 20.0, "fab-1").is_some());
    }

    #[test]
    fn stale_occupancy_is_treated_as_free() {
        let reg = registry();
        reg.register_fab(fab("fab-1"));
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.occupy_zone("rail-0", "fab-1");

        // Unregister without an explicit release: a later check must see
        // the zone as free (the unregister path also clears it).
        reg.unregister_fab("fab-1");
        assert!(reg.find_snap_zone(20.0, 20.0, "fab-2").is_some());
        reg.occupy_zone("rail-0", "fab-2");
        assert_eq!(
            reg.get_zone("rail-0").unwrap().occupied_by.as_deref(),
            Some("fab-2")
        );
    }

    #[test]
    fn find_snap_zone_skips_placeholder_zones() {
        let reg = registry();
        reg.ensure_zone("fab-tray-slot-0");
        assert!(reg.find_snap_zone(0.0, 0.0, "fab-1").is_none());
    }

    #[test]
    fn occupy_refuses_live_occupant() {
        let reg = registry();
        reg.register_fab(fab("fab-1"));
        reg.register_fab(fab("fab-2"));
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.occupy_zone("rail-0", "fab-1");
        reg.occupy_zone("rail-0", "fab-2");
        assert_eq!(
            reg.get_zone("rail-0").unwrap().occupied_by.as_deref(),
            Some("fab-1")
        );
    }

    #[test]
    fn unregister_fab_releases_occupied_zone() {
        let reg = registry();
        reg.register_fab(fab("fab-1"));
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.occupy_zone("rail-0", "fab-1");
        reg.unregister_fab("fab-1");
        assert_eq!(reg.get_zone("rail-0").unwrap().occupied_by, None);
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let reg = registry();
        reg.unregister_fab("ghost");
        reg.unregister_zone("ghost");
        reg.release_zone("ghost");
        reg.occupy_zone("ghost", "fab-1");
        assert!(reg.get_zones().is_empty());
    }

    #[test]
    fn register_fab_is_idempotent() {
        let reg = registry();
        reg.register_fab(fab("fab-1"));
        reg.register_fab(FabDescriptor::new("fab-1", "renamed", "icon2"));
        let fabs = reg.get_registered_fabs();
        assert_eq!(fabs.len(), 1);
        assert_eq!(fabs[0].label, "renamed");
    }

    #[test]
    fn registry_changed_broadcast_on_membership_change() {
        let bus = DockBus::new();
        let rx = bus.subscribe();
        let reg = DockRegistry::new(bus, PositionStore::in_memory());

        reg.register_fab(fab("fab-1"));
        reg.register_fab(fab("fab-1")); // descriptor update, no broadcast
        reg.register_fab(fab("fab-2"));
        reg.unregister_fab("fab-1");

        assert_eq!(
            rx.drain(),
            vec![
                DockEvent::RegistryChanged { count: 1 },
                DockEvent::RegistryChanged { count: 2 },
                DockEvent::RegistryChanged { count: 1 },
            ]
        );
    }

    #[test]
    fn snap_flags_write_through_to_store() {
        let store = PositionStore::in_memory();
        let reg = DockRegistry::new(DockBus::new(), store.clone());
        reg.register_fab(fab("fab-1"));

        reg.set_snapped("fab-1", true, Some("rail-0"));
        assert_eq!(store.load_snap("fab-1"), Some(SnapFlag::to_zone("rail-0")));
        assert_eq!(reg.get_snapped_zone_id("fab-1").as_deref(), Some("rail-0"));
        assert!(reg.is_snapped_to_rail("fab-1"));

        reg.set_snapped("fab-1", false, None);
        assert_eq!(store.load_snap("fab-1"), Some(SnapFlag::free()));
        assert_eq!(reg.get_snapped_zone_id("fab-1"), None);
    }

    #[test]
    fn snap_flags_seed_from_store_on_register() {
        let store = PositionStore::in_memory();
        store
            .save_snap("fab-1", &SnapFlag::to_zone("fab-tray-slot-2"))
            .unwrap();

        // Fresh registry, same store: the reload path.
        let reg = DockRegistry::new(DockBus::new(), store);
        reg.register_fab(fab("fab-1"));
        assert_eq!(
            reg.get_snapped_zone_id("fab-1").as_deref(),
            Some("fab-tray-slot-2")
        );
        assert!(!reg.is_snapped_to_rail("fab-1"));
        assert_eq!(reg.get_snapped_fabs(), vec!["fab-1".to_owned()]);
    }

    #[test]
    fn ensure_zone_is_noop_when_zone_exists() {
        let reg = registry();
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        reg.ensure_zone("rail-0");
        assert_eq!(reg.get_zone("rail-0").unwrap().rect.width, 48.0);
    }

    #[test]
    fn get_snap_position_centers_widget() {
        let reg = registry();
        reg.register_zone("rail-0", RectF::new(0.0, 0.0, 48.0, 48.0));
        let zone = reg.get_zone("rail-0").unwrap();
        assert_eq!(reg.get_snap_position(&zone, 48.0), Point::new(0.0, 0.0));
        assert_eq!(reg.get_snap_position(&zone, 24.0), Point::new(12.0, 12.0));
    }

    proptest! {
        // find_snap_zone returns None iff no free, measured zone has its
        // center within the threshold (checked against a naive scan).
        #[test]
        fn find_snap_zone_matches_naive_scan(
            zones in proptest::collection::vec((0.0f32..800.0, 0.0f32..800.0), 0..6),
            px in 0.0f32..800.0,
            py in 0.0f32..800.0,
        ) {
            let reg = registry();
            for (i, (x, y)) in zones.iter().enumerate() {
                reg.register_zone(&format!("z-{i}"), RectF::new(*x, *y, 48.0, 48.0));
            }

            let expected = zones
                .iter()
                .map(|(x, y)| Point::new(x + 24.0, y + 24.0).distance(Point::new(px, py)))
                .fold(f32::INFINITY, f32::min);

            let hit = reg.find_snap_zone(px, py, "fab-1");
            prop_assert_eq!(hit.is_some(), expected <= SNAP_THRESHOLD);
            if let Some(zone) = hit {
                let d = zone.rect.center().distance(Point::new(px, py));
                prop_assert!((d - expected).abs() < 1e-3);
            }
        }
    }
}
