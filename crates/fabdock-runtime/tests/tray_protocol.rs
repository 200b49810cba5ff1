//! Tray open/measure/auto-close protocol driven together with real
//! widget controllers.

use std::time::{Duration, Instant};

use fabdock_core::bus::{DockBus, DockEvent};
use fabdock_core::geometry::{Point, RectF};
use fabdock_core::pointer::PointerEvent;
use fabdock_registry::registry::{DockRegistry, FabDescriptor};
use fabdock_registry::store::{PersistedPosition, PositionStore, SnapFlag};
use fabdock_runtime::{
    AUTO_CLOSE_DELAY, FRAME, FabConfig, FabController, SlotHost, TrayController,
};

const VIEWPORT: RectF = RectF::new(0.0, 0.0, 524.0, 524.0);
const TRANSITION: Duration = Duration::from_millis(200);
const SLOT_0: RectF = RectF::new(400.0, 10.0, 48.0, 48.0);

#[derive(Default)]
struct FixedSlots {
    slots: Vec<RectF>,
}

impl SlotHost for FixedSlots {
    fn force_resting_state(&mut self, _open: bool) {}

    fn measure_slot(&mut self, index: usize) -> RectF {
        self.slots.get(index).copied().unwrap_or_default()
    }

    fn clear_inline_styles(&mut self) {}

    fn transition_duration(&self) -> Duration {
        TRANSITION
    }
}

struct World {
    registry: DockRegistry,
    store: PositionStore,
    bus: DockBus,
}

impl World {
    fn new() -> Self {
        let bus = DockBus::new();
        let store = PositionStore::in_memory();
        let registry = DockRegistry::new(bus.clone(), store.clone());
        Self {
            registry,
            store,
            bus,
        }
    }

    fn fab(&self, id: &str) -> FabController {
        FabController::new(
            FabDescriptor::new(id, "Fab", "icon"),
            FabConfig::default(),
            VIEWPORT,
            self.registry.clone(),
            self.store.clone(),
            self.bus.clone(),
        )
    }

    fn tray(&self, slots: Vec<RectF>) -> TrayController<FixedSlots> {
        TrayController::new(FixedSlots { slots }, self.registry.clone(), self.bus.clone())
    }
}

fn settled(armed_at: Instant) -> Instant {
    armed_at + FRAME + TRANSITION
}

#[test]
fn drag_auto_opens_tray_and_slot_becomes_a_live_target() {
    let world = World::new();
    let mut fab = world.fab("fab-1");
    let t = Instant::now();
    fab.mount(t);
    let mut tray = world.tray(vec![SLOT_0]);
    let rx = world.bus.subscribe();

    // Crossing the drag threshold broadcasts the drag-start that opens
    // the tray.
    fab.on_pointer(&PointerEvent::down(468.0, 468.0), t);
    fab.on_pointer(&PointerEvent::moved(450.0, 450.0), t);
    let t1 = t + FRAME;
    tray.tick(t1);
    assert!(tray.is_open());
    assert!(!tray.is_user_opened());
    assert!(
        world.registry.get_zone("fab-tray-slot-0").is_none(),
        "no live slot before the settle window"
    );

    // While the tray is mid-transition a nearby pointer reports no zone.
    fab.on_pointer(&PointerEvent::moved(420.0, 30.0), t1);
    assert_eq!(fab.near_zone(), None);

    let ts = settled(t1);
    tray.tick(ts);
    fab.tick(ts);
    fab.on_pointer(&PointerEvent::moved(421.0, 31.0), ts);
    assert_eq!(fab.near_zone(), Some("fab-tray-slot-0"));
    assert!(
        rx.drain().iter().any(|e| matches!(
            e,
            DockEvent::NearSnapZone { zone_id: Some(id) } if id == "fab-tray-slot-0"
        )),
        "near-zone change is broadcast"
    );
}

#[test]
fn drop_into_slot_then_tray_close_hides_widget_with_flags_intact() {
    let world = World::new();
    let mut fab = world.fab("fab-1");
    let t = Instant::now();
    fab.mount(t);
    let mut tray = world.tray(vec![SLOT_0]);

    fab.on_pointer(&PointerEvent::down(468.0, 468.0), t);
    fab.on_pointer(&PointerEvent::moved(450.0, 450.0), t);
    let t1 = t + FRAME;
    tray.tick(t1);
    let ts = settled(t1);
    tray.tick(ts);
    fab.tick(ts);
    fab.on_pointer(&PointerEvent::up(420.0, 30.0), ts);

    assert_eq!(fab.position(), Point::new(400.0, 10.0));
    assert_eq!(
        world
            .registry
            .get_zone("fab-tray-slot-0")
            .unwrap()
            .occupied_by
            .as_deref(),
        Some("fab-1")
    );

    // The occupied slot suppresses the auto-close.
    tray.tick(ts + FRAME);
    tray.tick(ts + FRAME + AUTO_CLOSE_DELAY);
    assert!(tray.is_open());

    tray.close();
    fab.tick(ts + FRAME * 2 + AUTO_CLOSE_DELAY);
    assert!(fab.is_hidden(), "tray-docked widget hides with its tray");
    assert_eq!(
        world.store.load_snap("fab-1"),
        Some(SnapFlag::to_zone("fab-tray-slot-0")),
        "durable flag survives the close"
    );
    assert_eq!(
        world.store.load_position("fab-1"),
        Some(PersistedPosition { x: 400.0, y: 10.0 })
    );

    // Reopen: the next measure pass re-registers the slot and the widget
    // reclaims it.
    let tr = ts + Duration::from_secs(10);
    tray.open(tr, true);
    tray.tick(settled(tr));
    fab.tick(settled(tr));
    assert!(!fab.is_hidden());
    assert_eq!(fab.position(), Point::new(400.0, 10.0));
    assert_eq!(
        world
            .registry
            .get_zone("fab-tray-slot-0")
            .unwrap()
            .occupied_by
            .as_deref(),
        Some("fab-1")
    );
}

#[test]
fn unoccupied_auto_open_closes_after_the_grace_window() {
    let world = World::new();
    let mut fab = world.fab("fab-1");
    let t = Instant::now();
    fab.mount(t);
    let mut tray = world.tray(vec![SLOT_0]);

    // Drag that ends nowhere near the slot.
    fab.on_pointer(&PointerEvent::down(468.0, 468.0), t);
    fab.on_pointer(&PointerEvent::moved(450.0, 450.0), t);
    let t1 = t + FRAME;
    tray.tick(t1);
    let ts = settled(t1);
    tray.tick(ts);
    fab.on_pointer(&PointerEvent::up(100.0, 100.0), ts);

    tray.tick(ts + FRAME);
    assert!(tray.is_open(), "grace window still running");
    tray.tick(ts + FRAME + AUTO_CLOSE_DELAY);
    assert!(!tray.is_open());
    assert!(
        world.registry.get_zone("fab-tray-slot-0").is_none(),
        "close takes the slot zones with it"
    );
    assert_eq!(world.store.load_snap("fab-1"), Some(SnapFlag::free()));
}

#[test]
fn tray_docked_widget_restores_hidden_until_its_slot_is_measured() {
    let world = World::new();
    {
        let mut fab = world.fab("fab-1");
        let t = Instant::now();
        fab.mount(t);
        let mut tray = world.tray(vec![SLOT_0]);
        tray.open(t, true);
        tray.tick(settled(t));
        fab.tick(settled(t));
        fab.on_pointer(&PointerEvent::down(468.0, 468.0), settled(t));
        fab.on_pointer(&PointerEvent::moved(420.0, 30.0), settled(t));
        fab.on_pointer(&PointerEvent::up(420.0, 30.0), settled(t));
    }

    // Reload: fresh registry and controllers over the same store. The
    // tray starts closed, so the widget must stay hidden until a measure
    // pass gives its slot real geometry.
    let bus = DockBus::new();
    let registry = DockRegistry::new(bus.clone(), world.store.clone());
    let mut fab = FabController::new(
        FabDescriptor::new("fab-1", "Fab", "icon"),
        FabConfig::default(),
        VIEWPORT,
        registry.clone(),
        world.store.clone(),
        bus.clone(),
    );
    let t2 = Instant::now();
    fab.mount(t2);
    fab.tick(t2 + FRAME);
    assert!(fab.is_hidden());

    let mut tray = TrayController::new(
        FixedSlots {
            slots: vec![SLOT_0],
        },
        registry.clone(),
        bus.clone(),
    );

    tray.open(t2 + FRAME, true);
    tray.tick(settled(t2 + FRAME));
    fab.tick(settled(t2 + FRAME));
    assert!(!fab.is_hidden());
    assert_eq!(fab.position(), Point::new(400.0, 10.0));
}
