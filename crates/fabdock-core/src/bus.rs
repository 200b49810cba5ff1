#![forbid(unsafe_code)]

//! Coordination bus: typed broadcast events between sibling controllers.
//!
//! Floating widgets and the dock tray are mounted as independent UI trees
//! with no shared parent; [`DockBus`] is the only channel between them.
//! Hosts that embed the engine in a browser can mirror each event outward
//! as a DOM custom event; [`DockEvent::name`] supplies the conventional
//! event name for that bridge.
//!
//! # Delivery model
//!
//! Delivery is queued, never re-entrant: [`DockBus::publish`] clones the
//! event into a per-subscriber queue and returns; each subscriber drains
//! its [`BusReceiver`] on its own schedule (controllers drain once per
//! tick). Publish order is preserved per receiver. Dropping a receiver
//! unsubscribes it; dead queues are pruned lazily on the next publish.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::trace;

/// A broadcast event on the coordination channel.
///
/// The variants carry exactly the payloads a host needs to mirror each
/// event outward; see [`name`](Self::name) for the wire names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockEvent {
    /// A widget's gesture crossed the drag threshold.
    DragStart { fab_id: String },
    /// A widget's drag session ended (commit or cancel).
    DragEnd { fab_id: String },
    /// The dragging widget's nearest eligible zone changed.
    NearSnapZone { zone_id: Option<String> },
    /// The tray opened or closed (or is mounting/unmounting).
    TrayStateChange {
        open: bool,
        unmounting: bool,
        mounting: bool,
    },
    /// Zone geometry changed; re-read it now.
    SnapZonesUpdated,
    /// The set of registered widgets changed.
    RegistryChanged { count: usize },
}

impl DockEvent {
    /// The wire name of this event, for hosts bridging to a DOM
    /// custom-event surface.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            DockEvent::DragStart { .. } => "fabDragStart",
            DockEvent::DragEnd { .. } => "fabDragEnd",
            DockEvent::NearSnapZone { .. } => "fabNearSnapZone",
            DockEvent::TrayStateChange { .. } => "fabTrayStateChange",
            DockEvent::SnapZonesUpdated => "fabSnapZoneUpdated",
            DockEvent::RegistryChanged { .. } => "fabRegistryChanged",
        }
    }
}

type Queue = Rc<RefCell<VecDeque<DockEvent>>>;

struct BusInner {
    queues: Vec<Weak<RefCell<VecDeque<DockEvent>>>>,
}

/// Shared pub/sub handle. Cloning creates another handle to the same bus.
pub struct DockBus {
    inner: Rc<RefCell<BusInner>>,
}

impl Clone for DockBus {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for DockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DockBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockBus")
            .field("receivers", &self.inner.borrow().queues.len())
            .finish()
    }
}

impl DockBus {
    /// Create a new, empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner { queues: Vec::new() })),
        }
    }

    /// Subscribe to the bus. The receiver's queue collects every event
    /// published after this call until the receiver is dropped.
    #[must_use]
    pub fn subscribe(&self) -> BusReceiver {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        self.inner.borrow_mut().queues.push(Rc::downgrade(&queue));
        BusReceiver { queue }
    }

    /// Broadcast an event to every live receiver.
    pub fn publish(&self, event: DockEvent) {
        trace!(event = event.name(), "bus publish");
        let mut inner = self.inner.borrow_mut();
        inner.queues.retain(|w| w.strong_count() > 0);
        for weak in &inner.queues {
            if let Some(queue) = weak.upgrade() {
                queue.borrow_mut().push_back(event.clone());
            }
        }
    }

    /// Number of live receivers (dead ones may linger until the next
    /// publish prunes them).
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.inner
            .borrow()
            .queues
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

/// One subscriber's queue of pending events. Dropping it unsubscribes.
pub struct BusReceiver {
    queue: Queue,
}

impl std::fmt::Debug for BusReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusReceiver")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}

impl BusReceiver {
    /// Take all pending events, in publish order.
    pub fn drain(&self) -> Vec<DockEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Take the next pending event, if any.
    pub fn try_next(&self) -> Option<DockEvent> {
        self.queue.borrow_mut().pop_front()
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_all_receivers_in_order() {
        let bus = DockBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(DockEvent::DragStart {
            fab_id: "fab-1".into(),
        });
        bus.publish(DockEvent::SnapZonesUpdated);

        for rx in [&a, &b] {
            let events = rx.drain();
            assert_eq!(events.len(), 2);
            assert!(matches!(events[0], DockEvent::DragStart { .. }));
            assert_eq!(events[1], DockEvent::SnapZonesUpdated);
        }
    }

    #[test]
    fn drain_empties_the_queue() {
        let bus = DockBus::new();
        let rx = bus.subscribe();
        bus.publish(DockEvent::SnapZonesUpdated);
        assert_eq!(rx.drain().len(), 1);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn dropped_receiver_is_pruned() {
        let bus = DockBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.publish(DockEvent::SnapZonesUpdated);
        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = DockBus::new();
        bus.publish(DockEvent::SnapZonesUpdated);
        let rx = bus.subscribe();
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn clone_shares_the_same_bus() {
        let bus = DockBus::new();
        let rx = bus.subscribe();
        bus.clone().publish(DockEvent::RegistryChanged { count: 3 });
        assert_eq!(rx.drain(), vec![DockEvent::RegistryChanged { count: 3 }]);
    }

    #[test]
    fn wire_names_are_preserved() {
        assert_eq!(
            DockEvent::DragStart { fab_id: "x".into() }.name(),
            "fabDragStart"
        );
        assert_eq!(DockEvent::DragEnd { fab_id: "x".into() }.name(), "fabDragEnd");
        assert_eq!(
            DockEvent::NearSnapZone { zone_id: None }.name(),
            "fabNearSnapZone"
        );
        assert_eq!(
            DockEvent::TrayStateChange {
                open: true,
                unmounting: false,
                mounting: false
            }
            .name(),
            "fabTrayStateChange"
        );
        assert_eq!(DockEvent::SnapZonesUpdated.name(), "fabSnapZoneUpdated");
        assert_eq!(
            DockEvent::RegistryChanged { count: 0 }.name(),
            "fabRegistryChanged"
        );
    }
}
