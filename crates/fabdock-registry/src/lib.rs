#![forbid(unsafe_code)]

//! State layer: the shared dock registry and the durable position store.
//!
//! # Role in fabdock
//! `fabdock-registry` is the single source of truth for "which floating
//! widgets exist, which dock zones exist, and who occupies what", plus the
//! local key-value persistence behind widget positions and snap flags.
//!
//! # Primary responsibilities
//! - **DockRegistry**: widget descriptors, zones in registration order,
//!   occupancy, snap-flag bookkeeping, nearest-zone search.
//! - **PositionStore**: pluggable key-value persistence (`MemoryBackend`,
//!   `FileBackend`) with fail-soft loads.
//!
//! # How it fits in the system
//! Every controller in `fabdock-runtime` holds a cloned [`DockRegistry`]
//! handle; mutations are synchronous and immediately observable through
//! any handle. The registry is an injected service object, never a
//! module-level singleton.

pub mod registry;
pub mod store;

pub use registry::{
    DockRegistry, DockZone, FabDescriptor, SNAP_THRESHOLD, TRAY_SLOT_PREFIX, tray_slot_id,
};
pub use store::{
    FileBackend, MemoryBackend, PersistedPosition, PositionStore, SnapFlag, StorageBackend,
    StoreError,
};
