#![forbid(unsafe_code)]

//! Durable position storage: one key per widget id over a pluggable
//! key-value backend.
//!
//! The position record for widget `w` lives under key `w` as JSON
//! `{"x":..,"y":..}`; the snap flag lives under the parallel key `w.snap`
//! as `{"snapped":..,"zoneId":..}`. Keeping the two apart lets raw
//! coordinates and snap state evolve independently: coordinates only mean
//! anything for free-floating widgets.
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: a missing, unreadable, or corrupt value
//!    loads as `None`, never an error to the caller.
//! 2. **Atomic writes**: [`FileBackend`] persists with a write-rename so a
//!    crash mid-save cannot corrupt the document.
//! 3. Save failures surface as [`StoreError`] for the caller to log; they
//!    never panic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from storage operations.
#[derive(Debug)]
pub enum StoreError {
    /// I/O failure reading or writing the backing file.
    Io(std::io::Error),
    /// JSON encode/decode failure.
    Serde(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::Serde(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Serde(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A persisted free-floating position (top-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedPosition {
    pub x: f32,
    pub y: f32,
}

/// A persisted snap flag, kept out-of-band from the position blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapFlag {
    /// Whether the widget was snapped to a zone when last committed.
    pub snapped: bool,
    /// The zone id, present iff `snapped`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

impl SnapFlag {
    /// A snap to the given zone.
    pub fn to_zone(zone_id: impl Into<String>) -> Self {
        Self {
            snapped: true,
            zone_id: Some(zone_id.into()),
        }
    }

    /// The free-floating (not snapped) flag.
    pub fn free() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// A string key-value backend. Deliberately shaped like a browser's local
/// storage so hosts can adapt one directly.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// File-backed backend: the whole key-value map as one JSON document,
/// written atomically (write to a sibling temp file, then rename).
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileBackend {
    /// Open (or create) the document at `path`.
    ///
    /// A missing file starts empty; a corrupt file is logged and also
    /// starts empty rather than failing the session.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt position store; starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PositionStore
// ---------------------------------------------------------------------------

fn snap_key(id: &str) -> String {
    format!("{id}.snap")
}

/// Shared handle to the durable store. Cloning shares the backend.
pub struct PositionStore {
    backend: Rc<RefCell<dyn StorageBackend>>,
}

impl Clone for PositionStore {
    fn clone(&self) -> Self {
        Self {
            backend: Rc::clone(&self.backend),
        }
    }
}

impl fmt::Debug for PositionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionStore").finish_non_exhaustive()
    }
}

impl PositionStore {
    /// Wrap a backend in a shared handle.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Rc::new(RefCell::new(backend)),
        }
    }

    /// Convenience: a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Load a widget's persisted free position. Missing or corrupt values
    /// load as `None`.
    pub fn load_position(&self, id: &str) -> Option<PersistedPosition> {
        let raw = match self.backend.borrow().get(id) {
            Ok(v) => v?,
            Err(e) => {
                debug!(fab = id, error = %e, "position load failed; using default");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(pos) => Some(pos),
            Err(e) => {
                debug!(fab = id, error = %e, "corrupt position record; using default");
                None
            }
        }
    }

    /// Persist a widget's free position.
    pub fn save_position(&self, id: &str, pos: PersistedPosition) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&pos)?;
        self.backend.borrow_mut().set(id, &raw)
    }

    /// Load a widget's snap flag. Missing or corrupt values load as `None`.
    pub fn load_snap(&self, id: &str) -> Option<SnapFlag> {
        let key = snap_key(id);
        let raw = match self.backend.borrow().get(&key) {
            Ok(v) => v?,
            Err(e) => {
                debug!(fab = id, error = %e, "snap flag load failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(flag) => Some(flag),
            Err(e) => {
                debug!(fab = id, error = %e, "corrupt snap flag; ignoring");
                None
            }
        }
    }

    /// Persist a widget's snap flag.
    pub fn save_snap(&self, id: &str, flag: &SnapFlag) -> Result<(), StoreError> {
        let raw = serde_json::to_string(flag)?;
        self.backend.borrow_mut().set(&snap_key(id), &raw)
    }

    /// Remove a widget's records (position and snap flag).
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut backend = self.backend.borrow_mut();
        backend.remove(id)?;
        backend.remove(&snap_key(id))
    }
}
