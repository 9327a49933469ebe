use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use tracing::debug;

use crate::container::descriptor::SharedInstance;
use crate::container::key::Key;
use crate::errors::CoreError;

/// Lifetime policy for resolved instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// New instance created for each resolution
    Prototype,
    /// Single instance shared for the container's lifetime
    Singleton,
}

impl Scope {
    /// Check if the scope is singleton
    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }

    /// Check if the scope is prototype
    pub fn is_prototype(&self) -> bool {
        matches!(self, Scope::Prototype)
    }

    /// Get the scope name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Prototype => "prototype",
            Scope::Singleton => "singleton",
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Prototype
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prototype" => Ok(Scope::Prototype),
            "singleton" => Ok(Scope::Singleton),
            _ => Err(CoreError::configuration(format!("invalid scope: {}", s))),
        }
    }
}

/// Per-key cell holding a singleton slot and its construction lock.
///
/// The slot is write-once; the lock serializes first-time construction for
/// one key without touching any other key.
#[derive(Debug, Default)]
struct SingletonCell {
    value: OnceLock<SharedInstance>,
    build: Mutex<()>,
}

/// Cache of singleton-scoped instances, one write-once cell per key.
///
/// `get_or_create` guarantees at-most-once construction per key under
/// concurrent first-time requests: the cell map is locked only long enough to
/// find or insert the cell, and construction itself runs under the cell's own
/// lock so unrelated keys never serialize. A failed construction caches
/// nothing; the next caller retries.
#[derive(Debug, Default)]
pub struct SingletonCache {
    cells: RwLock<HashMap<Key, Arc<SingletonCell>>>,
}

impl SingletonCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached instance for a key, if construction already completed
    pub fn get(&self, key: &Key) -> Option<SharedInstance> {
        let cells = self.cells.read().ok()?;
        cells.get(key)?.value.get().cloned()
    }

    /// Return the cached instance for `key`, constructing it with `build` if
    /// absent. Construction runs under the key's own lock; concurrent callers
    /// for the same key observe exactly one successful `build` invocation.
    pub fn get_or_create<F>(&self, key: &Key, build: F) -> Result<SharedInstance, CoreError>
    where
        F: FnOnce() -> Result<SharedInstance, CoreError>,
    {
        let cell = self.cell(key)?;
        if let Some(existing) = cell.value.get() {
            debug!(key = %key, "singleton cache hit");
            return Ok(existing.clone());
        }

        let _guard = cell
            .build
            .lock()
            .map_err(|_| CoreError::lock_poisoned(format!("singleton cell for {}", key)))?;
        // Re-check under the lock: another thread may have finished first.
        if let Some(existing) = cell.value.get() {
            debug!(key = %key, "singleton cache hit");
            return Ok(existing.clone());
        }

        let instance = build()?;
        let _ = cell.value.set(instance.clone());
        debug!(key = %key, "singleton constructed and cached");
        Ok(instance)
    }

    /// Number of keys with a completed singleton instance
    pub fn cached_count(&self) -> usize {
        self.cells
            .read()
            .map(|cells| {
                cells
                    .values()
                    .filter(|cell| cell.value.get().is_some())
                    .count()
            })
            .unwrap_or(0)
    }

    fn cell(&self, key: &Key) -> Result<Arc<SingletonCell>, CoreError> {
        {
            let cells = self
                .cells
                .read()
                .map_err(|_| CoreError::lock_poisoned("singleton cells"))?;
            if let Some(cell) = cells.get(key) {
                return Ok(cell.clone());
            }
        }
        let mut cells = self
            .cells
            .write()
            .map_err(|_| CoreError::lock_poisoned("singleton cells"))?;
        Ok(cells.entry(key.clone()).or_default().clone())
    }
}
