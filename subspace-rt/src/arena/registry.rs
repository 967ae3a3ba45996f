//! Arena registry: lifecycle of arena scopes and their slot walks.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::error::ArenaError;
use super::record::Arena;
use crate::broker::{Broker, ServiceApi, ServiceKind};
use crate::slots::error::SlotError;
use crate::slots::hooks::SlotHooks;
use crate::slots::key::SlotKey;
use crate::slots::table::SlotTable;
use crate::util::ArenaName;

/// Registry of running arenas.
///
/// Owns the per-arena slot table with the same population guarantees as
/// the player registry: every running arena holds a value for every live
/// arena slot.
///
/// Destroying an arena disposes its broker scope. The caller is expected
/// to detach all modules from the arena first (the module manager's
/// `detach_all_from_arena`); any services still registered on the arena
/// broker at that point are logged as leaks by the disposal.
pub struct ArenaRegistry {
    root: Arc<Broker>,
    slots: SlotTable,
    inner: Mutex<HashMap<ArenaName, Arc<Arena>>>,
}

impl ArenaRegistry {
    /// Create an empty registry scoped under the given root broker.
    pub fn new(root: Arc<Broker>, slot_capacity: usize) -> Self {
        Self {
            root,
            slots: SlotTable::new("arena", slot_capacity),
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Create an arena, populating every live arena slot.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::AlreadyExists`] when the name is taken.
    /// - [`ArenaError::Slot`] when a slot factory panicked; the arena is
    ///   not created.
    pub fn create_arena(&self, name: ArenaName) -> Result<Arc<Arena>, ArenaError> {
        let mut map = self.inner.lock();
        if map.contains_key(&name) {
            return Err(ArenaError::AlreadyExists(name));
        }
        let arena = Arc::new(Arena::new(name.clone(), &self.root));

        let live = self.slots.live();
        for (position, (index, hooks)) in live.iter().enumerate() {
            if !arena.extra_data().populate(*index, hooks) {
                for (earlier_index, earlier_hooks) in &live[..position] {
                    if let Some(value) = arena.extra_data().remove(*earlier_index) {
                        earlier_hooks.release_value(value);
                    }
                }
                return Err(SlotError::FactoryFailed {
                    type_name: hooks.type_name(),
                }
                .into());
            }
        }

        map.insert(name.clone(), Arc::clone(&arena));
        tracing::info!(arena = %name, "arena created");
        Ok(arena)
    }

    /// Destroy an arena: release every slot value and dispose its broker.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotFound`] when no arena has this name.
    pub fn destroy_arena(&self, name: &ArenaName) -> Result<Arc<Arena>, ArenaError> {
        let mut map = self.inner.lock();
        let arena = map
            .remove(name)
            .ok_or_else(|| ArenaError::NotFound(name.clone()))?;
        for (index, hooks) in self.slots.live() {
            if let Some(value) = arena.extra_data().remove(index) {
                hooks.release_value(value);
            }
        }
        arena.broker().dispose();
        tracing::info!(arena = %name, "arena destroyed");
        Ok(arena)
    }

    /// Look up a running arena.
    pub fn get(&self, name: &ArenaName) -> Option<Arc<Arena>> {
        self.inner.lock().get(name).map(Arc::clone)
    }

    /// Snapshot of all running arenas.
    pub fn arenas(&self) -> Vec<Arc<Arena>> {
        self.inner.lock().values().map(Arc::clone).collect()
    }

    /// Number of running arenas.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether no arenas are running.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Allocate a per-arena slot and populate every running arena.
    ///
    /// # Errors
    ///
    /// - [`SlotError::Exhausted`] when the arena slot table is full.
    /// - [`SlotError::FactoryFailed`] when the factory panicked; the
    ///   allocation is rolled back completely.
    pub fn allocate_data<T: Send + Sync + 'static>(
        &self,
        hooks: SlotHooks<T>,
    ) -> Result<SlotKey<T>, SlotError> {
        let map = self.inner.lock();
        let (key, erased) = self.slots.allocate(hooks)?;

        let mut populated: Vec<Arc<Arena>> = Vec::new();
        for arena in map.values() {
            if arena.extra_data().populate(key.index(), &erased) {
                populated.push(Arc::clone(arena));
            } else {
                for done in &populated {
                    if let Some(value) = done.extra_data().remove(key.index()) {
                        erased.release_value(value);
                    }
                }
                let _ = self.slots.free(key.index());
                return Err(SlotError::FactoryFailed {
                    type_name: erased.type_name(),
                });
            }
        }
        Ok(key)
    }

    /// Free a per-arena slot, releasing the value on every running arena.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::UnknownKey`] when the key is not live.
    pub fn free_data<T: Send + Sync + 'static>(
        &self,
        key: SlotKey<T>,
    ) -> Result<(), SlotError> {
        let map = self.inner.lock();
        let hooks = self.slots.free(key.index())?;
        for arena in map.values() {
            if let Some(value) = arena.extra_data().remove(key.index()) {
                hooks.release_value(value);
            }
        }
        Ok(())
    }

    /// Number of live per-arena slots.
    pub fn live_slot_count(&self) -> usize {
        self.slots.live_count()
    }
}

impl ServiceApi for ArenaRegistry {
    const KIND: ServiceKind = ServiceKind::new("subspace.arena-registry");
}
