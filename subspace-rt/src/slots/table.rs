//! The slot table: dense key allocation and hook storage.
//!
//! One table exists per entity family (one for players, one for arenas).
//! Allocation and free are module load/unload-boundary operations, not a
//! hot path; the table is guarded by a short mutex critical section, and
//! concurrent allocations serialize on it.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::error::SlotError;
use super::hooks::{ErasedHooks, SlotHooks};
use super::key::SlotKey;

/// Dense table of live slots for one entity family.
///
/// # Invariants
///
/// - Keys are dense: allocation picks the smallest unused index, and an
///   index is reused only after an explicit free.
/// - The table never exceeds its configured capacity; allocation beyond it
///   fails with [`SlotError::Exhausted`].
pub struct SlotTable {
    family: &'static str,
    capacity: usize,
    hooks: Mutex<Vec<Option<Arc<ErasedHooks>>>>,
}

impl SlotTable {
    /// Create an empty table for the named entity family.
    pub fn new(family: &'static str, capacity: usize) -> Self {
        Self {
            family,
            capacity,
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Allocate the smallest unused key and store the slot's hooks.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Exhausted`] when the table is at capacity.
    pub(crate) fn allocate<T: Send + Sync + 'static>(
        &self,
        hooks: SlotHooks<T>,
    ) -> Result<(SlotKey<T>, Arc<ErasedHooks>), SlotError> {
        let erased = Arc::new(hooks.erase());
        let mut table = self.hooks.lock();
        let index = match table.iter().position(Option::is_none) {
            Some(free) => free,
            None if table.len() < self.capacity => {
                table.push(None);
                table.len() - 1
            }
            None => {
                return Err(SlotError::Exhausted {
                    capacity: self.capacity,
                })
            }
        };
        table[index] = Some(Arc::clone(&erased));
        tracing::debug!(
            family = self.family,
            index,
            value_type = erased.type_name(),
            "allocated extra-data slot"
        );
        Ok((SlotKey::new(index), erased))
    }

    /// Remove a slot's hooks, making its key available for reuse.
    ///
    /// Returns the removed hooks so the caller can run the release walk
    /// over all owning entities.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::UnknownKey`] when the key is not live.
    pub(crate) fn free(&self, index: usize) -> Result<Arc<ErasedHooks>, SlotError> {
        let mut table = self.hooks.lock();
        let slot = table
            .get_mut(index)
            .ok_or(SlotError::UnknownKey { index })?;
        let hooks = slot.take().ok_or(SlotError::UnknownKey { index })?;
        tracing::debug!(
            family = self.family,
            index,
            value_type = hooks.type_name(),
            "freed extra-data slot"
        );
        Ok(hooks)
    }

    /// Snapshot of all live slots in ascending key order.
    pub(crate) fn live(&self) -> Vec<(usize, Arc<ErasedHooks>)> {
        self.hooks
            .lock()
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|h| (index, Arc::clone(h))))
            .collect()
    }

    /// Whether the key currently names a live slot.
    pub fn is_live(&self, index: usize) -> bool {
        self.hooks
            .lock()
            .get(index)
            .is_some_and(Option::is_some)
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.hooks.lock().iter().filter(|s| s.is_some()).count()
    }

    /// The configured capacity of this table.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
