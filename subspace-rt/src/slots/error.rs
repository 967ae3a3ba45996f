//! Extra-data slot error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Failure modes of the extra-data slot system.
///
/// # Example
///
/// ```rust
/// use subspace_rt::slots::SlotError;
///
/// let error = SlotError::Exhausted { capacity: 64 };
/// assert!(error.to_string().contains("64"));
/// ```
#[derive(Debug, Error)]
pub enum SlotError {
    /// The slot table is full; no key can be allocated.
    #[error("Slot table exhausted: capacity={capacity}")]
    Exhausted {
        /// The configured table capacity
        capacity: usize,
    },

    /// The key does not name a live slot.
    #[error("Unknown slot key: index={index}")]
    UnknownKey {
        /// The raw key index
        index: usize,
    },

    /// The slot's value factory panicked while populating entities.
    ///
    /// The allocation is rolled back; no entity keeps a partial value.
    #[error("Slot factory panicked for value type {type_name}")]
    FactoryFailed {
        /// The slot's value type
        type_name: &'static str,
    },
}
