//! Arena registry error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::slots::SlotError;
use crate::util::ArenaName;

/// Failure modes of arena creation and teardown.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// An arena with this name is already running.
    #[error("Arena already exists: {0}")]
    AlreadyExists(ArenaName),

    /// No arena with this name is running.
    #[error("Arena not found: {0}")]
    NotFound(ArenaName),

    /// A slot operation failed while populating or tearing down the arena.
    #[error(transparent)]
    Slot(#[from] SlotError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_display() {
        let error = ArenaError::AlreadyExists(ArenaName::new("0"));
        assert!(error.to_string().contains("already exists"));
    }

    #[test]
    fn test_slot_error_converts() {
        let error: ArenaError = SlotError::Exhausted { capacity: 4 }.into();
        assert!(matches!(error, ArenaError::Slot(_)));
    }
}
