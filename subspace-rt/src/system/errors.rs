//! Host-level error types.

// Layer 1: Standard library
// (none)

// Layer 2: Third-party
use thiserror::Error;

// Layer 3: Internal
use crate::arena::ArenaError;
use crate::broker::BrokerError;
use crate::module::ModuleError;
use crate::slots::SlotError;

/// Failures surfaced by the zone host facade.
#[derive(Debug, Error)]
pub enum HostError {
    /// The configuration failed validation.
    #[error("Invalid host configuration: {0}")]
    Config(String),

    /// A module manager operation failed.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// An arena operation failed.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// A broker operation failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// A slot operation failed.
    #[error(transparent)]
    Slot(#[from] SlotError),
}
