//! Broker error types with context.
//!
//! This module defines all error types that can occur during service
//! interface registration, lookup, and takedown on a component broker.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::kind::ServiceKind;

/// Broker error types with contextual information.
///
/// BrokerError represents the failure modes of the interface registry:
/// duplicate registrations at one scope, takedown while references are
/// outstanding, and unregistration of providers that are not installed.
///
/// # Design Principles
///
/// - **Contextual**: Each error variant includes relevant context for debugging
/// - **Structured**: Uses thiserror for automatic Error trait implementation
/// - **Type-Safe**: Strongly typed error variants with no string-only errors
///
/// # Example
///
/// ```rust
/// use subspace_rt::broker::{BrokerError, ServiceKind};
///
/// let error = BrokerError::AlreadyRegistered {
///     kind: ServiceKind::new("chat"),
///     key: None,
/// };
/// assert!(error.to_string().contains("already registered"));
/// ```
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A provider for this `(kind, key)` already exists at this scope.
    ///
    /// Parent scopes may hold their own provider for the same kind (the
    /// child shadows the parent at lookup time); only a same-scope
    /// duplicate is rejected.
    #[error("Interface already registered at this scope: kind={kind}, key={key:?}")]
    AlreadyRegistered {
        /// The service kind that collided
        kind: ServiceKind,
        /// The disambiguation key, if any
        key: Option<String>,
    },

    /// The provider cannot be unregistered while references are outstanding.
    ///
    /// The provider stays installed. The caller is expected to retry after
    /// the holders release their handles, or to diagnose the leak.
    #[error(
        "Interface busy: kind={kind}, key={key:?}, outstanding references={outstanding}"
    )]
    InterfaceBusy {
        /// The service kind that is still referenced
        kind: ServiceKind,
        /// The disambiguation key, if any
        key: Option<String>,
        /// The current outstanding-reference count
        outstanding: usize,
    },

    /// No matching provider is installed at this scope.
    ///
    /// Returned when unregistering a `(kind, key)` that has no current
    /// provider here, or whose current provider is a different instance
    /// than the one passed in.
    #[error("Interface not registered at this scope: kind={kind}, key={key:?}")]
    NotRegistered {
        /// The service kind that was requested
        kind: ServiceKind,
        /// The disambiguation key, if any
        key: Option<String>,
    },
}
