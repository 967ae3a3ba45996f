//! Service kinds: opaque value identities for interface contracts.
//!
//! A service kind names an abstract capability (a contract) without any
//! reliance on runtime type introspection. Each interface trait declares
//! its kind once via [`ServiceApi`]; the registry is keyed by the kind
//! value plus an optional disambiguation key.

// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Opaque identity of an interface contract.
///
/// Kinds form a closed, declared set: every interface trait that can be
/// published on a broker carries exactly one `ServiceKind`, assigned in its
/// [`ServiceApi`] implementation. Two traits must never share a kind name.
///
/// # Example
///
/// ```rust
/// use subspace_rt::broker::{ServiceApi, ServiceKind};
///
/// pub trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// impl ServiceApi for dyn Greeter {
///     const KIND: ServiceKind = ServiceKind::new("example.greeter");
/// }
///
/// assert_eq!(<dyn Greeter as ServiceApi>::KIND.name(), "example.greeter");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKind(&'static str);

impl ServiceKind {
    /// Declare a service kind with the given contract name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Get the contract name of this kind.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marker trait tying an interface type to its declared [`ServiceKind`].
///
/// Implemented for the trait-object type of each interface contract (e.g.
/// `dyn Chat`), or for a concrete service type when the service is a plain
/// struct. The broker's typed operations (`register_service`,
/// `get_service`, `unregister_service`) are generic over `I: ServiceApi +
/// ?Sized` and use `I::KIND` as the registry key.
///
/// Interface traits must be `Send + Sync` so their providers can be shared
/// across module threads.
pub trait ServiceApi: Send + Sync + 'static {
    /// The declared kind of this interface contract.
    const KIND: ServiceKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Probe: Send + Sync {
        fn value(&self) -> u32;
    }

    impl ServiceApi for dyn Probe {
        const KIND: ServiceKind = ServiceKind::new("test.probe");
    }

    #[test]
    fn test_kind_name() {
        let kind = ServiceKind::new("test.kind");
        assert_eq!(kind.name(), "test.kind");
        assert_eq!(format!("{kind}"), "test.kind");
    }

    #[test]
    fn test_kind_equality_is_by_name() {
        assert_eq!(ServiceKind::new("a"), ServiceKind::new("a"));
        assert_ne!(ServiceKind::new("a"), ServiceKind::new("b"));
    }

    #[test]
    fn test_trait_object_api() {
        assert_eq!(<dyn Probe as ServiceApi>::KIND.name(), "test.probe");
    }
}
