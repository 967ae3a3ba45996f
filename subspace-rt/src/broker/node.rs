//! The component broker: a scoped service and event bus node.
//!
//! One root broker exists per zone host; every arena owns a child broker
//! whose parent is the root. Interface lookup falls through to the parent
//! chain on a local miss, so arena-scoped consumers see zone-wide services
//! while arena-local registrations shadow them. Callback publish never
//! bubbles: firing on a broker notifies that broker's subscribers only.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::callbacks::{Callback, CallbackFn, CallbackRegistry};
use super::error::BrokerError;
use super::kind::{ServiceApi, ServiceKind};
use super::services::{ErasedService, ServiceRef, ServiceRegistry};

/// A scoped service/event bus node with an optional parent.
///
/// # Lookup Semantics
///
/// - **Interfaces inherit**: `get_service` searches this scope first, then
///   walks up the parent chain. A child registration shadows the parent's
///   provider for consumers resolving through the child. Registrations
///   made on a parent after the child was created are visible to the
///   child, because the chain is walked at lookup time.
/// - **Callbacks are local**: the publisher chooses the scope by choosing
///   the broker to fire on; there is no automatic bubbling.
///
/// # Example
///
/// ```rust,ignore
/// let root = Broker::root();
/// let arena = Broker::child("arena:0", &root);
///
/// root.register_service::<dyn Chat>(chat_provider, None)?;
/// // Resolving through the arena falls through to the root.
/// let chat = arena.get_service::<dyn Chat>(None).unwrap();
/// ```
pub struct Broker {
    label: String,
    parent: Option<Arc<Broker>>,
    services: ServiceRegistry,
    callbacks: CallbackRegistry,
}

impl Broker {
    /// Create the process-global root broker.
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            label: "root".to_string(),
            parent: None,
            services: ServiceRegistry::new(),
            callbacks: CallbackRegistry::new(),
        })
    }

    /// Create a child broker scoped under `parent`.
    pub fn child(label: impl Into<String>, parent: &Arc<Broker>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            parent: Some(Arc::clone(parent)),
            services: ServiceRegistry::new(),
            callbacks: CallbackRegistry::new(),
        })
    }

    /// Diagnostic label of this scope (`root` or the arena name).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Parent broker, if this is not the root.
    pub fn parent(&self) -> Option<&Arc<Broker>> {
        self.parent.as_ref()
    }

    /// Install a provider for `(I::KIND, key)` at this scope.
    ///
    /// Registering here while a parent scope holds a provider for the same
    /// entry is permitted and shadows the parent for consumers resolving
    /// through this broker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AlreadyRegistered`] if a provider for the
    /// same `(kind, key)` already exists at **this** scope.
    pub fn register_service<I: ServiceApi + ?Sized>(
        &self,
        provider: Arc<I>,
        key: Option<&str>,
    ) -> Result<(), BrokerError> {
        self.services.register::<I>(provider, key)
    }

    /// Unregister a provider at this scope.
    ///
    /// Returns the outstanding-reference count through
    /// [`BrokerError::InterfaceBusy`] when non-zero; the provider then
    /// stays installed. When the unregistration succeeds and a parent
    /// scope still holds a provider for the same entry, the previously
    /// shadowed provider resurfaces; this is logged as a warning so the
    /// succession is visible.
    pub fn unregister_service<I: ServiceApi + ?Sized>(
        &self,
        provider: &Arc<I>,
        key: Option<&str>,
    ) -> Result<(), BrokerError> {
        self.services.unregister::<I>(provider, key)?;
        if let Some(parent) = &self.parent {
            if parent.lookup_outstanding(I::KIND, key).is_some() {
                tracing::warn!(
                    scope = %self.label,
                    kind = %I::KIND,
                    key = ?key,
                    "unregistered a shadowing provider; previously shadowed provider is still registered at a parent scope"
                );
            }
        }
        Ok(())
    }

    /// Acquire the winning provider for `(I::KIND, key)`.
    ///
    /// Searches this scope first, then the parent chain. Increments the
    /// reference count of the provider actually returned; dropping the
    /// [`ServiceRef`] releases it.
    pub fn get_service<I: ServiceApi + ?Sized>(&self, key: Option<&str>) -> Option<ServiceRef<I>> {
        match self.services.get::<I>(key) {
            Some(service) => Some(service),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| parent.get_service::<I>(key)),
        }
    }

    /// Acquire the winning provider for a kind given as a value.
    ///
    /// The value-keyed counterpart of [`Broker::get_service`], used by
    /// manifest resolution. Same chain-walking and reference semantics.
    pub fn get_service_erased(
        &self,
        kind: ServiceKind,
        key: Option<&str>,
    ) -> Option<ErasedService> {
        match self.services.get_erased(kind, key) {
            Some(service) => Some(service),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| parent.get_service_erased(kind, key)),
        }
    }

    /// Outstanding-reference count for the current provider at this scope
    /// or, on a local miss, the nearest parent scope that has one.
    pub fn lookup_outstanding(&self, kind: ServiceKind, key: Option<&str>) -> Option<usize> {
        match self.services.outstanding(kind, key) {
            Some(count) => Some(count),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| parent.lookup_outstanding(kind, key)),
        }
    }

    /// Number of providers installed directly at this scope.
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Subscribe a handler to callback kind `C` at this scope.
    pub fn register_callback<C: Callback>(&self, handler: &CallbackFn<C>) {
        self.callbacks.register::<C>(handler);
    }

    /// Unsubscribe a handler from callback kind `C` at this scope.
    pub fn unregister_callback<C: Callback>(&self, handler: &CallbackFn<C>) {
        self.callbacks.unregister::<C>(handler);
    }

    /// Fire callback kind `C` at this scope only.
    ///
    /// Subscribers at parent or child scopes are not notified; the
    /// publisher picks the audience by picking the broker.
    pub fn fire<C: Callback>(&self, args: &C::Args) {
        self.callbacks.fire::<C>(args);
    }

    /// Number of subscribers for callback kind `C` at this scope.
    pub fn subscriber_count<C: Callback>(&self) -> usize {
        self.callbacks.subscriber_count::<C>()
    }

    /// Tear this scope down.
    ///
    /// Unregisters remaining providers in reverse registration order
    /// (logging outstanding references as leaks) and drops all callback
    /// subscriptions. The parent is untouched.
    pub fn dispose(&self) {
        self.services.dispose(&self.label);
        self.callbacks.clear();
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("label", &self.label)
            .field("has_parent", &self.parent.is_some())
            .field("services", &self.services.len())
            .finish()
    }
}
