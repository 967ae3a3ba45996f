//! Interface registry: scoped service providers with reference counting.
//!
//! Maps `(ServiceKind, optional key)` to the current provider at one broker
//! scope. Lookups are read-dominated, so the registry uses a shared-read /
//! exclusive-write lock; reference counts are atomic and tolerate
//! get/release pairs ordered across threads.

// Layer 1: Standard library imports
use std::any::Any;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::RwLock;

// Layer 3: Internal module imports
use super::error::BrokerError;
use super::kind::{ServiceApi, ServiceKind};

/// One installed provider and its outstanding-reference counter.
///
/// The slot outlives its registry entry: handles taken before the provider
/// was replaced or unregistered keep the slot alive and release against it,
/// so release ordering stays correct even across shadowing.
pub(crate) struct ProviderSlot {
    kind: ServiceKind,
    key: Option<String>,
    /// Type-erased `Arc<I>` of the provider.
    provider: Arc<dyn Any + Send + Sync>,
    refs: AtomicUsize,
}

impl ProviderSlot {
    fn acquire(self: &Arc<Self>) -> ServiceHandle {
        self.refs.fetch_add(1, Ordering::AcqRel);
        ServiceHandle {
            slot: Arc::clone(self),
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }
}

/// Type-erased RAII handle to an acquired provider.
///
/// Holding a `ServiceHandle` keeps the provider's reference count
/// non-zero; dropping it is the release. The handle refers to the exact
/// provider it was acquired from, so a release stays correct even if that
/// provider has since been shadowed or replaced at its broker.
pub struct ServiceHandle {
    slot: Arc<ProviderSlot>,
}

impl ServiceHandle {
    /// The kind this handle was acquired for.
    pub fn kind(&self) -> ServiceKind {
        self.slot.kind
    }

    /// The disambiguation key this handle was acquired for.
    pub fn key(&self) -> Option<&str> {
        self.slot.key.as_deref()
    }

    /// Downcast the held provider to its interface type.
    ///
    /// Returns `None` if `I` is not the type the provider was registered
    /// under.
    pub fn downcast<I: ServiceApi + ?Sized>(&self) -> Option<Arc<I>> {
        self.slot.provider.downcast_ref::<Arc<I>>().cloned()
    }
}

impl Clone for ServiceHandle {
    fn clone(&self) -> Self {
        self.slot.acquire()
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.slot.refs.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("kind", &self.slot.kind)
            .field("key", &self.slot.key)
            .field("outstanding", &self.slot.outstanding())
            .finish()
    }
}

/// Typed RAII handle to an acquired provider.
///
/// Dereferences to the interface and releases the reference count on drop.
///
/// # Example
///
/// ```rust,ignore
/// let chat: ServiceRef<dyn Chat> = broker.get_service::<dyn Chat>(None)?;
/// chat.send_arena_message(&arena, "hello");
/// drop(chat); // releases the reference
/// ```
pub struct ServiceRef<I: ?Sized> {
    service: Arc<I>,
    handle: ServiceHandle,
}

impl<I: ?Sized> ServiceRef<I> {
    /// The kind this reference was acquired for.
    pub fn kind(&self) -> ServiceKind {
        self.handle.kind()
    }

    /// The disambiguation key this reference was acquired for.
    pub fn key(&self) -> Option<&str> {
        self.handle.key()
    }

    /// Clone the inner provider `Arc`.
    ///
    /// The clone does not carry the reference count; the count is released
    /// when the `ServiceRef` itself is dropped.
    pub fn service(&self) -> Arc<I> {
        Arc::clone(&self.service)
    }
}

impl<I: ?Sized> Deref for ServiceRef<I> {
    type Target = I;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

impl<I: ?Sized> Clone for ServiceRef<I> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            handle: self.handle.clone(),
        }
    }
}

/// A provider acquired by kind value rather than by interface type.
///
/// Produced during manifest resolution, where the requested kinds are data.
/// Carries the reference-counting handle and can be downcast to the typed
/// interface by the constructor that receives it.
pub struct ErasedService {
    any: Arc<dyn Any + Send + Sync>,
    handle: ServiceHandle,
}

impl ErasedService {
    /// The kind this service was acquired for.
    pub fn kind(&self) -> ServiceKind {
        self.handle.kind()
    }

    /// The disambiguation key this service was acquired for.
    pub fn key(&self) -> Option<&str> {
        self.handle.key()
    }

    /// Downcast to the typed interface `Arc`.
    pub fn downcast<I: ServiceApi + ?Sized>(&self) -> Option<Arc<I>> {
        self.any.downcast_ref::<Arc<I>>().cloned()
    }

    /// Give up the typed payload, keeping only the reference-count guard.
    pub fn into_handle(self) -> ServiceHandle {
        self.handle
    }
}

type EntryKey = (ServiceKind, Option<String>);

struct ServiceTable {
    current: HashMap<EntryKey, Arc<ProviderSlot>>,
    /// Registration order, for reverse-order disposal.
    order: Vec<Arc<ProviderSlot>>,
}

/// Scoped interface registry of one broker.
///
/// # Contracts
///
/// - At most one provider per `(kind, key)` directly at this scope;
///   a same-scope duplicate fails with [`BrokerError::AlreadyRegistered`].
/// - `get` increments the winning provider's reference count; the returned
///   handle releases it on drop.
/// - `unregister` only unlinks when the outstanding count is zero,
///   otherwise it reports the count via [`BrokerError::InterfaceBusy`] and
///   the provider stays installed.
/// - Disposal unregisters providers in reverse registration order and logs
///   any remaining non-zero reference counts as leaks.
pub struct ServiceRegistry {
    inner: RwLock<ServiceTable>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ServiceTable {
                current: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Install a provider for `(I::KIND, key)` at this scope.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AlreadyRegistered`] if a provider for the
    /// same `(kind, key)` is already installed here.
    pub fn register<I: ServiceApi + ?Sized>(
        &self,
        provider: Arc<I>,
        key: Option<&str>,
    ) -> Result<(), BrokerError> {
        let entry_key = (I::KIND, key.map(str::to_owned));
        let mut table = self.inner.write();
        if table.current.contains_key(&entry_key) {
            return Err(BrokerError::AlreadyRegistered {
                kind: I::KIND,
                key: key.map(str::to_owned),
            });
        }
        let slot = Arc::new(ProviderSlot {
            kind: I::KIND,
            key: key.map(str::to_owned),
            provider: Arc::new(provider),
            refs: AtomicUsize::new(0),
        });
        table.current.insert(entry_key, Arc::clone(&slot));
        table.order.push(slot);
        Ok(())
    }

    /// Acquire the current provider for `(I::KIND, key)` at this scope.
    ///
    /// Increments the provider's reference count. Returns `None` when no
    /// provider is installed here or when the installed provider is not of
    /// type `I` (a kind collision, which indicates a misdeclared kind).
    pub fn get<I: ServiceApi + ?Sized>(&self, key: Option<&str>) -> Option<ServiceRef<I>> {
        let table = self.inner.read();
        let slot = table.current.get(&(I::KIND, key.map(str::to_owned)))?;
        let service = slot.provider.downcast_ref::<Arc<I>>().cloned()?;
        let handle = slot.acquire();
        Some(ServiceRef { service, handle })
    }

    /// Acquire the current provider for a kind given as a value.
    ///
    /// Used by manifest resolution, where the requested kind is data rather
    /// than a type parameter. Increments the reference count.
    pub fn get_erased(&self, kind: ServiceKind, key: Option<&str>) -> Option<ErasedService> {
        let table = self.inner.read();
        let slot = table.current.get(&(kind, key.map(str::to_owned)))?;
        let handle = slot.acquire();
        Some(ErasedService {
            any: Arc::clone(&slot.provider),
            handle,
        })
    }

    /// Unregister the given provider for `(I::KIND, key)`.
    ///
    /// Only unlinks when the provider's outstanding-reference count is
    /// zero.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotRegistered`] when no provider is installed for
    ///   the entry, or the installed provider is a different instance.
    /// - [`BrokerError::InterfaceBusy`] when references are outstanding;
    ///   the provider stays installed and the count is reported.
    pub fn unregister<I: ServiceApi + ?Sized>(
        &self,
        provider: &Arc<I>,
        key: Option<&str>,
    ) -> Result<(), BrokerError> {
        let entry_key = (I::KIND, key.map(str::to_owned));
        let mut table = self.inner.write();
        let slot = match table.current.get(&entry_key) {
            Some(slot) => Arc::clone(slot),
            None => {
                return Err(BrokerError::NotRegistered {
                    kind: I::KIND,
                    key: key.map(str::to_owned),
                })
            }
        };
        let same_instance = slot
            .provider
            .downcast_ref::<Arc<I>>()
            .is_some_and(|installed| Arc::ptr_eq(installed, provider));
        if !same_instance {
            return Err(BrokerError::NotRegistered {
                kind: I::KIND,
                key: key.map(str::to_owned),
            });
        }
        let outstanding = slot.outstanding();
        if outstanding != 0 {
            return Err(BrokerError::InterfaceBusy {
                kind: I::KIND,
                key: key.map(str::to_owned),
                outstanding,
            });
        }
        table.current.remove(&entry_key);
        table.order.retain(|s| !Arc::ptr_eq(s, &slot));
        Ok(())
    }

    /// Outstanding-reference count of the current provider, if one is
    /// installed.
    pub fn outstanding(&self, kind: ServiceKind, key: Option<&str>) -> Option<usize> {
        let table = self.inner.read();
        table
            .current
            .get(&(kind, key.map(str::to_owned)))
            .map(|slot| slot.outstanding())
    }

    /// Number of providers installed at this scope.
    pub fn len(&self) -> usize {
        self.inner.read().current.len()
    }

    /// Whether no providers are installed at this scope.
    pub fn is_empty(&self) -> bool {
        self.inner.read().current.is_empty()
    }

    /// Tear down the registry: unregister in reverse registration order.
    ///
    /// Providers with outstanding references are logged as leaks; their
    /// slots stay alive until the leaked handles drop, but the registry
    /// entry is removed regardless.
    pub fn dispose(&self, scope: &str) {
        let mut table = self.inner.write();
        let order = std::mem::take(&mut table.order);
        for slot in order.into_iter().rev() {
            let outstanding = slot.outstanding();
            if outstanding != 0 {
                tracing::warn!(
                    scope,
                    kind = %slot.kind,
                    key = ?slot.key,
                    outstanding,
                    "interface leaked at broker disposal"
                );
            }
            table
                .current
                .remove(&(slot.kind, slot.key.clone()));
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
