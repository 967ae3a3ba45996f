//! Callback registry: named, typed, ordered pub/sub delivered synchronously.
//!
//! A callback kind is a unit type implementing [`Callback`], which fixes
//! the callback's name and its argument record. Subscribers register typed
//! handlers; publishers fire with a typed argument reference. Delivery is
//! synchronous on the publisher's execution context, local to the broker
//! the publisher chose.

// Layer 1: Standard library imports
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::RwLock;

// Layer 3: Internal module imports
// (none)

/// Contract of one named callback.
///
/// Publisher and subscribers agree on the argument record through the
/// `Args` associated type; the registry is keyed by `NAME`.
///
/// # Example
///
/// ```rust
/// use subspace_rt::broker::Callback;
///
/// pub struct PlayerEntered;
///
/// pub struct PlayerEnteredArgs {
///     pub player_name: String,
/// }
///
/// impl Callback for PlayerEntered {
///     const NAME: &'static str = "player_entered";
///     type Args = PlayerEnteredArgs;
/// }
/// ```
pub trait Callback: 'static {
    /// Name identity of the callback.
    const NAME: &'static str;

    /// The argument record passed to every subscriber.
    type Args: 'static;
}

/// Shared handler for a callback of kind `C`.
///
/// Handler identity (for idempotent registration and for unregistration)
/// is the identity of the `Arc` allocation, so keep the `Arc` you
/// registered if you intend to unregister later.
pub type CallbackFn<C> = Arc<dyn Fn(&<C as Callback>::Args) + Send + Sync>;

#[derive(Clone)]
struct Subscriber {
    /// Identity of the handler allocation, for set-like semantics.
    id: usize,
    /// Type-erased `CallbackFn<C>`.
    handler: Arc<dyn Any + Send + Sync>,
}

fn handler_id<C: Callback>(handler: &CallbackFn<C>) -> usize {
    Arc::as_ptr(handler) as *const () as usize
}

/// Ordered subscriber lists of one broker scope.
///
/// # Contracts
///
/// - Subscribers are invoked in registration order.
/// - Registering the same handler twice is idempotent.
/// - `fire` iterates a snapshot: subscribers may register or unregister
///   from within a handler without affecting the current dispatch.
/// - A panicking handler is caught and logged; the remaining handlers in
///   the snapshot still run.
pub struct CallbackRegistry {
    inner: RwLock<HashMap<&'static str, Vec<Subscriber>>>,
}

impl CallbackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe a handler to callback kind `C`.
    ///
    /// Idempotent: a handler already subscribed (same `Arc` identity) is
    /// stored once and keeps its original position.
    pub fn register<C: Callback>(&self, handler: &CallbackFn<C>) {
        let id = handler_id::<C>(handler);
        let mut map = self.inner.write();
        let list = map.entry(C::NAME).or_default();
        if list.iter().any(|s| s.id == id) {
            return;
        }
        list.push(Subscriber {
            id,
            handler: Arc::new(Arc::clone(handler)),
        });
    }

    /// Unsubscribe a handler from callback kind `C`.
    ///
    /// No-op when the handler is not subscribed.
    pub fn unregister<C: Callback>(&self, handler: &CallbackFn<C>) {
        let id = handler_id::<C>(handler);
        let mut map = self.inner.write();
        if let Some(list) = map.get_mut(C::NAME) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                map.remove(C::NAME);
            }
        }
    }

    /// Invoke all subscribers of `C` at this scope, in registration order.
    ///
    /// Runs synchronously on the caller's execution context against a
    /// snapshot of the subscriber list. A panic in one handler is caught
    /// and logged; subsequent handlers still run.
    pub fn fire<C: Callback>(&self, args: &C::Args) {
        let snapshot: Vec<Subscriber> = match self.inner.read().get(C::NAME) {
            Some(list) => list.clone(),
            None => return,
        };
        for subscriber in snapshot {
            let Some(handler) = subscriber.handler.downcast_ref::<CallbackFn<C>>() else {
                // A second callback kind reused the name with different
                // arguments; skip rather than deliver garbage.
                tracing::error!(
                    callback = C::NAME,
                    "subscriber argument type does not match fired callback"
                );
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| handler(args)));
            if result.is_err() {
                tracing::error!(callback = C::NAME, "callback handler panicked");
            }
        }
    }

    /// Number of subscribers for callback kind `C`.
    pub fn subscriber_count<C: Callback>(&self) -> usize {
        self.inner.read().get(C::NAME).map_or(0, Vec::len)
    }

    /// Drop every subscription at this scope.
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Tick;

    impl Callback for Tick {
        const NAME: &'static str = "test_tick";
        type Args = u32;
    }

    fn recording_handler(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> CallbackFn<Tick> {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |value: &u32| {
            log.lock().push(format!("{tag}:{value}"));
        })
    }

    #[test]
    fn test_fire_in_registration_order() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let h1 = recording_handler(&log, "h1");
        let h2 = recording_handler(&log, "h2");
        let h3 = recording_handler(&log, "h3");
        registry.register::<Tick>(&h1);
        registry.register::<Tick>(&h2);
        registry.register::<Tick>(&h3);

        registry.fire::<Tick>(&7);
        assert_eq!(*log.lock(), vec!["h1:7", "h2:7", "h3:7"]);
    }

    #[test]
    fn test_duplicate_registration_is_idempotent() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handler = recording_handler(&log, "h");
        registry.register::<Tick>(&handler);
        registry.register::<Tick>(&handler);
        assert_eq!(registry.subscriber_count::<Tick>(), 1);

        registry.fire::<Tick>(&1);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_unregister_removes_handler() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let h1 = recording_handler(&log, "h1");
        let h2 = recording_handler(&log, "h2");
        registry.register::<Tick>(&h1);
        registry.register::<Tick>(&h2);
        registry.unregister::<Tick>(&h1);

        registry.fire::<Tick>(&2);
        assert_eq!(*log.lock(), vec!["h2:2"]);
    }

    #[test]
    fn test_unregister_unknown_handler_is_noop() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recording_handler(&log, "h");
        registry.unregister::<Tick>(&handler);
        assert_eq!(registry.subscriber_count::<Tick>(), 0);
    }

    #[test]
    fn test_fire_with_no_subscribers_is_noop() {
        let registry = CallbackRegistry::new();
        registry.fire::<Tick>(&1);
    }

    #[test]
    fn test_unsubscribe_within_dispatch_does_not_affect_current_fire() {
        let registry = Arc::new(CallbackRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        // h1 unregisters h2 mid-dispatch; h2 must still run this round.
        let h2 = recording_handler(&log, "h2");
        let h1: CallbackFn<Tick> = {
            let registry = Arc::clone(&registry);
            let log = Arc::clone(&log);
            let h2 = Arc::clone(&h2);
            Arc::new(move |value: &u32| {
                log.lock().push(format!("h1:{value}"));
                registry.unregister::<Tick>(&h2);
            })
        };
        registry.register::<Tick>(&h1);
        registry.register::<Tick>(&h2);

        registry.fire::<Tick>(&3);
        assert_eq!(*log.lock(), vec!["h1:3", "h2:3"]);

        // The unsubscription takes effect for the next fire.
        log.lock().clear();
        registry.fire::<Tick>(&4);
        assert_eq!(*log.lock(), vec!["h1:4"]);
    }

    #[test]
    fn test_subscribe_within_dispatch_does_not_affect_current_fire() {
        let registry = Arc::new(CallbackRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let late = recording_handler(&log, "late");
        let h1: CallbackFn<Tick> = {
            let registry = Arc::clone(&registry);
            let log = Arc::clone(&log);
            let late = Arc::clone(&late);
            Arc::new(move |value: &u32| {
                log.lock().push(format!("h1:{value}"));
                registry.register::<Tick>(&late);
            })
        };
        registry.register::<Tick>(&h1);

        registry.fire::<Tick>(&5);
        assert_eq!(*log.lock(), vec!["h1:5"]);

        log.lock().clear();
        registry.fire::<Tick>(&6);
        assert_eq!(*log.lock(), vec!["h1:6", "late:6"]);
    }

    #[test]
    fn test_panicking_handler_does_not_suppress_subsequent_handlers() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let panicking: CallbackFn<Tick> = Arc::new(|_: &u32| {
            panic!("handler exploded");
        });
        let h2 = recording_handler(&log, "h2");
        registry.register::<Tick>(&panicking);
        registry.register::<Tick>(&h2);

        registry.fire::<Tick>(&8);
        assert_eq!(*log.lock(), vec!["h2:8"]);
    }
}
