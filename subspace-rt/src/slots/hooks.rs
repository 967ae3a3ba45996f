//! Slot value hooks: factory, reset, and release.
//!
//! Every slot carries a factory (how to build a fresh value for a new or
//! existing entity), an optional reset hook (run when an entity is
//! recycled), and an optional release hook (run when an entity is
//! destroyed or the slot is freed). Hooks are user code and are isolated
//! from the runtime: a panicking hook is caught at the boundary.

// Layer 1: Standard library imports
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

type AnyValue = Box<dyn Any + Send + Sync>;

/// Typed construction/teardown hooks for one slot.
///
/// # Example
///
/// ```rust
/// use subspace_rt::slots::SlotHooks;
///
/// #[derive(Default)]
/// struct Counters {
///     sent: u32,
/// }
///
/// let hooks = SlotHooks::new(Counters::default)
///     .on_reset(|c: &mut Counters| c.sent = 0);
/// # let _ = hooks;
/// ```
pub struct SlotHooks<T> {
    factory: Box<dyn Fn() -> T + Send + Sync>,
    reset: Option<Box<dyn Fn(&mut T) + Send + Sync>>,
    release: Option<Box<dyn Fn(T) + Send + Sync>>,
}

impl<T: Send + Sync + 'static> SlotHooks<T> {
    /// Create hooks with the given value factory.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            reset: None,
            release: None,
        }
    }

    /// Set the reset hook, run when an owning entity is recycled.
    pub fn on_reset(mut self, reset: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Set the release hook, run when an owning entity is destroyed or the
    /// slot itself is freed.
    pub fn on_release(mut self, release: impl Fn(T) + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub(crate) fn erase(self) -> ErasedHooks {
        let factory = self.factory;
        let reset = self.reset;
        let release = self.release;
        ErasedHooks {
            type_name: std::any::type_name::<T>(),
            factory: Box::new(move || Box::new(factory()) as AnyValue),
            reset: Box::new(move |value: &mut AnyValue| {
                if let (Some(reset), Some(value)) = (reset.as_ref(), value.downcast_mut::<T>()) {
                    reset(value);
                }
            }),
            release: Box::new(move |value: AnyValue| {
                if let (Some(release), Ok(value)) = (release.as_ref(), value.downcast::<T>()) {
                    release(*value);
                }
            }),
        }
    }
}

impl<T: Default + Send + Sync + 'static> Default for SlotHooks<T> {
    /// Hooks whose factory is `T::default`, with no reset or release.
    fn default() -> Self {
        Self::new(T::default)
    }
}

/// Type-erased hooks stored in the slot table.
pub(crate) struct ErasedHooks {
    type_name: &'static str,
    factory: Box<dyn Fn() -> AnyValue + Send + Sync>,
    reset: Box<dyn Fn(&mut AnyValue) + Send + Sync>,
    release: Box<dyn Fn(AnyValue) + Send + Sync>,
}

impl ErasedHooks {
    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Build a fresh value. Returns `None` if the factory panicked.
    pub(crate) fn make_value(&self) -> Option<AnyValue> {
        match catch_unwind(AssertUnwindSafe(|| (self.factory)())) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::error!(value_type = self.type_name, "slot factory panicked");
                None
            }
        }
    }

    /// Run the reset hook against a live value. Panics are caught and
    /// logged; the value keeps whatever state the hook left behind.
    pub(crate) fn reset_value(&self, value: &mut AnyValue) {
        let result = catch_unwind(AssertUnwindSafe(|| (self.reset)(value)));
        if result.is_err() {
            tracing::error!(value_type = self.type_name, "slot reset hook panicked");
        }
    }

    /// Run the release hook, consuming the value. Panics are caught and
    /// logged; the value is dropped either way.
    pub(crate) fn release_value(&self, value: AnyValue) {
        let result = catch_unwind(AssertUnwindSafe(|| (self.release)(value)));
        if result.is_err() {
            tracing::error!(value_type = self.type_name, "slot release hook panicked");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_factory_builds_typed_value() {
        let hooks = SlotHooks::new(|| 41u32).erase();
        let value = hooks.make_value().unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 41);
    }

    #[test]
    fn test_reset_hook_runs_against_value() {
        let hooks = SlotHooks::new(|| 5u32).on_reset(|v| *v = 0).erase();
        let mut value = hooks.make_value().unwrap();
        hooks.reset_value(&mut value);
        assert_eq!(*value.downcast::<u32>().unwrap(), 0);
    }

    #[test]
    fn test_release_hook_consumes_value() {
        let released = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&released);
        let hooks = SlotHooks::new(|| 9u32)
            .on_release(move |v| {
                counter.fetch_add(v, Ordering::SeqCst);
            })
            .erase();
        let value = hooks.make_value().unwrap();
        hooks.release_value(value);
        assert_eq!(released.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_factory_panic_is_contained() {
        let hooks = SlotHooks::<u32>::new(|| panic!("factory exploded")).erase();
        assert!(hooks.make_value().is_none());
    }

    #[test]
    fn test_default_hooks_use_default_value() {
        let hooks = SlotHooks::<u32>::default().erase();
        let value = hooks.make_value().unwrap();
        assert_eq!(*value.downcast::<u32>().unwrap(), 0);
    }
}
