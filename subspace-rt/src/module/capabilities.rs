//! Module lifecycle capability set.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// The lifecycle entry points a module opts into beyond load/unload.
///
/// The manager dispatches by inspecting this set rather than probing the
/// instance: a module that does not declare `arena_attach` can never be
/// attached, and the optional phase hooks are only invoked when declared.
///
/// # Example
///
/// ```rust
/// use subspace_rt::module::ModuleCapabilities;
///
/// const CAPS: ModuleCapabilities = ModuleCapabilities::NONE
///     .with_post_load()
///     .with_arena_attach();
///
/// assert!(CAPS.post_load());
/// assert!(!CAPS.pre_unload());
/// assert!(CAPS.arena_attach());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleCapabilities {
    post_load: bool,
    pre_unload: bool,
    arena_attach: bool,
}

impl ModuleCapabilities {
    /// Only the required load/unload entry points.
    pub const NONE: Self = Self {
        post_load: false,
        pre_unload: false,
        arena_attach: false,
    };

    /// Every optional entry point.
    pub const ALL: Self = Self {
        post_load: true,
        pre_unload: true,
        arena_attach: true,
    };

    /// Declare the post-load phase hook.
    pub const fn with_post_load(mut self) -> Self {
        self.post_load = true;
        self
    }

    /// Declare the pre-unload phase hook.
    pub const fn with_pre_unload(mut self) -> Self {
        self.pre_unload = true;
        self
    }

    /// Declare arena attach/detach support.
    pub const fn with_arena_attach(mut self) -> Self {
        self.arena_attach = true;
        self
    }

    /// Whether the post-load hook is declared.
    pub const fn post_load(&self) -> bool {
        self.post_load
    }

    /// Whether the pre-unload hook is declared.
    pub const fn pre_unload(&self) -> bool {
        self.pre_unload
    }

    /// Whether arena attachment is declared.
    pub const fn arena_attach(&self) -> bool {
        self.arena_attach
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_declares_nothing() {
        let caps = ModuleCapabilities::NONE;
        assert!(!caps.post_load());
        assert!(!caps.pre_unload());
        assert!(!caps.arena_attach());
        assert_eq!(caps, ModuleCapabilities::default());
    }

    #[test]
    fn test_all_declares_everything() {
        let caps = ModuleCapabilities::ALL;
        assert!(caps.post_load());
        assert!(caps.pre_unload());
        assert!(caps.arena_attach());
    }

    #[test]
    fn test_builders_compose() {
        let caps = ModuleCapabilities::NONE.with_pre_unload();
        assert!(caps.pre_unload());
        assert!(!caps.post_load());
    }
}
