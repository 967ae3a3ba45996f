//! Module load-state machine.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Load state of a module.
///
/// # State Transitions
///
/// ```text
/// Registered ──load──▶ Loaded ──post_load──▶ PostLoaded
///     ▲                  │                       │
///     │                  │                  pre_unload
///     │                  ▼                       ▼
///     └───unload──── (removed) ◀──unload──── Loaded
/// ```
///
/// `Registered` means the kind is known to the manager but no instance is
/// loaded. Arena attachment is orthogonal: an attached-set tags a module
/// in `Loaded` or `PostLoaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// The kind is registered; no instance is loaded.
    Registered,
    /// The instance loaded successfully and holds its dependencies.
    Loaded,
    /// The instance completed the post-load phase.
    PostLoaded,
}

impl ModuleState {
    /// Whether an instance is loaded (in `Loaded` or `PostLoaded`).
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModuleState::Loaded | ModuleState::PostLoaded)
    }
}

impl Default for ModuleState {
    fn default() -> Self {
        Self::Registered
    }
}
