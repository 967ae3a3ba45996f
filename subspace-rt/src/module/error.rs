//! Module manager error types with context.
//!
//! Every failure a caller can see at the module-manager boundary is a
//! variant here. Panics raised inside user-provided code (constructors,
//! lifecycle entry points) are caught at the boundary and converted to the
//! matching variant; they never poison the manager's state.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::traits::ModuleFault;
use crate::util::{ArenaName, ModuleName};

/// Module manager error types.
///
/// # Example
///
/// ```rust
/// use subspace_rt::module::ModuleError;
/// use subspace_rt::util::ModuleName;
///
/// let error = ModuleError::ModuleNotFound {
///     name: ModuleName::new("missing::Module"),
/// };
/// assert!(error.to_string().contains("missing::Module"));
/// ```
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The identity did not resolve to a registered module kind.
    #[error("Module not found: {name}")]
    ModuleNotFound {
        /// The requested module name
        name: ModuleName,
    },

    /// A plug-in export under this name is not constructible as a module.
    #[error("Not a module: {name}")]
    NotAModule {
        /// The requested module name
        name: ModuleName,
    },

    /// A module kind with this name is already registered.
    #[error("Module kind already registered: {name}")]
    AlreadyRegistered {
        /// The colliding module name
        name: ModuleName,
    },

    /// A module with this name is already loaded.
    #[error("Module already loaded: {name}")]
    AlreadyLoaded {
        /// The loaded module's name
        name: ModuleName,
    },

    /// The module is not currently loaded.
    #[error("Module not loaded: {name}")]
    NotLoaded {
        /// The requested module name
        name: ModuleName,
    },

    /// No constructor candidate could be satisfied from the root broker.
    #[error("Missing dependencies for {name}: {candidates} constructor candidate(s) considered")]
    MissingDependencies {
        /// The module that could not be constructed
        name: ModuleName,
        /// How many constructor candidates were considered
        candidates: usize,
    },

    /// The module kind declares no constructor candidates.
    #[error("No constructor declared for module kind: {name}")]
    NoConstructor {
        /// The module kind with no candidates
        name: ModuleName,
    },

    /// The module's constructor returned an error or panicked.
    #[error("Construction failed for {name}")]
    ConstructionFailed {
        /// The module that failed to construct
        name: ModuleName,
        /// The constructor's failure, if it returned one (a panic carries
        /// no source)
        #[source]
        source: Option<ModuleFault>,
    },

    /// The module's load entry point reported failure or panicked.
    #[error("Load failed for {name}")]
    LoadFailed {
        /// The module that failed to load
        name: ModuleName,
        /// The entry point's failure, if it returned one
        #[source]
        source: Option<ModuleFault>,
    },

    /// The module's pre-unload or unload entry point reported failure or
    /// panicked.
    #[error("Unload failed for {name}")]
    UnloadFailed {
        /// The module that failed to unload
        name: ModuleName,
        /// The entry point's failure, if it returned one
        #[source]
        source: Option<ModuleFault>,
    },

    /// The module cannot unload while arenas remain attached.
    #[error("Module {name} is still attached to {} arena(s)", arenas.len())]
    StillAttached {
        /// The module that cannot unload
        name: ModuleName,
        /// The arenas still attached after the detach attempt
        arenas: Vec<ArenaName>,
    },

    /// The module does not support arena attachment.
    #[error("Module {name} does not support arena attachment")]
    AttachUnsupported {
        /// The module that lacks the capability
        name: ModuleName,
    },

    /// The module's attach entry point reported failure; the arena was not
    /// added to the attached-set.
    #[error("Attach failed: module={name}, arena={arena}")]
    AttachFailed {
        /// The module that refused the attachment
        name: ModuleName,
        /// The arena that was not attached
        arena: ArenaName,
        /// The entry point's failure, if it returned one
        #[source]
        source: Option<ModuleFault>,
    },

    /// The module's detach entry point reported failure; the attachment
    /// persists.
    #[error("Detach failed: module={name}, arena={arena}")]
    DetachFailed {
        /// The module that refused the detachment
        name: ModuleName,
        /// The arena that stays attached
        arena: ArenaName,
        /// The entry point's failure, if it returned one
        #[source]
        source: Option<ModuleFault>,
    },

    /// The isolated load context could not resolve the requested kind.
    #[error("Plug-in load failed for {name} from {path}")]
    PluginLoadFailed {
        /// The requested module name
        name: ModuleName,
        /// The plug-in package path
        path: String,
        /// The loader's failure, if it returned one
        #[source]
        source: Option<ModuleFault>,
    },

    /// The operation was cancelled mid-flight and rolled back.
    #[error("Operation cancelled for {name}")]
    Cancelled {
        /// The module whose operation was cancelled
        name: ModuleName,
    },
}
