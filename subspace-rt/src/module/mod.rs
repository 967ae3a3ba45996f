//! Module runtime: discovery, lifecycle, phases, and arena attachment.
//!
//! A module is a unit of code with a stable identity that participates in
//! the zone's load lifecycle. The [`ModuleManager`] is the only writer of
//! load state: it constructs modules from their registered kinds (or from
//! isolated plug-in packages), resolves dependency manifests against the
//! root broker, runs the two-phase load/post-load lifecycle, and manages
//! the attach relation between modules and arenas.
//!
//! # Components
//!
//! - [`Module`] - The module contract (async entry points)
//! - [`ModuleCapabilities`] - Opt-in entry points beyond load/unload
//! - [`ModuleKind`] - A constructible kind with dependency manifests
//! - [`ModuleManager`] - The lifecycle engine
//! - [`ModuleState`] - The load-state machine
//! - [`ModuleInfo`] - Observable per-module snapshot
//! - [`plugin`] - Isolated plug-in load contexts
//! - [`ModuleError`] - Every boundary-visible failure
//!
//! # Lifecycle
//!
//! ```text
//! register_kind ─▶ load ─▶ (do_post_load | immediate post-load)
//!                                   │
//!            unload ◀─ pre-unload ◀─┘     (reverse load order in bulk)
//! ```
//!
//! # Modules
//!
//! - [`capabilities`]: The capability set
//! - [`error`]: Manager error types
//! - [`info`]: Observable module information
//! - [`kind`]: Kinds, manifests, and constructor candidates
//! - [`manager`]: The manager itself
//! - [`plugin`]: Plug-in contexts and their callbacks
//! - [`state`]: The load-state machine
//! - [`traits`]: The module contract

pub mod capabilities;
pub mod error;
pub mod info;
pub mod kind;
pub mod manager;
pub mod plugin;
pub mod state;
pub mod traits;

pub use capabilities::ModuleCapabilities;
pub use error::ModuleError;
pub use info::ModuleInfo;
pub use kind::{ConstructorCandidate, ModuleKind, ModuleKindBuilder, ServiceDependency, ServiceSet};
pub use manager::{ModuleManager, ModuleOrigin};
pub use plugin::{
    LibraryLoader, PluginContext, PluginContexts, PluginEventArgs, PluginLoaded, PluginLoader,
    PluginPackage, PluginUnloading, MODULE_EXPORTS_SYMBOL,
};
pub use state::ModuleState;
pub use traits::{Module, ModuleFault};
