//! Observable module information.

// Layer 1: Standard library imports
use std::path::PathBuf;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::Serialize;

// Layer 3: Internal module imports
use super::state::ModuleState;
use crate::util::{ArenaName, ModuleInstanceId, ModuleName};

/// Snapshot of one module as seen from outside the manager.
///
/// Registered-but-not-loaded kinds report `state == Registered` with no
/// instance id; loaded modules carry their instance id, load time, and
/// attached arenas.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    /// Stable kind identity.
    pub name: ModuleName,
    /// Human-readable description from the kind registration.
    pub description: String,
    /// Current load state.
    pub state: ModuleState,
    /// Whether the module came from an isolated plug-in package.
    pub is_plugin: bool,
    /// The plug-in package path, for plug-in modules.
    pub package_path: Option<PathBuf>,
    /// Arenas the module is currently attached to.
    pub attached_arenas: Vec<ArenaName>,
    /// Instance id, present while loaded.
    pub instance_id: Option<ModuleInstanceId>,
    /// When the instance finished loading, present while loaded.
    pub loaded_at: Option<DateTime<Utc>>,
}
