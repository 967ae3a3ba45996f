// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Stable identity of a module kind.
///
/// A module name is the fully-qualified name of the module type, e.g.
/// `subspace_chat::ChatModule`. It identifies the kind in the module
/// manager's registry and in the load-order list; at most one instance of
/// a given name is loaded at a time.
///
/// # Example
/// ```rust
/// use subspace_rt::util::ModuleName;
///
/// let name = ModuleName::new("subspace_chat::ChatModule");
/// assert_eq!(name.as_str(), "subspace_chat::ChatModule");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a module name from its fully-qualified kind name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModuleName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier for a loaded module instance.
///
/// # Performance
/// Uses UUID v4 for globally unique identifiers with excellent collision
/// resistance. Implements cheap cloning via Copy trait.
///
/// # Example
/// ```rust
/// use subspace_rt::util::ModuleInstanceId;
///
/// let id1 = ModuleInstanceId::new();
/// let id2 = ModuleInstanceId::new();
/// assert_ne!(id1, id2); // Globally unique
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleInstanceId(Uuid);

impl ModuleInstanceId {
    /// Generate a new random ModuleInstanceId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create ModuleInstanceId from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ModuleInstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ModuleInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense integer identifier for a connected player.
///
/// # Design
/// Player ids are small integers handed out by the player registry and
/// recycled after a configurable reuse delay, so consumers can use them
/// as array indexes without unbounded growth.
///
/// # Example
/// ```rust
/// use subspace_rt::util::PlayerId;
///
/// let pid = PlayerId::new(3);
/// assert_eq!(pid.index(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Create a player id from its raw index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw index of this player id.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid={}", self.0)
    }
}

/// Name of an arena (a gameplay room scoped under the zone).
///
/// # Example
/// ```rust
/// use subspace_rt::util::ArenaName;
///
/// let pub0 = ArenaName::new("0");
/// let duel = ArenaName::new("duel");
/// assert_ne!(pub0, duel);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArenaName(String);

impl ArenaName {
    /// Create an arena name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ArenaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArenaName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
