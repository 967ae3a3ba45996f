//! Player connection pipeline states.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Coarse state of a player in the connection pipeline.
///
/// Consumers use this for filtering (e.g. "every player at least
/// `Playing`"); the ordering of the variants follows the pipeline, so the
/// derived `Ord` makes such filters cheap.
///
/// # State Progression
///
/// ```text
/// Uninitialized -> Connecting -> NeedAuth -> Connected
///   -> NeedGlobalSync -> DoGlobalCallbacks -> SendLoginResponse
///   -> DoArenaSync -> ArenaRespAndCbs -> Playing
///   -> LeavingArena -> LeavingZone -> FreeServerResources
/// ```
///
/// A player leaving one arena for another drops back from `LeavingArena`
/// to `DoArenaSync`; everything past `Playing` is on the way out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PlayerState {
    /// Fresh player object, nothing negotiated yet.
    Uninitialized,
    /// Connection handshake in progress.
    Connecting,
    /// Waiting on authentication.
    NeedAuth,
    /// Authenticated and connected at the zone level.
    Connected,
    /// Waiting for global persistent data to sync in.
    NeedGlobalSync,
    /// Global callbacks are being delivered.
    DoGlobalCallbacks,
    /// Login response is being assembled and sent.
    SendLoginResponse,
    /// Waiting for arena-scoped data to sync in.
    DoArenaSync,
    /// Arena response and arena callbacks are being delivered.
    ArenaRespAndCbs,
    /// Fully in an arena and playing.
    Playing,
    /// Leaving the current arena.
    LeavingArena,
    /// Leaving the zone entirely.
    LeavingZone,
    /// Final teardown of server-side resources.
    FreeServerResources,
}

impl PlayerState {
    /// Whether the player has completed zone-level login.
    pub fn is_connected(&self) -> bool {
        *self >= PlayerState::Connected && *self < PlayerState::LeavingZone
    }

    /// Whether the player is fully inside an arena.
    pub fn is_playing(&self) -> bool {
        *self == PlayerState::Playing
    }

    /// Whether the player is on the way out of the zone.
    pub fn is_leaving(&self) -> bool {
        *self >= PlayerState::LeavingZone
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::Uninitialized
    }
}
