//! The player record.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::state::PlayerState;
use crate::slots::ExtraData;
use crate::util::PlayerId;

/// A connected player.
///
/// From the runtime's perspective a player is opaque except for its id,
/// its coarse pipeline state, and its extra-data area. Everything else a
/// module wants to know about a player lives in a slot that module
/// allocated.
pub struct Player {
    id: PlayerId,
    name: String,
    state: Mutex<PlayerState>,
    extra: ExtraData,
    connected_at: DateTime<Utc>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            state: Mutex::new(PlayerState::Uninitialized),
            extra: ExtraData::new(),
            connected_at: Utc::now(),
        }
    }

    /// The player's id. Dense and recyclable; stable while connected.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// The player's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current pipeline state.
    pub fn state(&self) -> PlayerState {
        *self.state.lock()
    }

    /// Move the player to a new pipeline state.
    pub fn set_state(&self, state: PlayerState) {
        let mut current = self.state.lock();
        tracing::trace!(player = %self.id, from = ?*current, to = ?state, "player state change");
        *current = state;
    }

    /// This player's extra-data area.
    pub fn extra_data(&self) -> &ExtraData {
        &self.extra
    }

    /// When this player object was created.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
