//! Player registry: id recycling and slot population walks.

// Layer 1: Standard library imports
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::record::Player;
use super::state::PlayerState;
use crate::broker::{ServiceApi, ServiceKind};
use crate::slots::error::SlotError;
use crate::slots::hooks::SlotHooks;
use crate::slots::key::SlotKey;
use crate::slots::table::SlotTable;
use crate::util::PlayerId;

struct PlayerMap {
    players: HashMap<PlayerId, Arc<Player>>,
    /// Retired ids with their retirement time, oldest first.
    retired: VecDeque<(PlayerId, DateTime<Utc>)>,
    next_index: u32,
}

/// Registry of connected players.
///
/// Owns the player slot table: allocating a slot populates every
/// connected player, creating a player populates every live slot, and the
/// inverse walks run release hooks on free/destroy and reset hooks on
/// recycling. All walks happen under the registry's map lock, so a
/// consumer that obtained a key after allocation returned never observes
/// a player without a value.
///
/// # Id Recycling
///
/// Player ids are dense integers. A retired id becomes reusable only
/// after the configured reuse delay, so late packets and stale references
/// addressed to the old player cannot alias the new one.
pub struct PlayerRegistry {
    slots: SlotTable,
    reuse_delay: Duration,
    inner: Mutex<PlayerMap>,
}

impl PlayerRegistry {
    /// Create an empty registry.
    ///
    /// `reuse_delay` is how long a retired player id stays quarantined;
    /// `slot_capacity` bounds the player slot table.
    pub fn new(reuse_delay: Duration, slot_capacity: usize) -> Self {
        Self {
            slots: SlotTable::new("player", slot_capacity),
            reuse_delay,
            inner: Mutex::new(PlayerMap {
                players: HashMap::new(),
                retired: VecDeque::new(),
                next_index: 0,
            }),
        }
    }

    /// Create a player, populating every live slot.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::FactoryFailed`] when a slot factory panicked;
    /// the player is not created and no partial values remain.
    pub fn create_player(&self, name: impl Into<String>) -> Result<Arc<Player>, SlotError> {
        let mut map = self.inner.lock();
        let id = Self::pick_id(&mut map, self.reuse_delay);
        let player = Arc::new(Player::new(id, name.into()));

        let live = self.slots.live();
        for (position, (index, hooks)) in live.iter().enumerate() {
            if !player.extra_data().populate(*index, hooks) {
                for (earlier_index, earlier_hooks) in &live[..position] {
                    if let Some(value) = player.extra_data().remove(*earlier_index) {
                        earlier_hooks.release_value(value);
                    }
                }
                map.retired.push_back((id, Utc::now()));
                return Err(SlotError::FactoryFailed {
                    type_name: hooks.type_name(),
                });
            }
        }

        map.players.insert(id, Arc::clone(&player));
        tracing::debug!(player = %id, name = player.name(), "player created");
        Ok(player)
    }

    fn pick_id(
        map: &mut PlayerMap,
        reuse_delay: Duration,
    ) -> PlayerId {
        let now = Utc::now();
        if let Some((id, retired_at)) = map.retired.front().copied() {
            let reusable = (now - retired_at)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= reuse_delay);
            if reusable {
                map.retired.pop_front();
                return id;
            }
        }
        let id = PlayerId::new(map.next_index);
        map.next_index += 1;
        id
    }

    /// Destroy a player: release every slot value, retire the id.
    ///
    /// Returns the removed player, or `None` if the id is not connected.
    pub fn remove_player(&self, id: PlayerId) -> Option<Arc<Player>> {
        let mut map = self.inner.lock();
        let player = map.players.remove(&id)?;
        player.set_state(PlayerState::FreeServerResources);
        for (index, hooks) in self.slots.live() {
            if let Some(value) = player.extra_data().remove(index) {
                hooks.release_value(value);
            }
        }
        map.retired.push_back((id, Utc::now()));
        tracing::debug!(player = %id, "player removed");
        Some(player)
    }

    /// Recycle a player object for a new session: run every slot's reset
    /// hook in ascending key order and drop the pipeline state back to
    /// `Uninitialized`.
    pub fn recycle_player(&self, player: &Arc<Player>) {
        let _map = self.inner.lock();
        for (index, hooks) in self.slots.live() {
            player.extra_data().reset(index, &hooks);
        }
        player.set_state(PlayerState::Uninitialized);
    }

    /// Look up a connected player.
    pub fn get(&self, id: PlayerId) -> Option<Arc<Player>> {
        self.inner.lock().players.get(&id).map(Arc::clone)
    }

    /// Snapshot of all connected players.
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.inner.lock().players.values().map(Arc::clone).collect()
    }

    /// Number of connected players.
    pub fn len(&self) -> usize {
        self.inner.lock().players.len()
    }

    /// Whether no players are connected.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().players.is_empty()
    }

    /// Allocate a per-player slot and populate every connected player.
    ///
    /// # Errors
    ///
    /// - [`SlotError::Exhausted`] when the player slot table is full.
    /// - [`SlotError::FactoryFailed`] when the factory panicked; the
    ///   allocation is rolled back completely.
    pub fn allocate_data<T: Send + Sync + 'static>(
        &self,
        hooks: SlotHooks<T>,
    ) -> Result<SlotKey<T>, SlotError> {
        let map = self.inner.lock();
        let (key, erased) = self.slots.allocate(hooks)?;

        let mut populated: Vec<Arc<Player>> = Vec::new();
        for player in map.players.values() {
            if player.extra_data().populate(key.index(), &erased) {
                populated.push(Arc::clone(player));
            } else {
                for done in &populated {
                    if let Some(value) = done.extra_data().remove(key.index()) {
                        erased.release_value(value);
                    }
                }
                let _ = self.slots.free(key.index());
                return Err(SlotError::FactoryFailed {
                    type_name: erased.type_name(),
                });
            }
        }
        Ok(key)
    }

    /// Free a per-player slot, releasing the value on every player.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::UnknownKey`] when the key is not live.
    pub fn free_data<T: Send + Sync + 'static>(
        &self,
        key: SlotKey<T>,
    ) -> Result<(), SlotError> {
        let map = self.inner.lock();
        let hooks = self.slots.free(key.index())?;
        for player in map.players.values() {
            if let Some(value) = player.extra_data().remove(key.index()) {
                hooks.release_value(value);
            }
        }
        Ok(())
    }

    /// Number of live per-player slots.
    pub fn live_slot_count(&self) -> usize {
        self.slots.live_count()
    }
}

impl ServiceApi for PlayerRegistry {
    const KIND: ServiceKind = ServiceKind::new("subspace.player-registry");
}
