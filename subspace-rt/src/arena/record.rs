//! The arena record.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use crate::broker::Broker;
use crate::slots::ExtraData;
use crate::util::ArenaName;

/// A running arena.
///
/// An arena **is** a broker scope: it owns a child broker parented to the
/// zone's root, so services registered here shadow zone-wide providers for
/// arena-scoped consumers, and callbacks fired here reach arena-scoped
/// subscribers only. It also carries an extra-data area for per-arena
/// module state.
pub struct Arena {
    name: ArenaName,
    broker: Arc<Broker>,
    extra: ExtraData,
    created_at: DateTime<Utc>,
}

impl Arena {
    pub(crate) fn new(name: ArenaName, root: &Arc<Broker>) -> Self {
        let broker = Broker::child(format!("arena:{name}"), root);
        Self {
            name,
            broker,
            extra: ExtraData::new(),
            created_at: Utc::now(),
        }
    }

    /// The arena's name.
    pub fn name(&self) -> &ArenaName {
        &self.name
    }

    /// The arena's broker scope.
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// This arena's extra-data area.
    pub fn extra_data(&self) -> &ExtraData {
        &self.extra
    }

    /// When this arena was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("name", &self.name)
            .field("broker", &self.broker.label())
            .finish()
    }
}
