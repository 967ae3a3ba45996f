//! Players: entity records, pipeline states, and the player registry.
//!
//! A player is opaque to the runtime apart from its dense recyclable id,
//! its coarse [`PlayerState`], and its extra-data area. The
//! [`PlayerRegistry`] owns the per-player slot table and keeps the
//! every-player-has-every-slot invariant across creation, recycling, and
//! destruction.
//!
//! # Modules
//!
//! - [`state`]: The connection pipeline state enum
//! - [`record`]: The player record
//! - [`registry`]: The registry with id recycling and slot walks

pub mod record;
pub mod registry;
pub mod state;

pub use record::Player;
pub use registry::PlayerRegistry;
pub use state::PlayerState;
