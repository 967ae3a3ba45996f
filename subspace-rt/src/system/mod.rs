//! Zone host wiring and configuration.
//!
//! # Modules
//!
//! - [`config`]: [`HostConfig`] and its builder
//! - [`errors`]: [`HostError`]
//! - [`host`]: The [`ZoneHost`] facade

pub mod config;
pub mod errors;
pub mod host;

pub use config::{
    HostConfig, HostConfigBuilder, DEFAULT_ARENA_SLOT_CAPACITY, DEFAULT_PLAYER_REUSE_DELAY,
    DEFAULT_PLAYER_SLOT_CAPACITY,
};
pub use errors::HostError;
pub use host::ZoneHost;
