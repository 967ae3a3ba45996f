//! Arenas: broker-scoped gameplay rooms and their registry.
//!
//! Every arena owns a child broker parented to the zone root and an
//! extra-data area. The [`ArenaRegistry`] manages arena lifecycle and the
//! per-arena slot table.
//!
//! # Modules
//!
//! - [`error`]: Arena error types
//! - [`record`]: The arena record
//! - [`registry`]: The registry with slot walks and broker disposal

pub mod error;
pub mod record;
pub mod registry;

pub use error::ArenaError;
pub use record::Arena;
pub use registry::ArenaRegistry;
