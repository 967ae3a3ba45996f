//! Utility types shared across the runtime.
//!
//! This module contains the identity types used throughout the zone host:
//! module names, plug-in instance ids, player ids, and arena names.

pub mod ids;

pub use ids::{ArenaName, ModuleInstanceId, ModuleName, PlayerId};
