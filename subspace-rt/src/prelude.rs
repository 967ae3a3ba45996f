//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits for
//! building zone-server modules with subspace-rt. Import this module to
//! get started quickly:
//!
//! ```rust
//! use subspace_rt::prelude::*;
//! ```
//!
//! # What's Included
//!
//! ## Service Bus
//! - [`Broker`] - Scoped service/event bus node
//! - [`ServiceApi`] / [`ServiceKind`] - Interface contract identities
//! - [`ServiceRef`] / [`ServiceHandle`] - Reference-counted handles
//! - [`Callback`] / [`CallbackFn`] - Typed pub/sub contracts
//! - [`BrokerError`] - Registration and takedown failures
//!
//! ## Module Runtime
//! - [`Module`] - The module contract
//! - [`ModuleCapabilities`] - Opt-in entry points
//! - [`ModuleKind`] / [`ServiceDependency`] / [`ServiceSet`] - Kinds and
//!   dependency manifests
//! - [`ModuleManager`] - The lifecycle engine
//! - [`ModuleState`] / [`ModuleInfo`] / [`ModuleError`] - Observability
//!
//! ## Entities
//! - [`Player`] / [`PlayerRegistry`] / [`PlayerState`]
//! - [`Arena`] / [`ArenaRegistry`]
//! - [`SlotKey`] / [`SlotHooks`] / [`ExtraData`] - Extra-data slots
//!
//! ## Infrastructure
//! - [`ZoneHost`] / [`HostConfig`] / [`HostError`]
//! - [`ModuleName`] / [`ArenaName`] / [`PlayerId`] - Identity types
//! - [`CancellationToken`] - Cancellation for async entry points

pub use tokio_util::sync::CancellationToken;

pub use crate::arena::{Arena, ArenaError, ArenaRegistry};
pub use crate::broker::{
    Broker, BrokerError, Callback, CallbackFn, ServiceApi, ServiceHandle, ServiceKind, ServiceRef,
};
pub use crate::module::{
    Module, ModuleCapabilities, ModuleError, ModuleFault, ModuleInfo, ModuleKind, ModuleManager,
    ModuleState, ServiceDependency, ServiceSet,
};
pub use crate::player::{Player, PlayerRegistry, PlayerState};
pub use crate::slots::{ExtraData, SlotError, SlotHooks, SlotKey};
pub use crate::system::{HostConfig, HostError, ZoneHost};
pub use crate::util::{ArenaName, ModuleInstanceId, ModuleName, PlayerId};
