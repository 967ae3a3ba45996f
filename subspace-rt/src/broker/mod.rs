//! Component broker: scoped service interfaces and named callbacks.
//!
//! The broker is the in-process service bus every module talks through.
//! One process-global root broker exists per zone host; each running arena
//! owns a child broker parented to the root. Modules publish typed service
//! interfaces, resolve their dependencies, and exchange events through
//! named callbacks, all scoped to either the zone or a single arena.
//!
//! # Components
//!
//! - [`Broker`] - Scoped bus node with parent-chain interface lookup
//! - [`ServiceRegistry`] - `(kind, key) → provider` with reference counting
//! - [`CallbackRegistry`] - Named, typed, ordered synchronous pub/sub
//! - [`ServiceKind`] / [`ServiceApi`] - Opaque interface contract identities
//! - [`ServiceRef`] / [`ServiceHandle`] - RAII reference-counted handles
//! - [`BrokerError`] - Registration and takedown failures
//!
//! # Scoping Rules
//!
//! ```text
//! get_service:   arena scope ──miss──▶ root scope        (inherits)
//! fire:          chosen scope only                        (no bubbling)
//! ```
//!
//! # Concurrency
//!
//! Interface lookup is read-dominated: both registries use shared-read /
//! exclusive-write locking, and reference counts are atomic so get/release
//! pairs may be ordered across threads. Callback dispatch snapshots the
//! subscriber list, so handlers may re-enter the registry freely.
//!
//! # Modules
//!
//! This mod.rs file contains only module declarations and re-exports.
//! Implementation code is in individual module files:
//!
//! - [`error`]: Broker error types
//! - [`kind`]: Service kind identities and the [`ServiceApi`] marker
//! - [`services`]: Interface registry with reference counting
//! - [`callbacks`]: Callback registry with snapshot dispatch
//! - [`node`]: The [`Broker`] node tying both registries to a scope chain

pub mod callbacks;
pub mod error;
pub mod kind;
pub mod node;
pub mod services;

pub use callbacks::{Callback, CallbackFn, CallbackRegistry};
pub use error::BrokerError;
pub use kind::{ServiceApi, ServiceKind};
pub use node::Broker;
pub use services::{ErasedService, ServiceHandle, ServiceRef, ServiceRegistry};
