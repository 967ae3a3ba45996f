//! # subspace-rt - Module Runtime for a Subspace Zone Server
//!
//! Dynamically-composed module host with a scoped in-process service bus,
//! two-phase load lifecycle, hot plug-in loading, and per-entity extra-data
//! slots, for building a Subspace/Continuum zone server out of independent
//! modules.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use subspace_rt::prelude::*;
//! use async_trait::async_trait;
//!
//! // 1. Define a service interface and its kind
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self, who: &str) -> String;
//! }
//!
//! impl ServiceApi for dyn Greeter {
//!     const KIND: ServiceKind = ServiceKind::new("example.greeter");
//! }
//!
//! // 2. Define a module that provides it
//! struct GreeterModule {
//!     service: Option<Arc<GreeterImpl>>,
//! }
//!
//! #[async_trait]
//! impl Module for GreeterModule {
//!     async fn load(
//!         &mut self,
//!         zone: &Arc<Broker>,
//!         _cancel: &CancellationToken,
//!     ) -> Result<(), ModuleFault> {
//!         let service = Arc::new(GreeterImpl);
//!         zone.register_service::<dyn Greeter>(service.clone() as _, None)?;
//!         self.service = Some(service);
//!         Ok(())
//!     }
//!
//!     async fn unload(
//!         &mut self,
//!         zone: &Arc<Broker>,
//!         _cancel: &CancellationToken,
//!     ) -> Result<(), ModuleFault> {
//!         if let Some(service) = self.service.take() {
//!             zone.unregister_service::<dyn Greeter>(&(service as _), None)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! // 3. Register the kind and run the host
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = ZoneHost::new(HostConfig::default())?;
//!     host.modules().register_kind(
//!         ModuleKind::builder("example::GreeterModule")
//!             .constructor(vec![], |_| Ok(Box::new(GreeterModule { service: None })))
//!             .finish(),
//!     )?;
//!
//!     let cancel = CancellationToken::new();
//!     host.modules()
//!         .load_module(&"example::GreeterModule".into(), &cancel)
//!         .await?;
//!     host.modules().do_post_load(&cancel).await;
//!
//!     host.shutdown(&cancel).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Core Concepts
//!
//! ## Scoped Service Bus
//! - One process-global **root broker**; every arena owns a child broker
//! - Interface lookup falls through child → parent; registrations at an
//!   arena shadow the zone-wide provider for that arena's consumers
//! - Callbacks are named, typed, ordered, and fire at exactly the chosen
//!   scope (no bubbling)
//!
//! ## Two-Phase Module Lifecycle
//! - Modules load in dependency order, each retaining reference-counted
//!   handles to the services it consumes
//! - `do_post_load` runs a second wiring pass over every loaded module;
//!   modules loaded after that phase post-load immediately
//! - Unload runs in reverse load order, so a module's providers are still
//!   alive when its pre-unload runs
//!
//! ## Hot Plug-ins
//! - Plug-in packages are dynamic libraries loaded into isolated contexts
//!   cached by canonical path
//! - Context unload is best-effort; nothing depends on it succeeding
//!
//! ## Extra-Data Slots
//! - Modules attach per-player and per-arena state through dense typed
//!   slot keys instead of entity fields
//! - Every live entity holds a value for every live slot, always
//!
//! # Concurrency Model
//!
//! - Module manager mutations serialize on a single async write gate held
//!   across suspending entry points; the manager's maps use a separate
//!   short data mutex never held across an await
//! - Broker registries use shared-read/exclusive-write locks
//! - Slot tables use a short critical section plus a per-entity lock
//!
//! # Module Organization
//!
//! ## Service Bus
//! - [`broker`] - Brokers, interface registry, callback registry
//!
//! ## Module Runtime
//! - [`module`] - Module contract, kinds, manager, plug-in contexts
//!
//! ## Entities
//! - [`player`] - Players, pipeline states, player registry
//! - [`arena`] - Arenas and the arena registry
//! - [`slots`] - Extra-data slot machinery
//!
//! ## Infrastructure
//! - [`system`] - ZoneHost wiring and configuration
//! - [`util`] - Identity types

pub mod arena;
pub mod broker;
pub mod module;
pub mod player;
pub mod prelude;
pub mod slots;
pub mod system;
pub mod util;

// Re-export commonly used types
pub use arena::{Arena, ArenaError, ArenaRegistry};
pub use broker::{
    Broker, BrokerError, Callback, CallbackFn, CallbackRegistry, ErasedService, ServiceApi,
    ServiceHandle, ServiceKind, ServiceRef, ServiceRegistry,
};
pub use module::{
    Module, ModuleCapabilities, ModuleError, ModuleFault, ModuleInfo, ModuleKind,
    ModuleKindBuilder, ModuleManager, ModuleOrigin, ModuleState, PluginEventArgs, PluginLoaded,
    PluginLoader, PluginPackage, PluginUnloading, ServiceDependency, ServiceSet,
};
pub use player::{Player, PlayerRegistry, PlayerState};
pub use slots::{ExtraData, SlotError, SlotHooks, SlotKey, SlotTable};
pub use system::{HostConfig, HostError, ZoneHost};
pub use util::{ArenaName, ModuleInstanceId, ModuleName, PlayerId};
