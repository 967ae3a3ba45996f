//! The module contract.
//!
//! A module is a unit of code that participates in the zone's load
//! lifecycle. Entry points are async trait methods; a module whose work is
//! synchronous simply returns without suspending. Every entry point
//! receives a cancellation token: the manager never cancels on its own,
//! but external callers may, and a cancelled load is rolled back as a
//! failure.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use super::capabilities::ModuleCapabilities;
use crate::arena::Arena;
use crate::broker::Broker;

/// Failure reported by a module entry point or constructor.
pub type ModuleFault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Contract every module implements.
///
/// `load` and `unload` are required; the phase hooks and arena attachment
/// are opt-in through [`ModuleCapabilities`]. The manager serializes all
/// entry-point invocations, so a module never sees two of its entry
/// points running concurrently.
///
/// # Example
///
/// ```rust,ignore
/// struct BannerModule {
///     banner: Option<Arc<BannerService>>,
/// }
///
/// #[async_trait]
/// impl Module for BannerModule {
///     fn capabilities(&self) -> ModuleCapabilities {
///         ModuleCapabilities::NONE.with_post_load()
///     }
///
///     async fn load(
///         &mut self,
///         zone: &Arc<Broker>,
///         _cancel: &CancellationToken,
///     ) -> Result<(), ModuleFault> {
///         let service = Arc::new(BannerService::new());
///         zone.register_service::<dyn Banner>(Arc::clone(&service) as _, None)?;
///         self.banner = Some(service);
///         Ok(())
///     }
///
///     async fn unload(
///         &mut self,
///         zone: &Arc<Broker>,
///         _cancel: &CancellationToken,
///     ) -> Result<(), ModuleFault> {
///         if let Some(service) = self.banner.take() {
///             zone.unregister_service::<dyn Banner>(&(service as _), None)?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Module: Send + Sync {
    /// The optional entry points this module implements.
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::NONE
    }

    /// Bring the module up. Interfaces this module provides are
    /// registered here. Failure (or a panic) rolls the load back.
    async fn load(
        &mut self,
        zone: &Arc<Broker>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleFault>;

    /// Take the module down. Interfaces this module registered must be
    /// unregistered here; a non-zero outstanding-reference count makes
    /// that fail, which fails the unload.
    async fn unload(
        &mut self,
        zone: &Arc<Broker>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleFault>;

    /// Second-phase hook, run after every module has loaded (or
    /// immediately after this module's load when the startup phase has
    /// already passed). Only invoked when declared in capabilities.
    async fn post_load(
        &mut self,
        zone: &Arc<Broker>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        let _ = (zone, cancel);
        Ok(())
    }

    /// Mirror of `post_load`, run before unloads begin. Only invoked when
    /// declared in capabilities.
    async fn pre_unload(
        &mut self,
        zone: &Arc<Broker>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        let _ = (zone, cancel);
        Ok(())
    }

    /// Attach this module to an arena. Only invoked when `arena_attach`
    /// is declared. Returning an error leaves the arena out of the
    /// attached-set.
    async fn attach_arena(
        &mut self,
        arena: &Arc<Arena>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        let _ = (arena, cancel);
        Err("arena attachment not implemented".into())
    }

    /// Detach this module from an arena. Returning an error keeps the
    /// attachment alive and fails the caller.
    async fn detach_arena(
        &mut self,
        arena: &Arc<Arena>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        let _ = (arena, cancel);
        Ok(())
    }
}
