//! The zone host: wiring of broker, registries, and module manager.

// Layer 1: Standard library
use std::sync::Arc;

// Layer 2: Third-party
use tokio_util::sync::CancellationToken;

// Layer 3: Internal
use super::config::HostConfig;
use super::errors::HostError;
use crate::arena::{Arena, ArenaError, ArenaRegistry};
use crate::broker::Broker;
use crate::module::{ModuleManager, PluginLoader};
use crate::player::PlayerRegistry;
use crate::util::ArenaName;

/// One running zone.
///
/// The host owns the process-global root broker, the player and arena
/// registries (both published as services on the root so modules can
/// depend on them through their manifests), and the module manager.
///
/// # Examples
///
/// ```rust,ignore
/// #[tokio::main]
/// async fn main() -> Result<(), HostError> {
///     let host = ZoneHost::new(HostConfig::default())?;
///     host.modules().register_kind(chat_kind())?;
///
///     let cancel = CancellationToken::new();
///     host.modules()
///         .load_module(&"subspace_chat::ChatModule".into(), &cancel)
///         .await?;
///     host.modules().do_post_load(&cancel).await;
///
///     let arena = host.create_arena(ArenaName::new("0"))?;
///     // ... run the zone ...
///     host.shutdown(&cancel).await?;
///     Ok(())
/// }
/// ```
pub struct ZoneHost {
    config: HostConfig,
    root: Arc<Broker>,
    players: Arc<PlayerRegistry>,
    arenas: Arc<ArenaRegistry>,
    modules: ModuleManager,
}

impl ZoneHost {
    /// Create a zone host with the platform plug-in loader.
    pub fn new(config: HostConfig) -> Result<Self, HostError> {
        Self::build(config, None)
    }

    /// Create a zone host with a custom plug-in loader.
    pub fn with_plugin_loader(
        config: HostConfig,
        loader: Arc<dyn PluginLoader>,
    ) -> Result<Self, HostError> {
        Self::build(config, Some(loader))
    }

    fn build(
        config: HostConfig,
        loader: Option<Arc<dyn PluginLoader>>,
    ) -> Result<Self, HostError> {
        config.validate().map_err(HostError::Config)?;

        let root = Broker::root();
        let players = Arc::new(PlayerRegistry::new(
            config.player_reuse_delay,
            config.player_slot_capacity,
        ));
        let arenas = Arc::new(ArenaRegistry::new(
            Arc::clone(&root),
            config.arena_slot_capacity,
        ));
        root.register_service::<PlayerRegistry>(Arc::clone(&players), None)?;
        root.register_service::<ArenaRegistry>(Arc::clone(&arenas), None)?;

        let modules = match loader {
            Some(loader) => ModuleManager::with_loader(Arc::clone(&root), loader),
            None => ModuleManager::new(Arc::clone(&root)),
        };

        tracing::info!("zone host initialized");
        Ok(Self {
            config,
            root,
            players,
            arenas,
            modules,
        })
    }

    /// The host configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The process-global root broker.
    pub fn root(&self) -> &Arc<Broker> {
        &self.root
    }

    /// The player registry.
    pub fn players(&self) -> &Arc<PlayerRegistry> {
        &self.players
    }

    /// The arena registry.
    pub fn arenas(&self) -> &Arc<ArenaRegistry> {
        &self.arenas
    }

    /// The module manager.
    pub fn modules(&self) -> &ModuleManager {
        &self.modules
    }

    /// Create an arena.
    pub fn create_arena(&self, name: ArenaName) -> Result<Arc<Arena>, HostError> {
        Ok(self.arenas.create_arena(name)?)
    }

    /// Destroy an arena: detach every attached module, then tear the
    /// arena down (slot release walk plus broker disposal).
    pub async fn destroy_arena(
        &self,
        name: &ArenaName,
        cancel: &CancellationToken,
    ) -> Result<(), HostError> {
        let arena = self
            .arenas
            .get(name)
            .ok_or_else(|| ArenaError::NotFound(name.clone()))?;
        self.modules.detach_all_from_arena(&arena, cancel).await?;
        self.arenas.destroy_arena(name)?;
        Ok(())
    }

    /// Shut the zone down: pre-unload phase, unload every module in
    /// reverse load order, destroy remaining arenas, dispose the root
    /// broker (logging provider leaks).
    pub async fn shutdown(&self, cancel: &CancellationToken) -> Result<(), HostError> {
        tracing::info!("zone host shutting down");
        self.modules.do_pre_unload(cancel).await;
        self.modules.unload_all(cancel).await?;

        for arena in self.arenas.arenas() {
            if let Err(error) = self.arenas.destroy_arena(&arena.name().clone()) {
                tracing::warn!(arena = %arena.name(), error = %error, "arena teardown failed");
            }
        }

        self.root.dispose();
        Ok(())
    }
}
