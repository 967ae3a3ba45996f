//! The module manager: the zone's lifecycle engine.
//!
//! The manager is the only writer of load state. It discovers module
//! kinds (built-in registrations or isolated plug-in packages), resolves
//! constructor manifests against the root broker, tracks the total load
//! order, runs the post-load and pre-unload phases, and manages the
//! attach/detach relation between modules and arenas.
//!
//! # Write Discipline
//!
//! All mutations serialize on a single async **write gate**, held across
//! suspending module entry points. The manager's maps are guarded by a
//! separate short **data mutex** that is never held across an await, so
//! readers (info queries, invariant checks) stay responsive while a slow
//! module loads.
//!
//! # Ordering
//!
//! Load order is the order of successful load completions. Post-load
//! follows load order; pre-unload and unload-all run in reverse load
//! order, so a module's providers are still alive when its pre-unload
//! runs. Within one module, dependencies are acquired in manifest order
//! and released in reverse.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use super::capabilities::ModuleCapabilities;
use super::error::ModuleError;
use super::info::ModuleInfo;
use super::kind::{resolve_manifest, ModuleKind};
use super::plugin::{
    LibraryLoader, PluginContexts, PluginEventArgs, PluginLoaded, PluginLoader, PluginUnloading,
};
use super::state::ModuleState;
use super::traits::{Module, ModuleFault};
use crate::arena::Arena;
use crate::broker::{Broker, ServiceHandle};
use crate::util::{ArenaName, ModuleInstanceId, ModuleName};

/// Where a loaded module came from.
#[derive(Debug, Clone)]
pub enum ModuleOrigin {
    /// Registered directly with the manager.
    BuiltIn,
    /// Constructed from an isolated plug-in load context.
    Plugin {
        /// Cache key of the owning context.
        context_key: String,
        /// The package path as requested.
        path: PathBuf,
    },
}

impl ModuleOrigin {
    /// Whether this module came from a plug-in package.
    pub fn is_plugin(&self) -> bool {
        matches!(self, ModuleOrigin::Plugin { .. })
    }
}

/// One loaded module instance and its bookkeeping.
struct ModuleHolder {
    name: ModuleName,
    description: String,
    instance_id: ModuleInstanceId,
    origin: ModuleOrigin,
    capabilities: ModuleCapabilities,
    instance: tokio::sync::Mutex<Box<dyn Module>>,
    state: Mutex<ModuleState>,
    /// Dependency handles in acquisition order; released in reverse.
    deps: Mutex<Vec<ServiceHandle>>,
    attached: Mutex<Vec<Arc<Arena>>>,
    loaded_at: DateTime<Utc>,
}

impl ModuleHolder {
    fn info(&self) -> ModuleInfo {
        let package_path = match &self.origin {
            ModuleOrigin::BuiltIn => None,
            ModuleOrigin::Plugin { path, .. } => Some(path.clone()),
        };
        ModuleInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            state: *self.state.lock(),
            is_plugin: self.origin.is_plugin(),
            package_path,
            attached_arenas: self
                .attached
                .lock()
                .iter()
                .map(|arena| arena.name().clone())
                .collect(),
            instance_id: Some(self.instance_id),
            loaded_at: Some(self.loaded_at),
        }
    }

    fn is_attached_to(&self, arena: &ArenaName) -> bool {
        self.attached.lock().iter().any(|a| a.name() == arena)
    }
}

struct ManagerData {
    kinds: HashMap<ModuleName, Arc<ModuleKind>>,
    modules: HashMap<ModuleName, Arc<ModuleHolder>>,
    load_order: Vec<ModuleName>,
    post_loaded: bool,
}

/// Outcome of one isolated entry-point invocation.
enum EntryOutcome {
    Ok,
    Fault(ModuleFault),
    Panicked,
}

/// The module lifecycle engine.
///
/// # Example
///
/// ```rust,ignore
/// let manager = ModuleManager::new(Arc::clone(&root));
/// manager.register_kind(chat_kind)?;
/// manager.load_module(&"subspace_chat::ChatModule".into(), &cancel).await?;
/// manager.do_post_load(&cancel).await;
/// ```
pub struct ModuleManager {
    root: Arc<Broker>,
    /// Serializes every mutation; held across suspending entry points.
    write_gate: tokio::sync::Mutex<()>,
    /// Short critical sections only; never held across an await.
    data: Mutex<ManagerData>,
    plugins: PluginContexts,
}

impl ModuleManager {
    /// Create a manager over the given root broker, loading plug-ins with
    /// the platform dynamic-library loader.
    pub fn new(root: Arc<Broker>) -> Self {
        Self::with_loader(root, Arc::new(LibraryLoader))
    }

    /// Create a manager with a custom plug-in loader.
    pub fn with_loader(root: Arc<Broker>, loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            root,
            write_gate: tokio::sync::Mutex::new(()),
            data: Mutex::new(ManagerData {
                kinds: HashMap::new(),
                modules: HashMap::new(),
                load_order: Vec::new(),
                post_loaded: false,
            }),
            plugins: PluginContexts::new(loader),
        }
    }

    /// The root broker this manager resolves dependencies against.
    pub fn root(&self) -> &Arc<Broker> {
        &self.root
    }

    /// Register a built-in module kind.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::AlreadyRegistered`] when a kind with this
    /// name exists.
    pub fn register_kind(&self, kind: ModuleKind) -> Result<(), ModuleError> {
        let mut data = self.data.lock();
        let name = kind.name().clone();
        if data.kinds.contains_key(&name) {
            return Err(ModuleError::AlreadyRegistered { name });
        }
        data.kinds.insert(name, Arc::new(kind));
        Ok(())
    }

    /// Load a registered module kind by name.
    ///
    /// Constructor candidates are tried in descending manifest length; the
    /// first fully-resolvable one constructs the instance, whose `load`
    /// entry point then runs. On any failure every acquired dependency is
    /// released and the module stays `Registered`.
    pub async fn load_module(
        &self,
        name: &ModuleName,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        let kind = {
            let data = self.data.lock();
            if data.modules.contains_key(name) {
                return Err(ModuleError::AlreadyLoaded { name: name.clone() });
            }
            data.kinds
                .get(name)
                .map(Arc::clone)
                .ok_or_else(|| ModuleError::ModuleNotFound { name: name.clone() })?
        };
        if kind.candidates().is_empty() {
            return Err(ModuleError::NoConstructor { name: name.clone() });
        }
        let (instance, deps) = self.construct(&kind)?;
        self.finish_load(
            name.clone(),
            kind.description().to_string(),
            ModuleOrigin::BuiltIn,
            instance,
            deps,
            cancel,
        )
        .await
    }

    /// Load a batch of registered kinds, retrying dependency failures.
    ///
    /// Makes repeated passes over the still-unloaded names until a pass
    /// produces no progress, the way a module-list loader brings up an
    /// interdependent set without caring about list order. Dependency
    /// failures are retried; any other failure aborts the batch.
    pub async fn load_batch(
        &self,
        names: &[ModuleName],
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let mut pending: Vec<ModuleName> = names.to_vec();
        loop {
            let mut progressed = false;
            let mut remaining = Vec::new();
            let mut last_error = None;
            for name in pending {
                match self.load_module(&name, cancel).await {
                    Ok(()) => progressed = true,
                    Err(error @ ModuleError::MissingDependencies { .. }) => {
                        last_error = Some(error);
                        remaining.push(name);
                    }
                    Err(error) => return Err(error),
                }
            }
            if remaining.is_empty() {
                return Ok(());
            }
            if !progressed {
                return match last_error {
                    Some(error) => Err(error),
                    None => Ok(()),
                };
            }
            pending = remaining;
        }
    }

    /// Load a module from an isolated plug-in package.
    ///
    /// The package at `path` is loaded into a context cached by canonical
    /// path; same-path loads reuse the cached context. A context loaded by
    /// this call fires [`PluginLoaded`] on the root broker.
    pub async fn load_plugin_module(
        &self,
        name: &ModuleName,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        {
            let data = self.data.lock();
            if data.modules.contains_key(name) {
                return Err(ModuleError::AlreadyLoaded { name: name.clone() });
            }
        }

        let (context, fresh) =
            self.plugins
                .get_or_load(path)
                .map_err(|fault| ModuleError::PluginLoadFailed {
                    name: name.clone(),
                    path: path.display().to_string(),
                    source: Some(fault),
                })?;
        if fresh {
            tracing::info!(path = %path.display(), "plug-in context loaded");
            self.root.fire::<PluginLoaded>(&PluginEventArgs {
                path: path.to_path_buf(),
            });
        }

        let origin = ModuleOrigin::Plugin {
            context_key: context.key().to_string(),
            path: path.to_path_buf(),
        };
        let Some(kind) = context.find_kind(name) else {
            self.drop_plugin_context_if_unused(&origin);
            return Err(ModuleError::PluginLoadFailed {
                name: name.clone(),
                path: path.display().to_string(),
                source: None,
            });
        };
        if kind.candidates().is_empty() {
            self.drop_plugin_context_if_unused(&origin);
            return Err(ModuleError::NotAModule { name: name.clone() });
        }

        let constructed = self.construct(&kind);
        let (instance, deps) = match constructed {
            Ok(parts) => parts,
            Err(error) => {
                self.drop_plugin_context_if_unused(&origin);
                return Err(error);
            }
        };
        self.finish_load(
            name.clone(),
            kind.description().to_string(),
            origin,
            instance,
            deps,
            cancel,
        )
        .await
    }

    /// Load a pre-constructed instance under the given identity.
    ///
    /// No dependency resolution happens; the instance is expected to have
    /// been wired by its creator.
    pub async fn load_instance(
        &self,
        name: ModuleName,
        description: impl Into<String>,
        instance: Box<dyn Module>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        {
            let data = self.data.lock();
            if data.modules.contains_key(&name) {
                return Err(ModuleError::AlreadyLoaded { name });
            }
        }
        self.finish_load(
            name,
            description.into(),
            ModuleOrigin::BuiltIn,
            instance,
            Vec::new(),
            cancel,
        )
        .await
    }

    /// Try each constructor candidate, most-dependent first.
    fn construct(
        &self,
        kind: &ModuleKind,
    ) -> Result<(Box<dyn Module>, Vec<ServiceHandle>), ModuleError> {
        let candidates = kind.candidates();
        for candidate in candidates {
            let Some(services) = resolve_manifest(&self.root, candidate.manifest()) else {
                continue;
            };
            let built =
                std::panic::catch_unwind(AssertUnwindSafe(|| candidate.build(&services)));
            return match built {
                Ok(Ok(instance)) => Ok((instance, services.into_handles())),
                // Dropping `services` releases the acquired dependencies.
                Ok(Err(fault)) => Err(ModuleError::ConstructionFailed {
                    name: kind.name().clone(),
                    source: Some(fault),
                }),
                Err(_) => Err(ModuleError::ConstructionFailed {
                    name: kind.name().clone(),
                    source: None,
                }),
            };
        }
        Err(ModuleError::MissingDependencies {
            name: kind.name().clone(),
            candidates: candidates.len(),
        })
    }

    /// Run the load entry point and commit the module on success.
    ///
    /// Caller holds the write gate.
    async fn finish_load(
        &self,
        name: ModuleName,
        description: String,
        origin: ModuleOrigin,
        instance: Box<dyn Module>,
        deps: Vec<ServiceHandle>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let capabilities = instance.capabilities();
        let holder = Arc::new(ModuleHolder {
            name: name.clone(),
            description,
            instance_id: ModuleInstanceId::new(),
            origin: origin.clone(),
            capabilities,
            instance: tokio::sync::Mutex::new(instance),
            state: Mutex::new(ModuleState::Loaded),
            deps: Mutex::new(Vec::new()),
            attached: Mutex::new(Vec::new()),
            loaded_at: Utc::now(),
        });

        let outcome = if cancel.is_cancelled() {
            EntryOutcome::Fault("load cancelled before start".into())
        } else {
            let mut guard = holder.instance.lock().await;
            run_entry(guard.load(&self.root, cancel)).await
        };

        let result = match outcome {
            EntryOutcome::Ok if cancel.is_cancelled() => {
                Err(ModuleError::Cancelled { name: name.clone() })
            }
            EntryOutcome::Ok => Ok(()),
            EntryOutcome::Fault(_) | EntryOutcome::Panicked if cancel.is_cancelled() => {
                Err(ModuleError::Cancelled { name: name.clone() })
            }
            EntryOutcome::Fault(fault) => Err(ModuleError::LoadFailed {
                name: name.clone(),
                source: Some(fault),
            }),
            EntryOutcome::Panicked => Err(ModuleError::LoadFailed {
                name: name.clone(),
                source: None,
            }),
        };

        if let Err(error) = result {
            // Roll back: release dependencies in reverse acquisition
            // order, then drop the plug-in context if nothing else uses it.
            for handle in deps.into_iter().rev() {
                drop(handle);
            }
            drop(holder);
            self.drop_plugin_context_if_unused(&origin);
            tracing::warn!(module = %name, error = %error, "module load rolled back");
            return Err(error);
        }

        *holder.deps.lock() = deps;
        let post_loaded = {
            let mut data = self.data.lock();
            data.modules.insert(name.clone(), Arc::clone(&holder));
            data.load_order.push(name.clone());
            data.post_loaded
        };
        tracing::info!(module = %name, instance = %holder.instance_id, "module loaded");

        // The startup phase has already passed: post-load immediately.
        if post_loaded {
            self.post_load_holder(&holder, cancel).await;
        }
        Ok(())
    }

    /// Unload a module.
    ///
    /// The module must have no remaining arena attachments: detach it
    /// from every arena first, or the unload fails with
    /// [`ModuleError::StillAttached`]. A failed unload leaves the module
    /// exactly as it was.
    pub async fn unload_module(
        &self,
        name: &ModuleName,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        self.unload_locked(name, cancel, false).await
    }

    /// Unload with the write gate already held.
    ///
    /// `detach_first` makes the unload run the detach walk itself; used by
    /// bulk teardown, where no caller is left to detach manually.
    async fn unload_locked(
        &self,
        name: &ModuleName,
        cancel: &CancellationToken,
        detach_first: bool,
    ) -> Result<(), ModuleError> {
        let holder = {
            let data = self.data.lock();
            data.modules
                .get(name)
                .map(Arc::clone)
                .ok_or_else(|| ModuleError::NotLoaded { name: name.clone() })?
        };

        if detach_first {
            let attached: Vec<Arc<Arena>> = holder.attached.lock().clone();
            for arena in attached {
                if let Err(error) = self.detach_holder(&holder, &arena, cancel).await {
                    tracing::warn!(
                        module = %name,
                        arena = %arena.name(),
                        error = %error,
                        "detach failed while unloading"
                    );
                }
            }
        }
        let remaining: Vec<ArenaName> = holder
            .attached
            .lock()
            .iter()
            .map(|arena| arena.name().clone())
            .collect();
        if !remaining.is_empty() {
            return Err(ModuleError::StillAttached {
                name: name.clone(),
                arenas: remaining,
            });
        }

        if *holder.state.lock() == ModuleState::PostLoaded {
            if holder.capabilities.pre_unload() {
                let outcome = {
                    let mut guard = holder.instance.lock().await;
                    run_entry(guard.pre_unload(&self.root, cancel)).await
                };
                match outcome {
                    EntryOutcome::Ok => {}
                    EntryOutcome::Fault(fault) => {
                        return Err(ModuleError::UnloadFailed {
                            name: name.clone(),
                            source: Some(fault),
                        })
                    }
                    EntryOutcome::Panicked => {
                        return Err(ModuleError::UnloadFailed {
                            name: name.clone(),
                            source: None,
                        })
                    }
                }
            }
            *holder.state.lock() = ModuleState::Loaded;
        }

        let outcome = {
            let mut guard = holder.instance.lock().await;
            run_entry(guard.unload(&self.root, cancel)).await
        };
        match outcome {
            EntryOutcome::Ok => {}
            EntryOutcome::Fault(fault) => {
                return Err(ModuleError::UnloadFailed {
                    name: name.clone(),
                    source: Some(fault),
                })
            }
            EntryOutcome::Panicked => {
                return Err(ModuleError::UnloadFailed {
                    name: name.clone(),
                    source: None,
                })
            }
        }

        let deps: Vec<ServiceHandle> = holder.deps.lock().drain(..).collect();
        for handle in deps.into_iter().rev() {
            drop(handle);
        }

        {
            let mut data = self.data.lock();
            data.modules.remove(name);
            data.load_order.retain(|loaded| loaded != name);
        }
        // Dropping the holder drops the instance, which is its disposal.
        let origin = holder.origin.clone();
        drop(holder);
        self.drop_plugin_context_if_unused(&origin);
        tracing::info!(module = %name, "module unloaded");
        Ok(())
    }

    /// Attach a module to an arena.
    ///
    /// Valid only for loaded modules declaring the attach capability.
    /// Attaching to an arena already in the attached-set is a no-op.
    pub async fn attach_module(
        &self,
        name: &ModuleName,
        arena: &Arc<Arena>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        let holder = {
            let data = self.data.lock();
            data.modules
                .get(name)
                .map(Arc::clone)
                .ok_or_else(|| ModuleError::NotLoaded { name: name.clone() })?
        };
        if !holder.capabilities.arena_attach() {
            return Err(ModuleError::AttachUnsupported { name: name.clone() });
        }
        if holder.is_attached_to(arena.name()) {
            return Ok(());
        }

        let outcome = {
            let mut guard = holder.instance.lock().await;
            run_entry(guard.attach_arena(arena, cancel)).await
        };
        match outcome {
            EntryOutcome::Ok => {
                holder.attached.lock().push(Arc::clone(arena));
                tracing::debug!(module = %name, arena = %arena.name(), "module attached");
                Ok(())
            }
            EntryOutcome::Fault(fault) => Err(ModuleError::AttachFailed {
                name: name.clone(),
                arena: arena.name().clone(),
                source: Some(fault),
            }),
            EntryOutcome::Panicked => Err(ModuleError::AttachFailed {
                name: name.clone(),
                arena: arena.name().clone(),
                source: None,
            }),
        }
    }

    /// Detach a module from an arena.
    ///
    /// On failure the attachment persists and the error is returned.
    pub async fn detach_module(
        &self,
        name: &ModuleName,
        arena: &Arc<Arena>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        let holder = {
            let data = self.data.lock();
            data.modules
                .get(name)
                .map(Arc::clone)
                .ok_or_else(|| ModuleError::NotLoaded { name: name.clone() })?
        };
        self.detach_holder(&holder, arena, cancel).await
    }

    /// Detach every module attached to `arena`; used when the arena is
    /// being torn down. Iterates a snapshot; failures are logged and the
    /// first one is reported after all modules were attempted.
    pub async fn detach_all_from_arena(
        &self,
        arena: &Arc<Arena>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        let holders: Vec<Arc<ModuleHolder>> = {
            let data = self.data.lock();
            data.modules
                .values()
                .filter(|holder| holder.is_attached_to(arena.name()))
                .map(Arc::clone)
                .collect()
        };

        let mut first_error = None;
        for holder in holders {
            if let Err(error) = self.detach_holder(&holder, arena, cancel).await {
                tracing::warn!(
                    module = %holder.name,
                    arena = %arena.name(),
                    error = %error,
                    "detach failed during arena teardown"
                );
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn detach_holder(
        &self,
        holder: &Arc<ModuleHolder>,
        arena: &Arc<Arena>,
        cancel: &CancellationToken,
    ) -> Result<(), ModuleError> {
        if !holder.is_attached_to(arena.name()) {
            return Ok(());
        }
        let outcome = {
            let mut guard = holder.instance.lock().await;
            run_entry(guard.detach_arena(arena, cancel)).await
        };
        match outcome {
            EntryOutcome::Ok => {
                holder
                    .attached
                    .lock()
                    .retain(|attached| attached.name() != arena.name());
                tracing::debug!(module = %holder.name, arena = %arena.name(), "module detached");
                Ok(())
            }
            EntryOutcome::Fault(fault) => Err(ModuleError::DetachFailed {
                name: holder.name.clone(),
                arena: arena.name().clone(),
                source: Some(fault),
            }),
            EntryOutcome::Panicked => Err(ModuleError::DetachFailed {
                name: holder.name.clone(),
                arena: arena.name().clone(),
                source: None,
            }),
        }
    }

    /// Run the post-load phase over every loaded module, in load order.
    ///
    /// Idempotent: already post-loaded modules are skipped, and after this
    /// call every future load post-loads immediately. A failing hook is
    /// logged; that module stays `Loaded`.
    pub async fn do_post_load(&self, cancel: &CancellationToken) {
        let _gate = self.write_gate.lock().await;
        let order = self.holders_in_load_order();
        for holder in order {
            if *holder.state.lock() != ModuleState::Loaded {
                continue;
            }
            self.post_load_holder(&holder, cancel).await;
        }
        self.data.lock().post_loaded = true;
    }

    async fn post_load_holder(&self, holder: &Arc<ModuleHolder>, cancel: &CancellationToken) {
        if holder.capabilities.post_load() {
            let outcome = {
                let mut guard = holder.instance.lock().await;
                run_entry(guard.post_load(&self.root, cancel)).await
            };
            match outcome {
                EntryOutcome::Ok => {
                    *holder.state.lock() = ModuleState::PostLoaded;
                }
                EntryOutcome::Fault(fault) => {
                    tracing::error!(
                        module = %holder.name,
                        error = %fault,
                        "post-load failed; module stays loaded"
                    );
                }
                EntryOutcome::Panicked => {
                    tracing::error!(
                        module = %holder.name,
                        "post-load panicked; module stays loaded"
                    );
                }
            }
        } else {
            *holder.state.lock() = ModuleState::PostLoaded;
        }
    }

    /// Run the pre-unload phase over every post-loaded module, in reverse
    /// load order, and leave the startup phase again (future loads no
    /// longer post-load immediately). Mirror of [`Self::do_post_load`].
    pub async fn do_pre_unload(&self, cancel: &CancellationToken) {
        let _gate = self.write_gate.lock().await;
        let order = self.holders_in_load_order();
        for holder in order.iter().rev() {
            if *holder.state.lock() != ModuleState::PostLoaded {
                continue;
            }
            if holder.capabilities.pre_unload() {
                let outcome = {
                    let mut guard = holder.instance.lock().await;
                    run_entry(guard.pre_unload(&self.root, cancel)).await
                };
                match outcome {
                    EntryOutcome::Ok => {
                        *holder.state.lock() = ModuleState::Loaded;
                    }
                    EntryOutcome::Fault(fault) => {
                        tracing::error!(
                            module = %holder.name,
                            error = %fault,
                            "pre-unload failed; module stays post-loaded"
                        );
                    }
                    EntryOutcome::Panicked => {
                        tracing::error!(
                            module = %holder.name,
                            "pre-unload panicked; module stays post-loaded"
                        );
                    }
                }
            } else {
                *holder.state.lock() = ModuleState::Loaded;
            }
        }
        self.data.lock().post_loaded = false;
    }

    /// Unload every module in reverse load order.
    ///
    /// Each module is detached from its remaining arenas as part of its
    /// unload. Failures are logged and skipped; the first one is reported
    /// after all modules were attempted.
    pub async fn unload_all(&self, cancel: &CancellationToken) -> Result<(), ModuleError> {
        let _gate = self.write_gate.lock().await;
        let order: Vec<ModuleName> = self.data.lock().load_order.clone();
        let mut first_error = None;
        for name in order.iter().rev() {
            if let Err(error) = self.unload_locked(name, cancel, true).await {
                tracing::error!(module = %name, error = %error, "unload failed during unload-all");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn holders_in_load_order(&self) -> Vec<Arc<ModuleHolder>> {
        let data = self.data.lock();
        data.load_order
            .iter()
            .filter_map(|name| data.modules.get(name).map(Arc::clone))
            .collect()
    }

    /// Observable information about one module (loaded or just
    /// registered).
    pub fn module_info(&self, name: &ModuleName) -> Option<ModuleInfo> {
        let data = self.data.lock();
        if let Some(holder) = data.modules.get(name) {
            return Some(holder.info());
        }
        data.kinds.get(name).map(|kind| ModuleInfo {
            name: kind.name().clone(),
            description: kind.description().to_string(),
            state: ModuleState::Registered,
            is_plugin: false,
            package_path: None,
            attached_arenas: Vec::new(),
            instance_id: None,
            loaded_at: None,
        })
    }

    /// Observable information about every known module: loaded modules in
    /// load order, then registered-but-unloaded kinds.
    pub fn module_infos(&self) -> Vec<ModuleInfo> {
        let data = self.data.lock();
        let mut infos: Vec<ModuleInfo> = data
            .load_order
            .iter()
            .filter_map(|name| data.modules.get(name).map(|holder| holder.info()))
            .collect();
        for (name, kind) in &data.kinds {
            if !data.modules.contains_key(name) {
                infos.push(ModuleInfo {
                    name: kind.name().clone(),
                    description: kind.description().to_string(),
                    state: ModuleState::Registered,
                    is_plugin: false,
                    package_path: None,
                    attached_arenas: Vec::new(),
                    instance_id: None,
                    loaded_at: None,
                });
            }
        }
        infos
    }

    /// The load order: names of loaded modules in load-completion order.
    pub fn load_order(&self) -> Vec<ModuleName> {
        self.data.lock().load_order.clone()
    }

    /// Whether the module is currently loaded.
    pub fn is_loaded(&self, name: &ModuleName) -> bool {
        self.data.lock().modules.contains_key(name)
    }

    /// Whether the global post-load phase has completed.
    pub fn is_post_loaded(&self) -> bool {
        self.data.lock().post_loaded
    }

    /// Current load state of the module, if known at all.
    pub fn module_state(&self, name: &ModuleName) -> Option<ModuleState> {
        let data = self.data.lock();
        if let Some(holder) = data.modules.get(name) {
            return Some(*holder.state.lock());
        }
        data.kinds.get(name).map(|_| ModuleState::Registered)
    }

    /// Number of cached plug-in contexts.
    pub fn plugin_context_count(&self) -> usize {
        self.plugins.len()
    }

    fn drop_plugin_context_if_unused(&self, origin: &ModuleOrigin) {
        let ModuleOrigin::Plugin { context_key, path } = origin else {
            return;
        };
        let still_used = {
            let data = self.data.lock();
            data.modules.values().any(|holder| {
                matches!(
                    &holder.origin,
                    ModuleOrigin::Plugin { context_key: key, .. } if key == context_key
                )
            })
        };
        if !still_used {
            self.root.fire::<PluginUnloading>(&PluginEventArgs {
                path: path.clone(),
            });
            self.plugins.unload(context_key);
        }
    }
}

/// Invoke one module entry point with panic isolation.
async fn run_entry<F>(entry: F) -> EntryOutcome
where
    F: std::future::Future<Output = Result<(), ModuleFault>>,
{
    match AssertUnwindSafe(entry).catch_unwind().await {
        Ok(Ok(())) => EntryOutcome::Ok,
        Ok(Err(fault)) => EntryOutcome::Fault(fault),
        Err(_) => EntryOutcome::Panicked,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::broker::{ServiceApi, ServiceKind};
    use async_trait::async_trait;

    struct ProbeService(u32);

    impl ServiceApi for ProbeService {
        const KIND: ServiceKind = ServiceKind::new("test.manager.probe");
    }

    #[derive(Default)]
    struct PlainModule {
        fail_load: bool,
    }

    #[async_trait]
    impl Module for PlainModule {
        async fn load(
            &mut self,
            _zone: &Arc<Broker>,
            _cancel: &CancellationToken,
        ) -> Result<(), ModuleFault> {
            if self.fail_load {
                return Err("load refused".into());
            }
            Ok(())
        }

        async fn unload(
            &mut self,
            _zone: &Arc<Broker>,
            _cancel: &CancellationToken,
        ) -> Result<(), ModuleFault> {
            Ok(())
        }
    }

    fn manager() -> ModuleManager {
        ModuleManager::new(Broker::root())
    }

    fn plain_kind(name: &str) -> ModuleKind {
        ModuleKind::builder(name)
            .description("plain test module")
            .constructor(vec![], |_| Ok(Box::new(PlainModule::default())))
            .finish()
    }

    #[tokio::test]
    async fn test_load_and_unload_roundtrip() {
        let manager = manager();
        let name = ModuleName::new("test::Plain");
        manager.register_kind(plain_kind("test::Plain")).unwrap();

        let cancel = CancellationToken::new();
        manager.load_module(&name, &cancel).await.unwrap();
        assert!(manager.is_loaded(&name));
        assert_eq!(manager.load_order(), vec![name.clone()]);

        manager.unload_module(&name, &cancel).await.unwrap();
        assert!(!manager.is_loaded(&name));
        assert!(manager.load_order().is_empty());
        // The kind remains registered.
        assert_eq!(
            manager.module_state(&name),
            Some(ModuleState::Registered)
        );
    }

    #[tokio::test]
    async fn test_unknown_module_not_found() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let result = manager
            .load_module(&ModuleName::new("test::Missing"), &cancel)
            .await;
        assert!(matches!(result, Err(ModuleError::ModuleNotFound { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_kind_registration() {
        let manager = manager();
        manager.register_kind(plain_kind("test::Plain")).unwrap();
        let result = manager.register_kind(plain_kind("test::Plain"));
        assert!(matches!(result, Err(ModuleError::AlreadyRegistered { .. })));
    }

    #[tokio::test]
    async fn test_double_load_is_rejected() {
        let manager = manager();
        let name = ModuleName::new("test::Plain");
        manager.register_kind(plain_kind("test::Plain")).unwrap();
        let cancel = CancellationToken::new();
        manager.load_module(&name, &cancel).await.unwrap();
        let result = manager.load_module(&name, &cancel).await;
        assert!(matches!(result, Err(ModuleError::AlreadyLoaded { .. })));
    }

    #[tokio::test]
    async fn test_failed_load_leaves_module_registered() {
        let manager = manager();
        let name = ModuleName::new("test::Failing");
        manager
            .register_kind(
                ModuleKind::builder("test::Failing")
                    .constructor(vec![], |_| {
                        Ok(Box::new(PlainModule { fail_load: true }))
                    })
                    .finish(),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        let result = manager.load_module(&name, &cancel).await;
        assert!(matches!(result, Err(ModuleError::LoadFailed { .. })));
        assert!(!manager.is_loaded(&name));
        assert!(manager.load_order().is_empty());
        assert_eq!(manager.module_state(&name), Some(ModuleState::Registered));
    }

    #[tokio::test]
    async fn test_missing_dependencies_reports_candidates() {
        let manager = manager();
        let name = ModuleName::new("test::Needy");
        manager
            .register_kind(
                ModuleKind::builder("test::Needy")
                    .constructor(
                        vec![crate::module::ServiceDependency::on(ProbeService::KIND)],
                        |_| Ok(Box::new(PlainModule::default())),
                    )
                    .finish(),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        let result = manager.load_module(&name, &cancel).await;
        assert!(matches!(
            result,
            Err(ModuleError::MissingDependencies { candidates: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_biggest_satisfiable_candidate_wins() {
        let manager = manager();
        let name = ModuleName::new("test::TwoWay");
        manager
            .root()
            .register_service::<ProbeService>(Arc::new(ProbeService(1)), None)
            .unwrap();
        manager
            .register_kind(
                ModuleKind::builder("test::TwoWay")
                    .constructor(vec![], |_| {
                        Err("fallback constructor must not be chosen".into())
                    })
                    .constructor(
                        vec![crate::module::ServiceDependency::on(ProbeService::KIND)],
                        |services| {
                            services
                                .get::<ProbeService>()
                                .ok_or("probe missing")?;
                            Ok(Box::new(PlainModule::default()))
                        },
                    )
                    .finish(),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        manager.load_module(&name, &cancel).await.unwrap();
        assert!(manager.is_loaded(&name));
    }

    #[tokio::test]
    async fn test_loaded_module_holds_dependency_reference() {
        let manager = manager();
        let name = ModuleName::new("test::Needy");
        manager
            .root()
            .register_service::<ProbeService>(Arc::new(ProbeService(1)), None)
            .unwrap();
        manager
            .register_kind(
                ModuleKind::builder("test::Needy")
                    .constructor(
                        vec![crate::module::ServiceDependency::on(ProbeService::KIND)],
                        |_| Ok(Box::new(PlainModule::default())),
                    )
                    .finish(),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        manager.load_module(&name, &cancel).await.unwrap();
        assert_eq!(
            manager.root().lookup_outstanding(ProbeService::KIND, None),
            Some(1)
        );

        manager.unload_module(&name, &cancel).await.unwrap();
        assert_eq!(
            manager.root().lookup_outstanding(ProbeService::KIND, None),
            Some(0)
        );
    }

    #[tokio::test]
    async fn test_cancelled_load_rolls_back() {
        let manager = manager();
        let name = ModuleName::new("test::Plain");
        manager.register_kind(plain_kind("test::Plain")).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = manager.load_module(&name, &cancel).await;
        assert!(matches!(result, Err(ModuleError::Cancelled { .. })));
        assert!(!manager.is_loaded(&name));
    }

    #[tokio::test]
    async fn test_construction_panic_is_contained() {
        let manager = manager();
        let name = ModuleName::new("test::Explosive");
        manager
            .register_kind(
                ModuleKind::builder("test::Explosive")
                    .constructor(vec![], |_| panic!("constructor exploded"))
                    .finish(),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        let result = manager.load_module(&name, &cancel).await;
        assert!(matches!(
            result,
            Err(ModuleError::ConstructionFailed { source: None, .. })
        ));
        // The manager is intact and can keep loading other modules.
        manager.register_kind(plain_kind("test::Plain")).unwrap();
        manager
            .load_module(&ModuleName::new("test::Plain"), &cancel)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_module_info_reflects_states() {
        let manager = manager();
        let name = ModuleName::new("test::Plain");
        manager.register_kind(plain_kind("test::Plain")).unwrap();

        let info = manager.module_info(&name).unwrap();
        assert_eq!(info.state, ModuleState::Registered);
        assert!(info.instance_id.is_none());

        let cancel = CancellationToken::new();
        manager.load_module(&name, &cancel).await.unwrap();
        let info = manager.module_info(&name).unwrap();
        assert_eq!(info.state, ModuleState::Loaded);
        assert!(!info.is_plugin);
        assert!(info.instance_id.is_some());
        assert!(info.loaded_at.is_some());
    }
}
