//! Module Lifecycle Integration Tests
//!
//! End-to-end tests of the module manager over the public surface:
//! dependency-ordered chain loading, the post-load phase, arena
//! attachment rules, bulk teardown ordering, and plug-in context reuse.
//!
//! # Current Test Coverage
//!
//! 1. **Chain Loading** (4 tests)
//!    - Dependency-gated load attempts converging to a total order
//!    - Batch loading with dependency retries
//!    - Reverse-order bulk unload
//!
//! 2. **Post-Load Phase** (2 tests)
//!    - Immediate post-load for modules loaded after startup
//!    - Idempotent phase transitions
//!
//! 3. **Arena Attachment** (3 tests)
//!    - Unload refusal while attached
//!    - Attach/detach round trip
//!    - Arena teardown detaching every attached module
//!
//! 4. **Plug-in Contexts** (2 tests)
//!    - Context reuse across loads from one path
//!    - Reload after unload builds a fresh context
//!
//! 5. **Invariants** (1 test)
//!    - Pre-unload + unload-all leaves the zone empty

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

// Layer 1: Standard library imports
use std::path::Path;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use subspace_rt::module::{ModuleKind, PluginLoaded, PluginLoader, PluginPackage};
use subspace_rt::prelude::*;

// ============================================================================
// Test fixtures: services, recording modules, kinds
// ============================================================================

type EventLog = Arc<Mutex<Vec<String>>>;

trait ServiceA: Send + Sync {
    fn ping(&self) -> u32;
}

impl ServiceApi for dyn ServiceA {
    const KIND: ServiceKind = ServiceKind::new("it.service-a");
}

struct ServiceAImpl;

impl ServiceA for ServiceAImpl {
    fn ping(&self) -> u32 {
        1
    }
}

trait ServiceB: Send + Sync {
    fn pong(&self) -> u32;
}

impl ServiceApi for dyn ServiceB {
    const KIND: ServiceKind = ServiceKind::new("it.service-b");
}

struct ServiceBImpl {
    upstream: Arc<dyn ServiceA>,
}

impl ServiceB for ServiceBImpl {
    fn pong(&self) -> u32 {
        self.upstream.ping() + 1
    }
}

/// Records lifecycle events; optionally provides a service.
struct RecordingModule {
    tag: &'static str,
    log: EventLog,
    capabilities: ModuleCapabilities,
    provide_a: Option<Arc<dyn ServiceA>>,
    provide_b: Option<Arc<dyn ServiceB>>,
}

impl RecordingModule {
    fn new(tag: &'static str, log: &EventLog) -> Self {
        Self {
            tag,
            log: Arc::clone(log),
            capabilities: ModuleCapabilities::NONE,
            provide_a: None,
            provide_b: None,
        }
    }

    fn record(&self, event: &str) {
        self.log.lock().push(format!("{}:{}", self.tag, event));
    }
}

#[async_trait]
impl Module for RecordingModule {
    fn capabilities(&self) -> ModuleCapabilities {
        self.capabilities
    }

    async fn load(
        &mut self,
        zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        if let Some(provider) = &self.provide_a {
            zone.register_service::<dyn ServiceA>(Arc::clone(provider), None)?;
        }
        if let Some(provider) = &self.provide_b {
            zone.register_service::<dyn ServiceB>(Arc::clone(provider), None)?;
        }
        self.record("load");
        Ok(())
    }

    async fn unload(
        &mut self,
        zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        if let Some(provider) = self.provide_b.take() {
            zone.unregister_service::<dyn ServiceB>(&provider, None)?;
        }
        if let Some(provider) = self.provide_a.take() {
            zone.unregister_service::<dyn ServiceA>(&provider, None)?;
        }
        self.record("unload");
        Ok(())
    }

    async fn post_load(
        &mut self,
        _zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        self.record("post_load");
        Ok(())
    }

    async fn pre_unload(
        &mut self,
        _zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        self.record("pre_unload");
        Ok(())
    }

    async fn attach_arena(
        &mut self,
        arena: &Arc<Arena>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        self.record(&format!("attach:{}", arena.name()));
        Ok(())
    }

    async fn detach_arena(
        &mut self,
        arena: &Arc<Arena>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        self.record(&format!("detach:{}", arena.name()));
        Ok(())
    }
}

/// A: no dependencies, provides ServiceA.
fn kind_a(log: &EventLog) -> ModuleKind {
    let log = Arc::clone(log);
    ModuleKind::builder("it::A")
        .description("provides service A")
        .constructor(vec![], move |_| {
            let mut module = RecordingModule::new("A", &log);
            module.provide_a = Some(Arc::new(ServiceAImpl));
            Ok(Box::new(module))
        })
        .finish()
}

/// B: requires ServiceA, provides ServiceB.
fn kind_b(log: &EventLog) -> ModuleKind {
    let log = Arc::clone(log);
    ModuleKind::builder("it::B")
        .description("requires A, provides service B")
        .constructor(
            vec![ServiceDependency::on(<dyn ServiceA as ServiceApi>::KIND)],
            move |services| {
                let upstream = services
                    .get::<dyn ServiceA>()
                    .ok_or("service A missing from resolved set")?;
                let mut module = RecordingModule::new("B", &log);
                module.provide_b = Some(Arc::new(ServiceBImpl { upstream }));
                Ok(Box::new(module))
            },
        )
        .finish()
}

/// C: requires ServiceB.
fn kind_c(log: &EventLog) -> ModuleKind {
    let log = Arc::clone(log);
    ModuleKind::builder("it::C")
        .description("requires service B")
        .constructor(
            vec![ServiceDependency::on(<dyn ServiceB as ServiceApi>::KIND)],
            move |services| {
                services
                    .get::<dyn ServiceB>()
                    .ok_or("service B missing from resolved set")?;
                Ok(Box::new(RecordingModule::new("C", &log)))
            },
        )
        .finish()
}

fn name(tag: &str) -> ModuleName {
    ModuleName::new(format!("it::{tag}"))
}

// ============================================================================
// TEST GROUP 1: Chain loading (scenario: C, A, B attempts)
// ============================================================================

#[tokio::test]
async fn test_chain_load_converges_to_dependency_order() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    host.modules().register_kind(kind_a(&log)).unwrap();
    host.modules().register_kind(kind_b(&log)).unwrap();
    host.modules().register_kind(kind_c(&log)).unwrap();

    // Attempt order C, A, B: only modules whose dependencies are present
    // may load.
    let c_first = host.modules().load_module(&name("C"), &cancel).await;
    assert!(matches!(
        c_first,
        Err(ModuleError::MissingDependencies { candidates: 1, .. })
    ));

    host.modules().load_module(&name("A"), &cancel).await.unwrap();
    host.modules().load_module(&name("B"), &cancel).await.unwrap();
    host.modules().load_module(&name("C"), &cancel).await.unwrap();

    assert_eq!(
        host.modules().load_order(),
        vec![name("A"), name("B"), name("C")]
    );
    assert_eq!(*log.lock(), vec!["A:load", "B:load", "C:load"]);
}

#[tokio::test]
async fn test_batch_load_retries_dependency_failures() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    host.modules().register_kind(kind_a(&log)).unwrap();
    host.modules().register_kind(kind_b(&log)).unwrap();
    host.modules().register_kind(kind_c(&log)).unwrap();

    // The list is ordered worst-first; the batch loader converges anyway.
    host.modules()
        .load_batch(&[name("C"), name("A"), name("B")], &cancel)
        .await
        .unwrap();

    assert_eq!(
        host.modules().load_order(),
        vec![name("A"), name("B"), name("C")]
    );
}

#[tokio::test]
async fn test_batch_load_reports_unresolvable_dependencies() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    // C depends on B, which is never registered.
    host.modules().register_kind(kind_c(&log)).unwrap();
    let result = host.modules().load_batch(&[name("C")], &cancel).await;
    assert!(matches!(
        result,
        Err(ModuleError::MissingDependencies { .. })
    ));
    assert!(host.modules().load_order().is_empty());
}

#[tokio::test]
async fn test_unload_all_runs_in_reverse_load_order() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    host.modules().register_kind(kind_a(&log)).unwrap();
    host.modules().register_kind(kind_b(&log)).unwrap();
    host.modules().register_kind(kind_c(&log)).unwrap();
    host.modules().load_module(&name("A"), &cancel).await.unwrap();
    host.modules().load_module(&name("B"), &cancel).await.unwrap();
    host.modules().load_module(&name("C"), &cancel).await.unwrap();

    log.lock().clear();
    host.modules().unload_all(&cancel).await.unwrap();

    assert_eq!(*log.lock(), vec!["C:unload", "B:unload", "A:unload"]);
    assert!(host.modules().load_order().is_empty());
}

// ============================================================================
// TEST GROUP 2: Post-load phase
// ============================================================================

#[tokio::test]
async fn test_module_loaded_after_startup_post_loads_immediately() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    let log_d = Arc::clone(&log);
    host.modules()
        .register_kind(
            ModuleKind::builder("it::D")
                .constructor(vec![], move |_| {
                    let mut module = RecordingModule::new("D", &log_d);
                    module.capabilities = ModuleCapabilities::NONE.with_post_load();
                    Ok(Box::new(module))
                })
                .finish(),
        )
        .unwrap();

    // Startup phase completes with no modules loaded.
    host.modules().do_post_load(&cancel).await;
    assert!(log.lock().is_empty());

    // D loads after the phase: its post-load fires immediately.
    host.modules().load_module(&name("D"), &cancel).await.unwrap();
    assert_eq!(*log.lock(), vec!["D:load", "D:post_load"]);
    assert_eq!(
        host.modules().module_state(&name("D")),
        Some(ModuleState::PostLoaded)
    );
}

#[tokio::test]
async fn test_post_load_phase_runs_once_per_module() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    let log_d = Arc::clone(&log);
    host.modules()
        .register_kind(
            ModuleKind::builder("it::D")
                .constructor(vec![], move |_| {
                    let mut module = RecordingModule::new("D", &log_d);
                    module.capabilities =
                        ModuleCapabilities::NONE.with_post_load().with_pre_unload();
                    Ok(Box::new(module))
                })
                .finish(),
        )
        .unwrap();

    host.modules().load_module(&name("D"), &cancel).await.unwrap();
    host.modules().do_post_load(&cancel).await;
    host.modules().do_post_load(&cancel).await;

    assert_eq!(*log.lock(), vec!["D:load", "D:post_load"]);

    // Pre-unload mirrors it, in reverse order, exactly once.
    host.modules().do_pre_unload(&cancel).await;
    assert_eq!(*log.lock(), vec!["D:load", "D:post_load", "D:pre_unload"]);
    assert!(!host.modules().is_post_loaded());
}

// ============================================================================
// TEST GROUP 3: Arena attachment (scenario: attach X and Y, then unload)
// ============================================================================

fn attachable_kind(tag: &'static str, log: &EventLog) -> ModuleKind {
    let log = Arc::clone(log);
    ModuleKind::builder(format!("it::{tag}"))
        .constructor(vec![], move |_| {
            let mut module = RecordingModule::new(tag, &log);
            module.capabilities = ModuleCapabilities::NONE.with_arena_attach();
            Ok(Box::new(module))
        })
        .finish()
}

#[tokio::test]
async fn test_unload_fails_while_attached_then_succeeds_after_detach() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    host.modules().register_kind(attachable_kind("E", &log)).unwrap();
    host.modules().load_module(&name("E"), &cancel).await.unwrap();

    let x = host.create_arena(ArenaName::new("X")).unwrap();
    let y = host.create_arena(ArenaName::new("Y")).unwrap();
    host.modules().attach_module(&name("E"), &x, &cancel).await.unwrap();
    host.modules().attach_module(&name("E"), &y, &cancel).await.unwrap();

    let blocked = host.modules().unload_module(&name("E"), &cancel).await;
    match blocked {
        Err(ModuleError::StillAttached { arenas, .. }) => assert_eq!(arenas.len(), 2),
        other => panic!("expected StillAttached, got {other:?}"),
    }
    assert!(host.modules().is_loaded(&name("E")));

    host.modules().detach_module(&name("E"), &x, &cancel).await.unwrap();
    host.modules().detach_module(&name("E"), &y, &cancel).await.unwrap();
    host.modules().unload_module(&name("E"), &cancel).await.unwrap();
    assert!(!host.modules().load_order().contains(&name("E")));
}

#[tokio::test]
async fn test_attach_detach_round_trip_leaves_attached_set_unchanged() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    host.modules().register_kind(attachable_kind("E", &log)).unwrap();
    host.modules().load_module(&name("E"), &cancel).await.unwrap();
    let x = host.create_arena(ArenaName::new("X")).unwrap();

    let before = host.modules().module_info(&name("E")).unwrap().attached_arenas;
    host.modules().attach_module(&name("E"), &x, &cancel).await.unwrap();
    host.modules().detach_module(&name("E"), &x, &cancel).await.unwrap();
    let after = host.modules().module_info(&name("E")).unwrap().attached_arenas;

    assert_eq!(before, after);
    assert!(after.is_empty());
    assert_eq!(*log.lock(), vec!["E:load", "E:attach:X", "E:detach:X"]);
}

#[tokio::test]
async fn test_arena_teardown_detaches_every_attached_module() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    host.modules().register_kind(attachable_kind("E", &log)).unwrap();
    host.modules().register_kind(attachable_kind("F", &log)).unwrap();
    host.modules().load_module(&name("E"), &cancel).await.unwrap();
    host.modules().load_module(&name("F"), &cancel).await.unwrap();

    let x = host.create_arena(ArenaName::new("X")).unwrap();
    host.modules().attach_module(&name("E"), &x, &cancel).await.unwrap();
    host.modules().attach_module(&name("F"), &x, &cancel).await.unwrap();

    host.destroy_arena(&ArenaName::new("X"), &cancel).await.unwrap();

    for module in ["E", "F"] {
        let info = host.modules().module_info(&name(module)).unwrap();
        assert!(info.attached_arenas.is_empty());
    }
    assert!(host.arenas().is_empty());

    // Nothing attached anymore: single unloads go through directly.
    host.modules().unload_module(&name("E"), &cancel).await.unwrap();
    host.modules().unload_module(&name("F"), &cancel).await.unwrap();
}

// ============================================================================
// TEST GROUP 4: Plug-in contexts (scenario: load, unload, reload)
// ============================================================================

struct StubPackage {
    kinds: Vec<Arc<ModuleKind>>,
}

impl PluginPackage for StubPackage {
    fn kinds(&self) -> &[Arc<ModuleKind>] {
        &self.kinds
    }

    fn close(self: Box<Self>) -> Result<(), ModuleFault> {
        Ok(())
    }
}

struct StubLoader {
    log: EventLog,
}

impl PluginLoader for StubLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn PluginPackage>, ModuleFault> {
        let log = Arc::clone(&self.log);
        let q = ModuleKind::builder("plugin::Q")
            .description("plug-in module Q")
            .constructor(vec![], move |_| {
                Ok(Box::new(RecordingModule::new("Q", &log)))
            })
            .finish();
        let log = Arc::clone(&self.log);
        let r = ModuleKind::builder("plugin::R")
            .description("plug-in module R")
            .constructor(vec![], move |_| {
                Ok(Box::new(RecordingModule::new("R", &log)))
            })
            .finish();
        self.log.lock().push(format!("loader:{}", path.display()));
        Ok(Box::new(StubPackage {
            kinds: vec![Arc::new(q), Arc::new(r)],
        }))
    }
}

fn plugin_host(log: &EventLog) -> ZoneHost {
    ZoneHost::with_plugin_loader(
        HostConfig::default(),
        Arc::new(StubLoader {
            log: Arc::clone(log),
        }),
    )
    .unwrap()
}

fn plugin_event_counter(host: &ZoneHost, counter: &Arc<Mutex<u32>>) {
    let counter = Arc::clone(counter);
    let handler: CallbackFn<PluginLoaded> = Arc::new(move |_args| {
        *counter.lock() += 1;
    });
    // The registry keeps its own clone of the handler alive.
    host.root().register_callback::<PluginLoaded>(&handler);
}

#[tokio::test]
async fn test_same_path_loads_share_one_context() {
    let log: EventLog = EventLog::default();
    let host = plugin_host(&log);
    let cancel = CancellationToken::new();
    let events = Arc::new(Mutex::new(0u32));
    plugin_event_counter(&host, &events);

    let path = Path::new("./plugins/q.pkg");
    host.modules()
        .load_plugin_module(&ModuleName::new("plugin::Q"), path, &cancel)
        .await
        .unwrap();
    host.modules()
        .load_plugin_module(&ModuleName::new("plugin::R"), path, &cancel)
        .await
        .unwrap();

    assert_eq!(host.modules().plugin_context_count(), 1);
    assert_eq!(*events.lock(), 1);
}

#[tokio::test]
async fn test_reload_after_unload_builds_fresh_context() {
    let log: EventLog = EventLog::default();
    let host = plugin_host(&log);
    let cancel = CancellationToken::new();
    let events = Arc::new(Mutex::new(0u32));
    plugin_event_counter(&host, &events);

    let q = ModuleName::new("plugin::Q");
    let path = Path::new("./plugins/q.pkg");

    host.modules().load_plugin_module(&q, path, &cancel).await.unwrap();
    host.modules().unload_module(&q, &cancel).await.unwrap();
    // Last module gone: the context was dropped from the cache.
    assert_eq!(host.modules().plugin_context_count(), 0);

    host.modules().load_plugin_module(&q, path, &cancel).await.unwrap();
    assert_eq!(host.modules().plugin_context_count(), 1);
    // One PluginLoaded event per context load.
    assert_eq!(*events.lock(), 2);

    let info = host.modules().module_info(&q).unwrap();
    assert!(info.is_plugin);
    assert_eq!(info.package_path.as_deref(), Some(path));
}

// ============================================================================
// TEST GROUP 5: Invariants
// ============================================================================

#[tokio::test]
async fn test_pre_unload_plus_unload_all_leaves_zone_empty() {
    let log: EventLog = EventLog::default();
    let host = ZoneHost::new(HostConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    host.modules().register_kind(kind_a(&log)).unwrap();
    host.modules().register_kind(kind_b(&log)).unwrap();
    host.modules().load_module(&name("A"), &cancel).await.unwrap();
    host.modules().load_module(&name("B"), &cancel).await.unwrap();
    host.modules().do_post_load(&cancel).await;

    // Core registries stay; everything module-originated must go.
    let baseline = 2;
    assert_eq!(host.root().service_count(), baseline + 2);

    host.modules().do_pre_unload(&cancel).await;
    host.modules().unload_all(&cancel).await.unwrap();

    assert!(host.modules().load_order().is_empty());
    assert_eq!(host.root().service_count(), baseline);
}
