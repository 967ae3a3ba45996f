//! Module kinds: constructible module types with dependency manifests.
//!
//! Instead of probing constructors reflectively, every module kind ships
//! one or more **constructor candidates**. Each candidate declares a
//! manifest of service dependencies and a build closure that receives the
//! resolved services. The manager tries candidates in descending manifest
//! length and constructs with the first one whose every dependency
//! resolves on the root broker.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::{Module, ModuleFault};
use crate::broker::{Broker, ErasedService, ServiceApi, ServiceHandle, ServiceKind};
use crate::util::ModuleName;

/// One entry of a constructor manifest: a service kind plus an optional
/// disambiguation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDependency {
    /// The interface contract to resolve.
    pub kind: ServiceKind,
    /// Disambiguation key, when several providers of the kind coexist.
    pub key: Option<&'static str>,
}

impl ServiceDependency {
    /// A dependency on the unkeyed provider of `kind`.
    pub const fn on(kind: ServiceKind) -> Self {
        Self { kind, key: None }
    }

    /// A dependency on a keyed provider of `kind`.
    pub const fn on_keyed(kind: ServiceKind, key: &'static str) -> Self {
        Self { kind, key: Some(key) }
    }
}

/// The services resolved for one constructor candidate, in manifest order.
///
/// The build closure pulls its typed dependencies out of the set; after
/// construction the manager keeps the set's reference-counting handles for
/// the lifetime of the module and releases them in reverse order on
/// unload.
pub struct ServiceSet {
    entries: Vec<ErasedService>,
}

impl ServiceSet {
    pub(crate) fn new(entries: Vec<ErasedService>) -> Self {
        Self { entries }
    }

    /// Typed access to the first resolved dependency of kind `I::KIND`.
    pub fn get<I: ServiceApi + ?Sized>(&self) -> Option<Arc<I>> {
        self.entries
            .iter()
            .find(|entry| entry.kind() == I::KIND)
            .and_then(ErasedService::downcast::<I>)
    }

    /// Typed access to the resolved dependency of kind `I::KIND` under the
    /// given key.
    pub fn get_keyed<I: ServiceApi + ?Sized>(&self, key: &str) -> Option<Arc<I>> {
        self.entries
            .iter()
            .find(|entry| entry.kind() == I::KIND && entry.key() == Some(key))
            .and_then(ErasedService::downcast::<I>)
    }

    /// Number of resolved dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Strip the typed payloads, keeping the reference-count guards in
    /// acquisition order.
    pub(crate) fn into_handles(self) -> Vec<ServiceHandle> {
        self.entries
            .into_iter()
            .map(ErasedService::into_handle)
            .collect()
    }
}

type BuildFn = Box<dyn Fn(&ServiceSet) -> Result<Box<dyn Module>, ModuleFault> + Send + Sync>;

/// One constructor variant of a module kind.
pub struct ConstructorCandidate {
    manifest: Vec<ServiceDependency>,
    build: BuildFn,
}

impl ConstructorCandidate {
    /// The candidate's dependency manifest, in acquisition order.
    pub fn manifest(&self) -> &[ServiceDependency] {
        &self.manifest
    }

    pub(crate) fn build(&self, services: &ServiceSet) -> Result<Box<dyn Module>, ModuleFault> {
        (self.build)(services)
    }
}

/// A registered, constructible module type.
///
/// # Example
///
/// ```rust,ignore
/// let kind = ModuleKind::builder("subspace_chat::ChatModule")
///     .description("chat with flood control")
///     .constructor(
///         vec![ServiceDependency::on(<dyn SettingsProvider as ServiceApi>::KIND)],
///         |services| {
///             let settings = services
///                 .get::<dyn SettingsProvider>()
///                 .ok_or("settings provider missing")?;
///             Ok(Box::new(ChatModule::new(settings)))
///         },
///     )
///     .finish();
/// ```
pub struct ModuleKind {
    name: ModuleName,
    description: String,
    candidates: Vec<ConstructorCandidate>,
}

impl ModuleKind {
    /// Start building a module kind.
    pub fn builder(name: impl Into<ModuleName>) -> ModuleKindBuilder {
        ModuleKindBuilder {
            name: name.into(),
            description: String::new(),
            candidates: Vec::new(),
        }
    }

    /// The kind's stable identity.
    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    /// Human-readable description of the kind.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Constructor candidates in descending manifest length.
    pub fn candidates(&self) -> &[ConstructorCandidate] {
        &self.candidates
    }
}

impl std::fmt::Debug for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleKind")
            .field("name", &self.name)
            .field("candidates", &self.candidates.len())
            .finish()
    }
}

/// Builder for [`ModuleKind`].
pub struct ModuleKindBuilder {
    name: ModuleName,
    description: String,
    candidates: Vec<ConstructorCandidate>,
}

impl ModuleKindBuilder {
    /// Set the human-readable description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a constructor candidate with the given dependency manifest.
    pub fn constructor(
        mut self,
        manifest: Vec<ServiceDependency>,
        build: impl Fn(&ServiceSet) -> Result<Box<dyn Module>, ModuleFault> + Send + Sync + 'static,
    ) -> Self {
        self.candidates.push(ConstructorCandidate {
            manifest,
            build: Box::new(build),
        });
        self
    }

    /// Finish the kind. Candidates are ordered by descending manifest
    /// length so resolution prefers the most-dependent variant that can be
    /// satisfied.
    pub fn finish(mut self) -> ModuleKind {
        self.candidates
            .sort_by(|a, b| b.manifest.len().cmp(&a.manifest.len()));
        ModuleKind {
            name: self.name,
            description: self.description,
            candidates: self.candidates,
        }
    }
}

/// Resolve one candidate's manifest against a broker.
///
/// On a partial failure every already-acquired service is released (by
/// dropping the set under construction) and `None` is returned so the
/// caller can try the next candidate.
pub(crate) fn resolve_manifest(broker: &Broker, manifest: &[ServiceDependency]) -> Option<ServiceSet> {
    let mut entries = Vec::with_capacity(manifest.len());
    for dependency in manifest {
        match broker.get_service_erased(dependency.kind, dependency.key) {
            Some(service) => entries.push(service),
            None => return None,
        }
    }
    Some(ServiceSet::new(entries))
}
