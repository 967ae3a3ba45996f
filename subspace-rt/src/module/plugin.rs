//! Isolated plug-in load contexts.
//!
//! A plug-in package is a dynamic library that exports a registrar
//! function returning the module kinds it contains. Each package is
//! loaded into its own context, cached by canonical path so same-path
//! loads share one context. When the last module from a context unloads,
//! the context is dropped from the cache and the library close is
//! attempted best-effort: dynamic library unloading is unreliable on some
//! platforms, so nothing depends on it succeeding.

// Layer 1: Standard library imports
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use libloading::Library;
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::kind::ModuleKind;
use super::traits::ModuleFault;
use crate::broker::Callback;

/// Symbol every plug-in package exports.
///
/// The symbol is a `fn() -> Vec<ModuleKind>` returning the module kinds
/// the package contributes.
pub const MODULE_EXPORTS_SYMBOL: &[u8] = b"subspace_module_exports";

/// Signature of the registrar function behind [`MODULE_EXPORTS_SYMBOL`].
pub type ModuleExportsFn = fn() -> Vec<ModuleKind>;

/// A loaded plug-in package: its module kinds plus a best-effort closer.
pub trait PluginPackage: Send + Sync {
    /// The module kinds this package contributes.
    fn kinds(&self) -> &[Arc<ModuleKind>];

    /// Close the package, releasing the underlying library if possible.
    fn close(self: Box<Self>) -> Result<(), ModuleFault>;
}

/// The seam between the context cache and the platform loader.
///
/// Production uses [`LibraryLoader`]; tests inject a stub so the cache and
/// reload semantics are observable without building a real dynamic
/// library.
pub trait PluginLoader: Send + Sync + 'static {
    /// Load the package at `path`.
    fn load(&self, path: &Path) -> Result<Box<dyn PluginPackage>, ModuleFault>;
}

/// Dynamic-library loader backed by `libloading`.
pub struct LibraryLoader;

struct LibraryPackage {
    kinds: Vec<Arc<ModuleKind>>,
    library: Library,
}

impl PluginPackage for LibraryPackage {
    fn kinds(&self) -> &[Arc<ModuleKind>] {
        &self.kinds
    }

    fn close(self: Box<Self>) -> Result<(), ModuleFault> {
        self.library.close().map_err(Into::into)
    }
}

impl PluginLoader for LibraryLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn PluginPackage>, ModuleFault> {
        // SAFETY: loading a library runs its initializers; packages are
        // deployed by the operator and trusted like built-in code.
        let library = unsafe { Library::new(path) }?;
        let exports: ModuleExportsFn = {
            // SAFETY: the registrar symbol is declared with this exact
            // signature by the plug-in ABI.
            let symbol = unsafe { library.get::<ModuleExportsFn>(MODULE_EXPORTS_SYMBOL) }?;
            *symbol
        };
        let kinds = exports().into_iter().map(Arc::new).collect();
        Ok(Box::new(LibraryPackage { kinds, library }))
    }
}

/// One isolated load context: a cached plug-in package keyed by path.
pub struct PluginContext {
    key: String,
    path: PathBuf,
    kinds: Vec<Arc<ModuleKind>>,
    package: Mutex<Option<Box<dyn PluginPackage>>>,
}

impl PluginContext {
    /// Cache key (canonical, case-folded path).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The package path as given to the loader.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The module kinds this context contributes.
    pub fn kinds(&self) -> &[Arc<ModuleKind>] {
        &self.kinds
    }

    /// Find a contributed kind by name.
    pub fn find_kind(&self, name: &crate::util::ModuleName) -> Option<Arc<ModuleKind>> {
        self.kinds
            .iter()
            .find(|kind| kind.name() == name)
            .map(Arc::clone)
    }
}

/// The `(canonical path → context)` cache, alive for the process lifetime.
pub struct PluginContexts {
    loader: Arc<dyn PluginLoader>,
    contexts: DashMap<String, Arc<PluginContext>>,
}

impl PluginContexts {
    /// Create an empty cache over the given loader.
    pub fn new(loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            loader,
            contexts: DashMap::new(),
        }
    }

    /// Canonical cache key for a package path.
    ///
    /// Canonicalization resolves symlinks and relative segments; on
    /// case-insensitive filesystems the key is additionally case-folded so
    /// differently-cased spellings share one context.
    pub fn canonical_key(path: &Path) -> String {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let key = canonical.to_string_lossy().into_owned();
        if cfg!(any(windows, target_os = "macos")) {
            key.to_lowercase()
        } else {
            key
        }
    }

    /// Get the cached context for `path`, loading it on a miss.
    ///
    /// Returns the context and whether this call freshly loaded it (so the
    /// caller can fire the loaded notification exactly once per context).
    pub fn get_or_load(
        &self,
        path: &Path,
    ) -> Result<(Arc<PluginContext>, bool), ModuleFault> {
        let key = Self::canonical_key(path);
        if let Some(context) = self.contexts.get(&key) {
            return Ok((Arc::clone(&context), false));
        }

        let package = self.loader.load(path)?;
        let context = Arc::new(PluginContext {
            key: key.clone(),
            path: path.to_path_buf(),
            kinds: package.kinds().to_vec(),
            package: Mutex::new(Some(package)),
        });
        // Two racing loaders of the same path keep the first insertion.
        let entry = self
            .contexts
            .entry(key)
            .or_insert_with(|| Arc::clone(&context));
        let fresh = Arc::ptr_eq(entry.value(), &context);
        let context = Arc::clone(entry.value());
        drop(entry);
        Ok((context, fresh))
    }

    /// Look up a cached context without loading.
    pub fn get(&self, key: &str) -> Option<Arc<PluginContext>> {
        self.contexts.get(key).map(|c| Arc::clone(c.value()))
    }

    /// Drop a context from the cache and close its package best-effort.
    ///
    /// The cache entry is removed regardless of the close outcome; a close
    /// failure is logged and otherwise ignored.
    pub fn unload(&self, key: &str) {
        let Some((_, context)) = self.contexts.remove(key) else {
            return;
        };
        let package = context.package.lock().take();
        match package.map(PluginPackage::close) {
            Some(Err(error)) => {
                tracing::warn!(
                    context = key,
                    error = %error,
                    "plug-in context close failed; continuing without it"
                );
            }
            _ => {
                tracing::debug!(context = key, "plug-in context unloaded");
            }
        }
    }

    /// Number of cached contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Arguments of the plug-in context callbacks.
pub struct PluginEventArgs {
    /// The package path of the affected context.
    pub path: PathBuf,
}

/// Fired on the root broker when a plug-in context is freshly loaded.
pub struct PluginLoaded;

impl Callback for PluginLoaded {
    const NAME: &'static str = "plugin_loaded";
    type Args = PluginEventArgs;
}

/// Fired on the root broker right before a plug-in context is dropped.
pub struct PluginUnloading;

impl Callback for PluginUnloading {
    const NAME: &'static str = "plugin_unloading";
    type Args = PluginEventArgs;
}
