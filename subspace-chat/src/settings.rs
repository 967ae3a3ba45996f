//! The settings provider service and its module.
//!
//! Game modules read their configuration through the [`SettingsProvider`]
//! interface rather than touching files themselves. The provider here is
//! an in-memory map of dotted keys (`chat.flood-limit`) with typed
//! accessors, loadable from a TOML document where tables become key
//! prefixes.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use subspace_rt::broker::{Broker, ServiceApi, ServiceKind};
use subspace_rt::module::{Module, ModuleFault, ModuleKind};

/// String-keyed configuration lookup with typed accessors.
///
/// Keys are dotted paths (`chat.flood-limit`). Typed accessors fall back
/// to the given default when the key is absent or unparsable, so module
/// code never branches on configuration errors.
pub trait SettingsProvider: Send + Sync {
    /// Raw lookup.
    fn get(&self, key: &str) -> Option<String>;

    /// Integer lookup with a default.
    fn get_u32(&self, key: &str, default: u32) -> u32 {
        self.get(key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Boolean lookup with a default. Accepts `true`/`false`/`1`/`0`.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).as_deref().map(str::trim) {
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            _ => default,
        }
    }

    /// Whole-second duration lookup with a default.
    fn get_seconds(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|raw| raw.trim().parse().ok())
            .map_or(default, Duration::from_secs)
    }
}

impl ServiceApi for dyn SettingsProvider {
    const KIND: ServiceKind = ServiceKind::new("subspace.settings");
}

/// In-memory settings map.
pub struct InMemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySettings {
    /// Create an empty settings map.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Parse a TOML document into dotted keys.
    ///
    /// Tables nest into key prefixes: `[chat] flood-limit = 10` becomes
    /// `chat.flood-limit = "10"`.
    pub fn from_toml(text: &str) -> Result<Self, ModuleFault> {
        let document: toml::Value = toml::from_str(text)?;
        let settings = Self::new();
        flatten_value(None, &document, &mut settings.values.write());
        Ok(settings)
    }

    /// Set one key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl Default for InMemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsProvider for InMemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

fn flatten_value(prefix: Option<&str>, value: &toml::Value, out: &mut HashMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (name, nested) in table {
                let key = match prefix {
                    Some(prefix) => format!("{prefix}.{name}"),
                    None => name.clone(),
                };
                flatten_value(Some(&key), nested, out);
            }
        }
        toml::Value::String(text) => {
            if let Some(key) = prefix {
                out.insert(key.to_string(), text.clone());
            }
        }
        other => {
            if let Some(key) = prefix {
                out.insert(key.to_string(), other.to_string());
            }
        }
    }
}

/// Module providing the [`SettingsProvider`] service.
///
/// Reads the optional TOML file it was constructed with at load time;
/// without a file it provides an empty map (every consumer then runs on
/// its defaults).
pub struct SettingsModule {
    path: Option<PathBuf>,
    provider: Option<Arc<InMemorySettings>>,
}

impl SettingsModule {
    /// A module serving an empty settings map.
    pub fn new() -> Self {
        Self {
            path: None,
            provider: None,
        }
    }

    /// A module serving settings parsed from the TOML file at `path`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            provider: None,
        }
    }

    /// A module serving a pre-built settings map.
    pub fn with_settings(settings: InMemorySettings) -> Self {
        Self {
            path: None,
            provider: Some(Arc::new(settings)),
        }
    }
}

impl Default for SettingsModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for SettingsModule {
    async fn load(
        &mut self,
        zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        if self.provider.is_none() {
            let settings = match &self.path {
                Some(path) => {
                    let text = std::fs::read_to_string(path)?;
                    InMemorySettings::from_toml(&text)?
                }
                None => InMemorySettings::new(),
            };
            self.provider = Some(Arc::new(settings));
        }
        let provider = self
            .provider
            .as_ref()
            .map(|p| Arc::clone(p) as Arc<dyn SettingsProvider>)
            .ok_or("settings provider missing after construction")?;
        zone.register_service::<dyn SettingsProvider>(provider, None)?;
        tracing::debug!("settings provider registered");
        Ok(())
    }

    async fn unload(
        &mut self,
        zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        if let Some(provider) = self.provider.take() {
            let provider = provider as Arc<dyn SettingsProvider>;
            zone.unregister_service::<dyn SettingsProvider>(&provider, None)?;
        }
        Ok(())
    }
}

/// The registerable kind for [`SettingsModule`] with no backing file.
pub fn settings_module_kind() -> ModuleKind {
    ModuleKind::builder("subspace_chat::SettingsModule")
        .description("string-keyed settings provider")
        .constructor(vec![], |_| Ok(Box::new(SettingsModule::new())))
        .finish()
}
