//! Host configuration with sensible defaults.

// Layer 1: Standard library
use std::path::PathBuf;
use std::time::Duration;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
// (none)

/// Default quarantine before a retired player id is reused (10 seconds)
pub const DEFAULT_PLAYER_REUSE_DELAY: Duration = Duration::from_secs(10);

/// Default capacity of the per-player slot table
pub const DEFAULT_PLAYER_SLOT_CAPACITY: usize = 64;

/// Default capacity of the per-arena slot table
pub const DEFAULT_ARENA_SLOT_CAPACITY: usize = 64;

/// Zone-wide configuration for the module runtime.
///
/// # Examples
///
/// ```rust
/// use subspace_rt::system::{HostConfig, DEFAULT_PLAYER_SLOT_CAPACITY};
/// use std::time::Duration;
///
/// // Use default configuration
/// let config = HostConfig::default();
/// assert_eq!(config.player_slot_capacity, DEFAULT_PLAYER_SLOT_CAPACITY);
///
/// // Use builder for custom configuration
/// let config = HostConfig::builder()
///     .with_player_reuse_delay(Duration::from_secs(30))
///     .with_player_slot_capacity(128)
///     .build()
///     .unwrap();
/// assert_eq!(config.player_slot_capacity, 128);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Quarantine before a retired player id may be handed out again
    pub player_reuse_delay: Duration,

    /// Path of the module-list description consumed by an external loader
    /// module; the core does not read it itself
    pub module_config_file: Option<PathBuf>,

    /// Capacity of the per-player slot table
    pub player_slot_capacity: usize,

    /// Capacity of the per-arena slot table
    pub arena_slot_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            player_reuse_delay: DEFAULT_PLAYER_REUSE_DELAY,
            module_config_file: None,
            player_slot_capacity: DEFAULT_PLAYER_SLOT_CAPACITY,
            arena_slot_capacity: DEFAULT_ARENA_SLOT_CAPACITY,
        }
    }
}

impl HostConfig {
    /// Create a new configuration builder.
    pub fn builder() -> HostConfigBuilder {
        HostConfigBuilder::default()
    }

    /// Validate configuration values.
    ///
    /// Returns `Err` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.player_slot_capacity == 0 {
            return Err("player_slot_capacity must be > 0".to_string());
        }
        if self.arena_slot_capacity == 0 {
            return Err("arena_slot_capacity must be > 0".to_string());
        }
        Ok(())
    }
}

/// Builder for HostConfig with fluent API.
#[derive(Debug, Default)]
pub struct HostConfigBuilder {
    player_reuse_delay: Option<Duration>,
    module_config_file: Option<PathBuf>,
    player_slot_capacity: Option<usize>,
    arena_slot_capacity: Option<usize>,
}

impl HostConfigBuilder {
    /// Set the player-id reuse quarantine.
    pub fn with_player_reuse_delay(mut self, delay: Duration) -> Self {
        self.player_reuse_delay = Some(delay);
        self
    }

    /// Set the module-list description path.
    pub fn with_module_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_config_file = Some(path.into());
        self
    }

    /// Set the per-player slot table capacity.
    pub fn with_player_slot_capacity(mut self, capacity: usize) -> Self {
        self.player_slot_capacity = Some(capacity);
        self
    }

    /// Set the per-arena slot table capacity.
    pub fn with_arena_slot_capacity(mut self, capacity: usize) -> Self {
        self.arena_slot_capacity = Some(capacity);
        self
    }

    /// Build the configuration, validating the result.
    pub fn build(self) -> Result<HostConfig, String> {
        let config = HostConfig {
            player_reuse_delay: self
                .player_reuse_delay
                .unwrap_or(DEFAULT_PLAYER_REUSE_DELAY),
            module_config_file: self.module_config_file,
            player_slot_capacity: self
                .player_slot_capacity
                .unwrap_or(DEFAULT_PLAYER_SLOT_CAPACITY),
            arena_slot_capacity: self
                .arena_slot_capacity
                .unwrap_or(DEFAULT_ARENA_SLOT_CAPACITY),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HostConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.player_reuse_delay, DEFAULT_PLAYER_REUSE_DELAY);
        assert!(config.module_config_file.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = HostConfig::builder()
            .with_player_reuse_delay(Duration::from_secs(1))
            .with_module_config_file("conf/modules.toml")
            .with_arena_slot_capacity(8)
            .build()
            .unwrap();
        assert_eq!(config.player_reuse_delay, Duration::from_secs(1));
        assert_eq!(
            config.module_config_file.as_deref(),
            Some(std::path::Path::new("conf/modules.toml"))
        );
        assert_eq!(config.arena_slot_capacity, 8);
        assert_eq!(config.player_slot_capacity, DEFAULT_PLAYER_SLOT_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = HostConfig::builder().with_player_slot_capacity(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = HostConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: HostConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.player_slot_capacity, config.player_slot_capacity);
    }
}
