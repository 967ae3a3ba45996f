//! The chat module: message fan-out with per-player flood control.
//!
//! Demonstrates the full shape of a game module: a dependency manifest
//! (settings plus the entity registries), a zone-wide service interface,
//! per-player and per-arena extra-data slots, arena attachment, and
//! arena-scoped callback publishing.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use crate::settings::SettingsProvider;
use subspace_rt::arena::{Arena, ArenaRegistry};
use subspace_rt::broker::{Broker, Callback, CallbackFn, ServiceApi, ServiceKind};
use subspace_rt::module::{
    Module, ModuleCapabilities, ModuleFault, ModuleKind, ServiceDependency,
};
use subspace_rt::player::{Player, PlayerRegistry};
use subspace_rt::slots::{SlotHooks, SlotKey};
use subspace_rt::util::{ArenaName, PlayerId};

/// Chat configuration, read once at module load.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Messages allowed inside one decay window before a shutup.
    pub flood_limit: u32,
    /// How long a flooding player is muted; repeat floods extend the
    /// expiry by this much again.
    pub flood_shutup: Duration,
    /// Commands allowed inside one decay window.
    pub command_limit: u32,
    /// Whether chat messages go out on the reliable channel.
    pub message_reliable: bool,
}

impl ChatConfig {
    /// Read the configuration from a settings provider, defaulting every
    /// absent key.
    pub fn from_settings(settings: &dyn SettingsProvider) -> Self {
        Self {
            flood_limit: settings.get_u32("chat.flood-limit", 10),
            flood_shutup: settings.get_seconds("chat.flood-shutup", Duration::from_secs(60)),
            command_limit: settings.get_u32("chat.command-limit", 5),
            message_reliable: settings.get_bool("chat.message-reliable", true),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            flood_limit: 10,
            flood_shutup: Duration::from_secs(60),
            command_limit: 5,
            message_reliable: true,
        }
    }
}

/// Verdict on one submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatVerdict {
    /// The message goes out.
    Delivered,
    /// The player is muted until the given time.
    Muted {
        /// When the mute expires.
        until: DateTime<Utc>,
    },
    /// The command budget is spent; the command is dropped.
    TooManyCommands,
}

/// Per-player chat counters, stored in an extra-data slot.
///
/// The message counter decays exponentially: each elapsed second halves
/// it (shift clamped to 31), so a quiet player's budget recovers quickly
/// while a steady flooder's does not.
#[derive(Debug)]
pub struct ChatCounters {
    messages: u32,
    commands: u32,
    last_check: DateTime<Utc>,
    shutup_until: Option<DateTime<Utc>>,
}

impl ChatCounters {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            messages: 0,
            commands: 0,
            last_check: now,
            shutup_until: None,
        }
    }

    fn decay(&mut self, now: DateTime<Utc>) {
        let elapsed = (now - self.last_check).num_seconds().clamp(0, 31) as u32;
        self.messages >>= elapsed;
        self.commands >>= elapsed;
        self.last_check = now;
    }

    /// Account one chat message at `now`.
    pub fn note_message(&mut self, now: DateTime<Utc>, config: &ChatConfig) -> ChatVerdict {
        self.decay(now);
        self.messages = self.messages.saturating_add(1);
        let flooding = self.messages > config.flood_limit;

        if let Some(until) = self.shutup_until {
            if now < until {
                if flooding {
                    // Flooding through an active mute extends the expiry
                    // by the shutup duration.
                    let extended = until + shutup_delta(config);
                    self.shutup_until = Some(extended);
                    return ChatVerdict::Muted { until: extended };
                }
                return ChatVerdict::Muted { until };
            }
            self.shutup_until = None;
        }

        if flooding {
            let until = now + shutup_delta(config);
            self.shutup_until = Some(until);
            return ChatVerdict::Muted { until };
        }
        ChatVerdict::Delivered
    }

    /// Account one command at `now`.
    pub fn note_command(&mut self, now: DateTime<Utc>, config: &ChatConfig) -> ChatVerdict {
        self.decay(now);
        self.commands = self.commands.saturating_add(1);
        if self.commands > config.command_limit {
            return ChatVerdict::TooManyCommands;
        }
        ChatVerdict::Delivered
    }

    fn reset(&mut self) {
        self.messages = 0;
        self.commands = 0;
        self.shutup_until = None;
    }
}

fn shutup_delta(config: &ChatConfig) -> chrono::Duration {
    chrono::Duration::from_std(config.flood_shutup)
        .unwrap_or_else(|_| chrono::Duration::seconds(60))
}

/// Per-arena chat statistics, stored in an extra-data slot.
#[derive(Debug, Default)]
pub struct ArenaChatStats {
    /// Messages delivered into this arena.
    pub delivered: u64,
}

/// Arguments of the [`ChatMessage`] callback.
pub struct ChatMessageArgs {
    /// The sender, when the message came from a player.
    pub player: Option<PlayerId>,
    /// The message text.
    pub text: String,
    /// Whether delivery should use the reliable channel.
    pub reliable: bool,
}

/// Fired on an arena broker for every message delivered into that arena.
pub struct ChatMessage;

impl Callback for ChatMessage {
    const NAME: &'static str = "chat_message";
    type Args = ChatMessageArgs;
}

/// Zone-wide chat service.
pub trait Chat: Send + Sync {
    /// Apply flood control to a player's message; `Delivered` means the
    /// caller may fan it out.
    fn submit(&self, player: &Player, text: &str) -> ChatVerdict;

    /// Deliver a message into an arena: fires [`ChatMessage`] on that
    /// arena's broker only.
    fn announce(&self, arena: &Arena, player: Option<PlayerId>, text: &str);

    /// Messages delivered into an arena the module is attached to.
    fn delivered_in(&self, arena: &Arena) -> u64;

    /// The active configuration.
    fn config(&self) -> ChatConfig;
}

impl ServiceApi for dyn Chat {
    const KIND: ServiceKind = ServiceKind::new("subspace.chat");
}

struct ChatService {
    config: ChatConfig,
    counters_key: SlotKey<ChatCounters>,
    stats_key: SlotKey<ArenaChatStats>,
}

impl Chat for ChatService {
    fn submit(&self, player: &Player, text: &str) -> ChatVerdict {
        let now = Utc::now();
        let is_command = text.starts_with('?');
        let verdict = player
            .extra_data()
            .with(self.counters_key, |counters| {
                if is_command {
                    counters.note_command(now, &self.config)
                } else {
                    counters.note_message(now, &self.config)
                }
            })
            .unwrap_or(ChatVerdict::Delivered);
        if verdict != ChatVerdict::Delivered {
            tracing::debug!(player = %player.id(), ?verdict, "chat message suppressed");
        }
        verdict
    }

    fn announce(&self, arena: &Arena, player: Option<PlayerId>, text: &str) {
        arena.broker().fire::<ChatMessage>(&ChatMessageArgs {
            player,
            text: text.to_string(),
            reliable: self.config.message_reliable,
        });
    }

    fn delivered_in(&self, arena: &Arena) -> u64 {
        arena
            .extra_data()
            .with(self.stats_key, |stats| stats.delivered)
            .unwrap_or(0)
    }

    fn config(&self) -> ChatConfig {
        self.config.clone()
    }
}

/// The chat module.
///
/// Load: reads its configuration, allocates the per-player counter slot
/// and the per-arena stats slot, and registers the [`Chat`] service.
/// Attach: subscribes an arena-scoped [`ChatMessage`] handler that counts
/// deliveries into the arena's stats slot. Unload undoes all of it.
pub struct ChatModule {
    settings: Arc<dyn SettingsProvider>,
    players: Arc<PlayerRegistry>,
    arenas: Arc<ArenaRegistry>,
    service: Option<Arc<ChatService>>,
    counters_key: Option<SlotKey<ChatCounters>>,
    stats_key: Option<SlotKey<ArenaChatStats>>,
    arena_handlers: Mutex<HashMap<ArenaName, CallbackFn<ChatMessage>>>,
}

impl ChatModule {
    /// Wire the module from its resolved dependencies.
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        players: Arc<PlayerRegistry>,
        arenas: Arc<ArenaRegistry>,
    ) -> Self {
        Self {
            settings,
            players,
            arenas,
            service: None,
            counters_key: None,
            stats_key: None,
            arena_handlers: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Module for ChatModule {
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities::NONE.with_arena_attach()
    }

    async fn load(
        &mut self,
        zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        let config = ChatConfig::from_settings(self.settings.as_ref());
        tracing::info!(?config, "chat module loading");

        let counters_key = self
            .players
            .allocate_data(SlotHooks::new(|| ChatCounters::new(Utc::now())).on_reset(
                |counters| {
                    counters.reset();
                },
            ))?;
        let stats_key = match self.arenas.allocate_data(SlotHooks::<ArenaChatStats>::default())
        {
            Ok(key) => key,
            Err(error) => {
                self.players.free_data(counters_key)?;
                return Err(error.into());
            }
        };

        let service = Arc::new(ChatService {
            config,
            counters_key,
            stats_key,
        });
        zone.register_service::<dyn Chat>(Arc::clone(&service) as Arc<dyn Chat>, None)?;

        self.counters_key = Some(counters_key);
        self.stats_key = Some(stats_key);
        self.service = Some(service);
        Ok(())
    }

    async fn unload(
        &mut self,
        zone: &Arc<Broker>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        if let Some(service) = self.service.take() {
            let service = service as Arc<dyn Chat>;
            zone.unregister_service::<dyn Chat>(&service, None)?;
        }
        if let Some(key) = self.counters_key.take() {
            self.players.free_data(key)?;
        }
        if let Some(key) = self.stats_key.take() {
            self.arenas.free_data(key)?;
        }
        Ok(())
    }

    async fn attach_arena(
        &mut self,
        arena: &Arc<Arena>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        let stats_key = self.stats_key.ok_or("chat module not loaded")?;
        let weak: Weak<Arena> = Arc::downgrade(arena);
        let handler: CallbackFn<ChatMessage> = Arc::new(move |_args| {
            if let Some(arena) = weak.upgrade() {
                arena.extra_data().with(stats_key, |stats| {
                    stats.delivered += 1;
                });
            }
        });
        arena.broker().register_callback::<ChatMessage>(&handler);
        self.arena_handlers
            .lock()
            .insert(arena.name().clone(), handler);
        Ok(())
    }

    async fn detach_arena(
        &mut self,
        arena: &Arc<Arena>,
        _cancel: &CancellationToken,
    ) -> Result<(), ModuleFault> {
        if let Some(handler) = self.arena_handlers.lock().remove(arena.name()) {
            arena.broker().unregister_callback::<ChatMessage>(&handler);
        }
        Ok(())
    }
}

/// The registerable kind for [`ChatModule`].
///
/// Manifest: settings provider, player registry, arena registry; all
/// resolved from the root broker.
pub fn chat_module_kind() -> ModuleKind {
    ModuleKind::builder("subspace_chat::ChatModule")
        .description("chat fan-out with flood control")
        .constructor(
            vec![
                ServiceDependency::on(<dyn SettingsProvider as ServiceApi>::KIND),
                ServiceDependency::on(<PlayerRegistry as ServiceApi>::KIND),
                ServiceDependency::on(<ArenaRegistry as ServiceApi>::KIND),
            ],
            |services| {
                let settings = services
                    .get::<dyn SettingsProvider>()
                    .ok_or("settings provider missing")?;
                let players = services
                    .get::<PlayerRegistry>()
                    .ok_or("player registry missing")?;
                let arenas = services
                    .get::<ArenaRegistry>()
                    .ok_or("arena registry missing")?;
                Ok(Box::new(ChatModule::new(settings, players, arenas)))
            },
        )
        .finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().unwrap()
    }

    fn config() -> ChatConfig {
        ChatConfig {
            flood_limit: 3,
            flood_shutup: Duration::from_secs(60),
            command_limit: 2,
            message_reliable: true,
        }
    }

    #[test]
    fn test_messages_within_limit_are_delivered() {
        let config = config();
        let mut counters = ChatCounters::new(at(0));
        for _ in 0..3 {
            assert_eq!(counters.note_message(at(0), &config), ChatVerdict::Delivered);
        }
    }

    #[test]
    fn test_flood_triggers_shutup() {
        let config = config();
        let mut counters = ChatCounters::new(at(0));
        for _ in 0..3 {
            counters.note_message(at(0), &config);
        }
        let verdict = counters.note_message(at(0), &config);
        assert_eq!(
            verdict,
            ChatVerdict::Muted {
                until: at(60)
            }
        );
    }

    #[test]
    fn test_repeat_flood_extends_expiry_by_shutup_duration() {
        let config = config();

        // Flooding through an active mute extends from the recorded
        // expiry, not from now: t+60 becomes t+120.
        let mut counters = ChatCounters::new(at(0));
        for _ in 0..4 {
            counters.note_message(at(0), &config);
        }
        assert_eq!(
            counters.note_message(at(0), &config),
            ChatVerdict::Muted { until: at(120) }
        );

        // A quiet muted player does not extend: the counter has decayed
        // by t+30, so the mute just keeps its recorded expiry.
        let mut muted = ChatCounters::new(at(0));
        for _ in 0..4 {
            muted.note_message(at(0), &config);
        }
        assert_eq!(
            muted.note_message(at(30), &config),
            ChatVerdict::Muted { until: at(60) }
        );

        // After the expiry passes the budget is fresh again.
        let mut expired = ChatCounters::new(at(0));
        for _ in 0..4 {
            expired.note_message(at(0), &config);
        }
        assert_eq!(
            expired.note_message(at(61), &config),
            ChatVerdict::Delivered
        );
    }

    #[test]
    fn test_counter_decays_exponentially() {
        let config = config();
        let mut counters = ChatCounters::new(at(0));
        for _ in 0..3 {
            counters.note_message(at(0), &config);
        }
        // Two seconds halve the counter twice (3 >> 2 == 0), so the
        // budget is fresh.
        assert_eq!(counters.note_message(at(2), &config), ChatVerdict::Delivered);
    }

    #[test]
    fn test_decay_shift_is_clamped() {
        let config = config();
        let mut counters = ChatCounters::new(at(0));
        counters.note_message(at(0), &config);
        // A gap far beyond 31 seconds must not overflow the shift.
        assert_eq!(
            counters.note_message(at(1_000_000), &config),
            ChatVerdict::Delivered
        );
    }

    #[test]
    fn test_command_budget_is_separate() {
        let config = config();
        let mut counters = ChatCounters::new(at(0));
        assert_eq!(counters.note_command(at(0), &config), ChatVerdict::Delivered);
        assert_eq!(counters.note_command(at(0), &config), ChatVerdict::Delivered);
        assert_eq!(
            counters.note_command(at(0), &config),
            ChatVerdict::TooManyCommands
        );
        // Chat messages are still allowed.
        assert_eq!(counters.note_message(at(0), &config), ChatVerdict::Delivered);
    }

    #[test]
    fn test_config_reads_settings_keys() {
        let settings = crate::settings::InMemorySettings::new();
        settings.set("chat.flood-limit", "7");
        settings.set("chat.flood-shutup", "120");
        settings.set("chat.message-reliable", "false");

        let config = ChatConfig::from_settings(&settings);
        assert_eq!(config.flood_limit, 7);
        assert_eq!(config.flood_shutup, Duration::from_secs(120));
        assert_eq!(config.command_limit, 5);
        assert!(!config.message_reliable);
    }
}
