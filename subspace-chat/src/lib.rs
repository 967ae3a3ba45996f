//! # subspace-chat - Game-Domain Modules for the Subspace Zone Host
//!
//! Representative game modules built on the `subspace-rt` module runtime:
//! a settings provider and a chat module with per-player flood control.
//! They exercise the runtime's outward surface the way the original
//! server's modules do — dependency manifests, zone-wide services,
//! per-player and per-arena extra-data slots, arena attachment, and
//! arena-scoped callbacks — without pulling in any wire protocol.
//!
//! # Modules
//!
//! - [`settings`] - The [`SettingsProvider`](settings::SettingsProvider)
//!   service and the module providing it
//! - [`chat`] - The [`Chat`](chat::Chat) service with flood control,
//!   per-arena delivery statistics, and the [`ChatMessage`](chat::ChatMessage)
//!   callback
//!
//! # Wiring
//!
//! ```rust,ignore
//! let host = ZoneHost::new(HostConfig::default())?;
//! host.modules().register_kind(settings_module_kind())?;
//! host.modules().register_kind(chat_module_kind())?;
//!
//! let cancel = CancellationToken::new();
//! host.modules()
//!     .load_module(&"subspace_chat::SettingsModule".into(), &cancel)
//!     .await?;
//! host.modules()
//!     .load_module(&"subspace_chat::ChatModule".into(), &cancel)
//!     .await?;
//! host.modules().do_post_load(&cancel).await;
//! ```

pub mod chat;
pub mod settings;

pub use chat::{
    chat_module_kind, ArenaChatStats, Chat, ChatConfig, ChatCounters, ChatMessage,
    ChatMessageArgs, ChatModule, ChatVerdict,
};
pub use settings::{settings_module_kind, InMemorySettings, SettingsModule, SettingsProvider};
