//! Event handlers.
//!
//! The [`Registry`] routes every inbound event to its handler:
//!
//! - messages mentioning the system toggle subscriptions ([`toggle`])
//! - other trigger messages ping the live subscribers ([`notify`])
//! - deletions and departures prune the store ([`lifecycle`])
//!
//! Handlers run on their own tasks, so a slow send never holds up the
//! bridge's frame loop. Any state change is made and persisted before a
//! handler talks to the transport.

mod lifecycle;
mod notify;
mod toggle;

pub use notify::is_trigger;

use crate::config::NotifyConfig;
use crate::error::DeliveryError;
use crate::network::Transport;
use crate::state::{ConversationKey, TargetStore};
use pingwire_proto::{Event, MessageCreate};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

/// Notification and acknowledgment behavior, resolved from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    pub ping_text: String,
    pub ping_expire: Option<Duration>,
    pub ack_expire: Option<Duration>,
    pub ping_when_empty: bool,
}

impl From<&NotifyConfig> for NotifySettings {
    fn from(config: &NotifyConfig) -> Self {
        Self {
            ping_text: config.ping_text.clone(),
            ping_expire: config.ping_expire(),
            ack_expire: config.ack_expire(),
            ping_when_empty: config.ping_when_empty,
        }
    }
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self::from(&NotifyConfig::default())
    }
}

/// Routes events to handlers for one bridge session.
pub struct Registry {
    store: Arc<TargetStore>,
    transport: Arc<dyn Transport>,
    settings: NotifySettings,
}

impl Registry {
    pub fn new(
        store: Arc<TargetStore>,
        transport: Arc<dyn Transport>,
        settings: NotifySettings,
    ) -> Self {
        Self {
            store,
            transport,
            settings,
        }
    }

    /// Handle `event` on a new task and return immediately.
    pub fn dispatch(self: &Arc<Self>, event: Event) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let span = crate::telemetry::spans::event(event.name());
        tokio::spawn(async move { registry.handle(event).await }.instrument(span))
    }

    /// Handle `event` to completion.
    pub async fn handle(&self, event: Event) {
        match event {
            Event::MessageCreate(msg) => self.on_message(&msg).await,
            Event::ChannelDelete { context } => lifecycle::channel_deleted(self, &context).await,
            Event::GuildDelete { guild_id } => lifecycle::guild_removed(self, guild_id).await,
            Event::GuildMemberRemove { guild_id, user_id } => {
                lifecycle::member_left_guild(self, guild_id, user_id).await
            }
            Event::GroupRecipientRemove {
                channel_id,
                user_id,
            } => lifecycle::recipient_left_group(self, channel_id, user_id).await,
        }
    }

    async fn on_message(&self, msg: &MessageCreate) {
        let self_id = self.transport.self_id();
        if msg.author == self_id {
            return;
        }
        // Commands win over triggers, even when the text would trigger.
        if msg.mentions_user(self_id) {
            toggle::handle_command(self, msg).await;
        } else if is_trigger(&msg.content) {
            notify::handle_trigger(self, msg).await;
        } else {
            debug!(message = %msg.id, "Ignoring non-trigger message");
        }
    }
}

/// Log a failed send. The state change it reported on stays in effect.
fn log_delivery_failure(kind: &'static str, key: &ConversationKey, error: &DeliveryError) {
    crate::metrics::record_delivery_failure(kind, error);
    match error {
        DeliveryError::Forbidden(detail) => {
            warn!(%key, kind, %detail, "No permission to post in channel")
        }
        other => warn!(%key, kind, error = %other, "Failed to deliver message"),
    }
}
