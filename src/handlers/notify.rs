//! Trigger pings: notify the subscribers who are still present.

use super::{log_delivery_failure, Registry};
use crate::network::OutgoingMessage;
use crate::state::ConversationKey;
use pingwire_proto::{MessageCreate, UserId};
use std::fmt::Write as _;
use tracing::{debug, info};

/// Whether `content` should ping the conversation's subscribers.
pub fn is_trigger(content: &str) -> bool {
    content.contains(['a', 'A'])
}

pub(super) async fn handle_trigger(registry: &Registry, msg: &MessageCreate) {
    let Some(key) = ConversationKey::for_context(&msg.context) else {
        debug!(message = %msg.id, "Trigger in unsupported context");
        return;
    };
    let Some(channel) = msg.context.channel_id() else {
        return;
    };

    // Recomputed per trigger: stored entries may lag behind departures.
    let present = registry.transport.present_members(&msg.context).await;
    let live: Vec<UserId> = registry
        .store
        .get(&key)
        .into_iter()
        .filter(|user| present.contains(user))
        .collect();

    if live.is_empty() && !registry.settings.ping_when_empty {
        debug!(%key, "No live targets, skipping ping");
        return;
    }

    let content = compose(&registry.settings.ping_text, &live);
    let ping = OutgoingMessage::new(content)
        .with_mentions(live.clone())
        .quiet_reply_to(msg.id)
        .delete_after(registry.settings.ping_expire);

    match registry.transport.send(channel, ping).await {
        Ok(()) => {
            crate::metrics::record_ping(live.len());
            info!(%key, targets = live.len(), "Pinged targets");
        }
        Err(e) => log_delivery_failure("ping", &key, &e),
    }
}

fn compose(ping_text: &str, targets: &[UserId]) -> String {
    let mut content = ping_text.to_string();
    for user in targets {
        let _ = write!(content, " {}", user.mention());
    }
    content
}
