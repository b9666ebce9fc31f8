//! Toggle commands: a message mentioning the system flips every other
//! mentioned user's subscription in that conversation.

use super::{log_delivery_failure, Registry};
use crate::network::OutgoingMessage;
use crate::state::{ConversationKey, ToggleOutcome};
use pingwire_proto::{MessageCreate, UserId};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub(super) async fn handle_command(registry: &Registry, msg: &MessageCreate) {
    let Some(key) = ConversationKey::for_context(&msg.context) else {
        debug!(message = %msg.id, "Command in unsupported context");
        return;
    };

    let self_id = registry.transport.self_id();
    let mentioned: BTreeSet<UserId> = msg
        .mentions
        .iter()
        .copied()
        .filter(|&user| user != self_id)
        .collect();

    let outcome = registry.store.toggle_all(key, &mentioned, self_id).await;
    info!(
        %key,
        author = %msg.author,
        added = outcome.added.len(),
        removed = outcome.removed.len(),
        "Toggled targets"
    );

    // Nothing changed: stay quiet.
    let Some(text) = acknowledgment(&outcome) else {
        return;
    };
    let reply = OutgoingMessage::new(text)
        .quiet_reply_to(msg.id)
        .delete_after(registry.settings.ack_expire);
    if let Some(channel) = msg.context.channel_id()
        && let Err(e) = registry.transport.send(channel, reply).await
    {
        log_delivery_failure("ack", &key, &e);
    }
}

/// Human-readable summary of a toggle, one line per non-empty partition.
pub(super) fn acknowledgment(outcome: &ToggleOutcome) -> Option<String> {
    let mut lines = Vec::with_capacity(2);
    if !outcome.added.is_empty() {
        lines.push(format!("Added {}", mention_list(&outcome.added)));
    }
    if !outcome.removed.is_empty() {
        lines.push(format!("Removed {}", mention_list(&outcome.removed)));
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn mention_list(users: &BTreeSet<UserId>) -> String {
    users
        .iter()
        .map(|user| user.mention())
        .collect::<Vec<_>>()
        .join(", ")
}
