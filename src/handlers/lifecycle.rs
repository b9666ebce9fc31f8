//! Keep target lists in step with deletions and departures.
//!
//! Every handler is idempotent: replaying an event finds nothing left to
//! remove and does not write the store again.

use super::Registry;
use crate::state::{ConversationKey, Scope};
use pingwire_proto::{ChannelId, ConversationContext, GuildId, UserId};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub(super) async fn channel_deleted(registry: &Registry, context: &ConversationContext) {
    crate::metrics::record_lifecycle("channel_delete");
    let Some(key) = ConversationKey::for_context(context) else {
        return;
    };

    match registry.store.remove_key(&key).await {
        Some(count) => info!(%key, dropped = count, "Channel deleted, removed its target list"),
        None => debug!(%key, "Channel deleted, no target list"),
    }
}

pub(super) async fn guild_removed(registry: &Registry, guild: GuildId) {
    crate::metrics::record_lifecycle("guild_delete");
    let removed = registry.store.remove_guild(guild).await;
    if removed.is_empty() {
        debug!(%guild, "Guild removed, no target lists");
        return;
    }

    let channels: Vec<String> = removed
        .keys()
        .map(|key| describe(registry, key))
        .collect();
    info!(
        %guild,
        lists = removed.len(),
        channels = %channels.join(", "),
        "Guild removed, dropped its target lists"
    );
}

pub(super) async fn member_left_guild(registry: &Registry, guild: GuildId, user: UserId) {
    crate::metrics::record_lifecycle("guild_member_remove");
    let changed = registry.store.remove_identity_from_guild(guild, user).await;
    if changed.is_empty() {
        return;
    }

    let channels: Vec<String> = changed.iter().map(|key| describe(registry, key)).collect();
    info!(
        %guild,
        %user,
        channels = %channels.join(", "),
        "Member left guild, removed from target lists"
    );
}

pub(super) async fn recipient_left_group(registry: &Registry, channel: ChannelId, user: UserId) {
    crate::metrics::record_lifecycle("group_recipient_remove");
    let key = ConversationKey::new(Scope::Group, channel);
    let result = registry
        .store
        .remove_identity_from_keys(user, &BTreeSet::from([key]))
        .await;
    if result.get(&key).copied().unwrap_or(false) {
        info!(%key, %user, "Recipient left group, removed from its target list");
    }
}

/// Channel name for logs, falling back to the key.
fn describe(registry: &Registry, key: &ConversationKey) -> String {
    registry
        .transport
        .channel_name(key.channel)
        .map(|name| format!("#{name}"))
        .unwrap_or_else(|| key.to_string())
}
