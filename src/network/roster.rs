//! Who is present where, as last reported by the bridge.
//!
//! Fed by `channel_upsert` / `member_add` frames and pruned by lifecycle
//! events before those events are dispatched, so a departed user drops out
//! of notifications even while their stored entry is still being removed.

use dashmap::DashMap;
use parking_lot::Mutex;
use pingwire_proto::{ChannelId, ConversationContext, Event, UserId};
use std::collections::{HashSet, VecDeque};

/// Names of deleted channels kept around for removal logs.
const RETIRED_NAMES: usize = 256;

struct ChannelEntry {
    context: ConversationContext,
    members: HashSet<UserId>,
}

#[derive(Default)]
pub struct Roster {
    channels: DashMap<ChannelId, ChannelEntry>,
    /// Outlives the channel entry so removal logs can still name it, up to
    /// the last `RETIRED_NAMES` deletions.
    names: DashMap<ChannelId, String>,
    /// Deleted channels, oldest first.
    retired: Mutex<VecDeque<ChannelId>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known about a channel.
    pub fn upsert(&self, context: ConversationContext, name: Option<String>, members: Vec<UserId>) {
        let Some(channel) = context.channel_id() else {
            return;
        };
        if let Some(name) = name {
            self.names.insert(channel, name);
        }
        self.channels.insert(
            channel,
            ChannelEntry {
                context,
                members: members.into_iter().collect(),
            },
        );
    }

    /// Returns false when the channel has not been announced yet.
    pub fn add_member(&self, channel: ChannelId, user: UserId) -> bool {
        match self.channels.get_mut(&channel) {
            Some(mut entry) => {
                entry.members.insert(user);
                true
            }
            None => false,
        }
    }

    /// Members of `channel`; empty for unknown channels.
    pub fn members(&self, channel: ChannelId) -> HashSet<UserId> {
        // Clone out so the shard guard is dropped before any await.
        self.channels
            .get(&channel)
            .map(|entry| entry.members.clone())
            .unwrap_or_default()
    }

    pub fn name(&self, channel: ChannelId) -> Option<String> {
        self.names.get(&channel).map(|name| name.value().clone())
    }

    /// Apply the membership side of a lifecycle event.
    pub fn apply(&self, event: &Event) {
        match *event {
            Event::MessageCreate(_) => {}
            Event::ChannelDelete { context } => {
                if let Some(channel) = context.channel_id()
                    && self.channels.remove(&channel).is_some()
                {
                    self.retire([channel]);
                }
            }
            Event::GuildDelete { guild_id } => {
                let mut removed = Vec::new();
                self.channels.retain(|channel, entry| {
                    let keep = entry.context.guild_id() != Some(guild_id);
                    if !keep {
                        removed.push(*channel);
                    }
                    keep
                });
                self.retire(removed);
            }
            Event::GuildMemberRemove { guild_id, user_id } => {
                for mut entry in self.channels.iter_mut() {
                    if entry.context.guild_id() == Some(guild_id) {
                        entry.members.remove(&user_id);
                    }
                }
            }
            Event::GroupRecipientRemove {
                channel_id,
                user_id,
            } => {
                if let Some(mut entry) = self.channels.get_mut(&channel_id) {
                    entry.members.remove(&user_id);
                }
            }
        }
    }

    /// Queue deleted channels and forget the oldest names past the cap.
    fn retire(&self, channels: impl IntoIterator<Item = ChannelId>) {
        let mut retired = self.retired.lock();
        retired.extend(channels);
        while retired.len() > RETIRED_NAMES {
            let Some(oldest) = retired.pop_front() else {
                break;
            };
            // Re-announced since it was deleted.
            if !self.channels.contains_key(&oldest) {
                self.names.remove(&oldest);
            }
        }
    }
}
