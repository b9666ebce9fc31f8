//! Frames exchanged with the platform bridge.

use crate::context::ConversationContext;
use crate::id::{ChannelId, GuildId, MessageId, UserId};
use serde::{Deserialize, Serialize};

/// A message posted in some conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreate {
    /// Message id, used as the reply reference.
    pub id: MessageId,
    /// Where it was posted.
    pub context: ConversationContext,
    /// Who posted it.
    pub author: UserId,
    /// Users addressed by the message, in mention order.
    #[serde(default)]
    pub mentions: Vec<UserId>,
    /// Raw message text.
    #[serde(default)]
    pub content: String,
}

impl MessageCreate {
    /// Whether `user` is among the addressed users.
    pub fn mentions_user(&self, user: UserId) -> bool {
        self.mentions.contains(&user)
    }
}

/// Conversation and lifecycle events forwarded by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A message was posted.
    MessageCreate(MessageCreate),
    /// A guild channel or group conversation was destroyed.
    ChannelDelete {
        /// The destroyed context.
        context: ConversationContext,
    },
    /// The system was removed from a guild, or the guild was deleted.
    GuildDelete {
        /// The guild that is gone.
        guild_id: GuildId,
    },
    /// A user permanently left (or was removed from) a guild.
    GuildMemberRemove {
        /// The guild.
        guild_id: GuildId,
        /// The departing user.
        user_id: UserId,
    },
    /// A user left a group conversation.
    GroupRecipientRemove {
        /// The group channel.
        channel_id: ChannelId,
        /// The departing user.
        user_id: UserId,
    },
}

impl Event {
    /// Short static name, used for logging and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageCreate(_) => "message_create",
            Self::ChannelDelete { .. } => "channel_delete",
            Self::GuildDelete { .. } => "guild_delete",
            Self::GuildMemberRemove { .. } => "guild_member_remove",
            Self::GroupRecipientRemove { .. } => "group_recipient_remove",
        }
    }
}

/// Result of an [`Outbound::Send`], reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// The message was posted.
    Delivered,
    /// The platform refused: the system lacks permission in that context.
    Forbidden {
        /// Platform-provided detail.
        #[serde(default)]
        detail: String,
    },
    /// Any other delivery failure.
    Failed {
        /// Platform-provided detail.
        #[serde(default)]
        detail: String,
    },
}

/// Frames sent by the bridge to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Handshake; must be the first frame of a session.
    Ready {
        /// The system's own account.
        self_id: UserId,
    },
    /// Completion of an earlier [`Outbound::Send`].
    SendResult {
        /// Nonce of the send being answered.
        nonce: u64,
        /// What happened.
        outcome: SendOutcome,
    },
    /// Full snapshot of a channel: its context, display name and members.
    ChannelUpsert {
        /// The channel.
        context: ConversationContext,
        /// Display name, when the channel has one.
        #[serde(default)]
        name: Option<String>,
        /// Everyone currently present.
        #[serde(default)]
        members: Vec<UserId>,
    },
    /// A user became present in a channel.
    MemberAdd {
        /// The channel.
        channel_id: ChannelId,
        /// The arriving user.
        user_id: UserId,
    },
    /// A conversation or lifecycle event.
    #[serde(untagged)]
    Event(Event),
}

/// Frames sent by the daemon to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Outbound {
    /// Post a message.
    Send {
        /// Correlates the bridge's [`Inbound::SendResult`].
        nonce: u64,
        /// Destination channel.
        channel_id: ChannelId,
        /// Message text.
        content: String,
        /// Users allowed to be pinged by this message; everyone else
        /// mentioned in `content` is rendered without a notification.
        #[serde(default)]
        mentions: Vec<UserId>,
        /// Message to reply to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_to: Option<MessageId>,
        /// Whether the reply pings the author of `reply_to`.
        #[serde(default)]
        mention_reply_author: bool,
        /// Delete the message after this many milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delete_after_ms: Option<u64>,
    },
}
