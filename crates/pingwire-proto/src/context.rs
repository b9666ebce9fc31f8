//! Conversation contexts.

use crate::id::{ChannelId, GuildId};
use serde::{Deserialize, Serialize};

/// The addressable space a message was posted in.
///
/// Channel kinds the bridge knows about but pingwire does not track
/// (voice, threads, forums, ...) arrive as [`ConversationContext::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationContext {
    /// A text channel owned by a guild.
    GuildText {
        /// Owning guild.
        guild_id: GuildId,
        /// The channel itself.
        channel_id: ChannelId,
    },
    /// A multi-party conversation with no owning guild.
    Group {
        /// The group channel.
        channel_id: ChannelId,
    },
    /// A one-to-one conversation.
    Direct {
        /// The DM channel.
        channel_id: ChannelId,
    },
    /// Any other channel kind.
    #[serde(other)]
    Unsupported,
}

impl ConversationContext {
    /// The channel id, if the context carries one.
    pub fn channel_id(&self) -> Option<ChannelId> {
        match *self {
            Self::GuildText { channel_id, .. }
            | Self::Group { channel_id }
            | Self::Direct { channel_id } => Some(channel_id),
            Self::Unsupported => None,
        }
    }

    /// The owning guild, for guild channels.
    pub fn guild_id(&self) -> Option<GuildId> {
        match *self {
            Self::GuildText { guild_id, .. } => Some(guild_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_unsupported() {
        let ctx: ConversationContext =
            serde_json::from_str(r#"{"kind":"guild_voice","channel_id":"9"}"#).unwrap();
        assert_eq!(ctx, ConversationContext::Unsupported);
        assert_eq!(ctx.channel_id(), None);
    }

    #[test]
    fn guild_text_accessors() {
        let ctx: ConversationContext =
            serde_json::from_str(r#"{"kind":"guild_text","guild_id":"100","channel_id":"55"}"#)
                .unwrap();
        assert_eq!(ctx.guild_id(), Some(GuildId(100)));
        assert_eq!(ctx.channel_id(), Some(ChannelId(55)));
    }
}
