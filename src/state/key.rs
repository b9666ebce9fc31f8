//! Key derivation: conversation contexts to target list keys.

use pingwire_proto::{ChannelId, ConversationContext, GuildId, UserId};
use std::collections::BTreeSet;
use std::fmt;

/// Members of a target list. Ordered so the persisted file is stable.
pub type TargetSet = BTreeSet<UserId>;

/// The owning scope of a conversation.
///
/// Sentinel scopes are distinct variants, so they can never collide with a
/// numeric guild id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Guild(GuildId),
    /// A multi-party conversation with no owning guild.
    Group,
    /// A one-to-one conversation.
    Direct,
}

/// Identifies one conversation's target list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConversationKey {
    pub scope: Scope,
    pub channel: ChannelId,
}

impl ConversationKey {
    pub const fn new(scope: Scope, channel: ChannelId) -> Self {
        Self { scope, channel }
    }

    #[cfg(test)]
    pub const fn guild(guild: u64, channel: u64) -> Self {
        Self::new(Scope::Guild(GuildId(guild)), ChannelId(channel))
    }

    /// Derive the key for a context. Unsupported contexts have none.
    pub fn for_context(context: &ConversationContext) -> Option<Self> {
        match *context {
            ConversationContext::GuildText {
                guild_id,
                channel_id,
            } => Some(Self::new(Scope::Guild(guild_id), channel_id)),
            ConversationContext::Group { channel_id } => Some(Self::new(Scope::Group, channel_id)),
            ConversationContext::Direct { channel_id } => {
                Some(Self::new(Scope::Direct, channel_id))
            }
            ConversationContext::Unsupported => None,
        }
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        match self.scope {
            Scope::Guild(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Guild(guild) => write!(f, "{guild}/{}", self.channel),
            Scope::Group => write!(f, "group/{}", self.channel),
            Scope::Direct => write!(f, "dm/{}", self.channel),
        }
    }
}

/// Every key scoped to `guild`.
pub fn keys_for_guild<'a, I>(entries: I, guild: GuildId) -> BTreeSet<ConversationKey>
where
    I: IntoIterator<Item = (&'a ConversationKey, &'a TargetSet)>,
{
    entries
        .into_iter()
        .filter(|(key, _)| key.guild_id() == Some(guild))
        .map(|(key, _)| *key)
        .collect()
}

/// Every key scoped to `guild` whose target list contains `user`.
pub fn keys_containing_identity<'a, I>(
    entries: I,
    guild: GuildId,
    user: UserId,
) -> BTreeSet<ConversationKey>
where
    I: IntoIterator<Item = (&'a ConversationKey, &'a TargetSet)>,
{
    entries
        .into_iter()
        .filter(|(key, targets)| key.guild_id() == Some(guild) && targets.contains(&user))
        .map(|(key, _)| *key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn set(ids: &[u64]) -> TargetSet {
        ids.iter().copied().map(UserId).collect()
    }

    #[test]
    fn derive_from_each_context_kind() {
        let guild = ConversationContext::GuildText {
            guild_id: GuildId(100),
            channel_id: ChannelId(55),
        };
        let group = ConversationContext::Group {
            channel_id: ChannelId(55),
        };
        let direct = ConversationContext::Direct {
            channel_id: ChannelId(55),
        };

        assert_eq!(
            ConversationKey::for_context(&guild),
            Some(ConversationKey::guild(100, 55))
        );
        assert_eq!(
            ConversationKey::for_context(&group),
            Some(ConversationKey::new(Scope::Group, ChannelId(55)))
        );
        assert_eq!(
            ConversationKey::for_context(&direct),
            Some(ConversationKey::new(Scope::Direct, ChannelId(55)))
        );
        assert_eq!(
            ConversationKey::for_context(&ConversationContext::Unsupported),
            None
        );
    }

    #[test]
    fn sentinel_scopes_never_equal_guild_scopes() {
        let group = ConversationKey::new(Scope::Group, ChannelId(1));
        let direct = ConversationKey::new(Scope::Direct, ChannelId(1));
        assert_ne!(group, direct);
        assert_ne!(group, ConversationKey::guild(0, 1));
        assert_ne!(direct, ConversationKey::guild(u64::MAX, 1));
    }

    #[test]
    fn reverse_lookups_filter_by_scope_and_member() {
        let mut entries = BTreeMap::new();
        entries.insert(ConversationKey::guild(100, 55), set(&[1, 2]));
        entries.insert(ConversationKey::guild(100, 56), set(&[2]));
        entries.insert(ConversationKey::guild(200, 1), set(&[1]));
        entries.insert(ConversationKey::new(Scope::Group, ChannelId(100)), set(&[1]));

        let guild_keys = keys_for_guild(&entries, GuildId(100));
        assert_eq!(
            guild_keys.into_iter().collect::<Vec<_>>(),
            vec![ConversationKey::guild(100, 55), ConversationKey::guild(100, 56)]
        );

        let with_one = keys_containing_identity(&entries, GuildId(100), UserId(1));
        assert_eq!(
            with_one.into_iter().collect::<Vec<_>>(),
            vec![ConversationKey::guild(100, 55)]
        );
        assert!(keys_containing_identity(&entries, GuildId(300), UserId(1)).is_empty());
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(ConversationKey::guild(100, 55).to_string(), "100/55");
        assert_eq!(
            ConversationKey::new(Scope::Direct, ChannelId(9)).to_string(),
            "dm/9"
        );
    }
}
