//! The seam between handlers and whatever actually talks to the platform.

use crate::error::DeliveryError;
use async_trait::async_trait;
use pingwire_proto::{ChannelId, ConversationContext, MessageId, UserId};
use std::collections::HashSet;
use std::time::Duration;

/// A message to post into a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    /// Users this message may ping. Anyone else mentioned in `content` is
    /// rendered without a notification.
    pub mentions: Vec<UserId>,
    pub reply_to: Option<MessageId>,
    /// Whether replying also pings the author of `reply_to`.
    pub mention_reply_author: bool,
    pub delete_after: Option<Duration>,
}

impl OutgoingMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_mentions(mut self, mentions: Vec<UserId>) -> Self {
        self.mentions = mentions;
        self
    }

    /// Reply to `message` without pinging its author.
    pub fn quiet_reply_to(mut self, message: MessageId) -> Self {
        self.reply_to = Some(message);
        self.mention_reply_author = false;
        self
    }

    pub fn delete_after(mut self, delay: Option<Duration>) -> Self {
        self.delete_after = delay;
        self
    }
}

/// Everything the handlers need from the messaging platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The system's own account.
    fn self_id(&self) -> UserId;

    /// Post a message. Returns once the platform has accepted or refused it.
    async fn send(&self, channel: ChannelId, message: OutgoingMessage)
        -> Result<(), DeliveryError>;

    /// Users currently present in `context`.
    async fn present_members(&self, context: &ConversationContext) -> HashSet<UserId>;

    /// Display name of a channel, if known. Best-effort: may be gone for
    /// channels that were already deleted.
    fn channel_name(&self, channel: ChannelId) -> Option<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport double that records every send.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct RecordingTransport {
        pub self_id: UserId,
        pub members: Mutex<HashMap<ChannelId, HashSet<UserId>>>,
        pub names: HashMap<ChannelId, String>,
        pub sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
        pub fail_with: Option<DeliveryError>,
    }

    impl RecordingTransport {
        pub fn new(self_id: u64) -> Self {
            Self {
                self_id: UserId(self_id),
                ..Self::default()
            }
        }

        pub fn with_members(self, channel: u64, members: &[u64]) -> Self {
            self.members.lock().insert(
                ChannelId(channel),
                members.iter().copied().map(UserId).collect(),
            );
            self
        }

        pub fn with_name(mut self, channel: u64, name: &str) -> Self {
            self.names.insert(ChannelId(channel), name.to_string());
            self
        }

        pub fn failing(mut self, error: DeliveryError) -> Self {
            self.fail_with = Some(error);
            self
        }

        pub fn sent(&self) -> Vec<(ChannelId, OutgoingMessage)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn self_id(&self) -> UserId {
            self.self_id
        }

        async fn send(
            &self,
            channel: ChannelId,
            message: OutgoingMessage,
        ) -> Result<(), DeliveryError> {
            self.sent.lock().push((channel, message));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn present_members(&self, context: &ConversationContext) -> HashSet<UserId> {
            context
                .channel_id()
                .and_then(|c| self.members.lock().get(&c).cloned())
                .unwrap_or_default()
        }

        fn channel_name(&self, channel: ChannelId) -> Option<String> {
            self.names.get(&channel).cloned()
        }
    }
}
