//! # pingwire-proto
//!
//! Wire vocabulary spoken between `pingwired` and the platform bridge that
//! owns the actual chat connection.
//!
//! The bridge forwards conversation and lifecycle events as [`Inbound`]
//! frames and executes [`Outbound`] send requests, answering each one with a
//! [`SendOutcome`]. Frames are newline-delimited JSON; see [`JsonLineCodec`].
//!
//! ```rust
//! use pingwire_proto::{ChannelId, ConversationContext, GuildId, Inbound};
//!
//! let raw = r#"{"type":"channel_delete","context":{"kind":"guild_text","guild_id":"100","channel_id":"55"}}"#;
//! let frame: Inbound = serde_json::from_str(raw).unwrap();
//! assert!(matches!(
//!     frame,
//!     Inbound::Event(pingwire_proto::Event::ChannelDelete {
//!         context: ConversationContext::GuildText { guild_id: GuildId(100), channel_id: ChannelId(55) }
//!     })
//! ));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod event;
pub mod id;
#[cfg(feature = "tokio")]
pub mod line;

pub use self::context::ConversationContext;
pub use self::error::ProtocolError;
pub use self::event::{Event, Inbound, MessageCreate, Outbound, SendOutcome};
pub use self::id::{ChannelId, GuildId, MessageId, UserId};
#[cfg(feature = "tokio")]
pub use self::line::JsonLineCodec;
