//! State management module.
//!
//! Holds the target store and everything it needs: key derivation from
//! conversation contexts and the on-disk codec.

pub mod key;
pub mod persistence;
mod store;

pub use key::{ConversationKey, Scope};
pub use store::{spawn_flush_task, TargetStore, ToggleOutcome};
