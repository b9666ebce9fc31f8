//! Network layer: the bridge listener and the transport seam.

pub mod gateway;
mod roster;
mod session;
mod transport;

pub use gateway::Gateway;
pub use transport::{OutgoingMessage, Transport};

#[cfg(test)]
pub(crate) use transport::testing;
