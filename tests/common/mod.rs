//! Integration test common infrastructure.
//!
//! Spawns `pingwired` processes and plays the platform bridge against them.

pub mod bridge;
pub mod daemon;

#[allow(unused_imports)]
pub use bridge::TestBridge;
#[allow(unused_imports)]
pub use daemon::TestDaemon;
