//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Store Defaults
// =============================================================================

pub fn default_store_path() -> String {
    "data/targets.txt".to_string()
}

pub fn default_flush_interval() -> u64 {
    30
}

// =============================================================================
// Notification Defaults
// =============================================================================

pub fn default_ping_text() -> String {
    "aaaayyyyy".to_string()
}

pub fn default_ping_expire() -> Option<u64> {
    Some(300)
}

pub fn default_ack_expire() -> Option<u64> {
    Some(30)
}

// =============================================================================
// Bridge Defaults
// =============================================================================

pub fn default_bridge_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7878))
}

pub fn default_send_timeout_ms() -> u64 {
    10_000
}

pub fn default_handshake_timeout_ms() -> u64 {
    10_000
}

pub fn default_max_frame_len() -> usize {
    pingwire_proto::line::DEFAULT_MAX_FRAME_LEN
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_filter() -> String {
    "info".to_string()
}
