//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("store.path must not be empty")]
    EmptyStorePath,
    #[error("store.flush_interval_secs must be at least 1")]
    ZeroFlushInterval,
    #[error("bridge.send_timeout_ms must be at least 1")]
    ZeroSendTimeout,
    #[error("bridge.handshake_timeout_ms must be at least 1")]
    ZeroHandshakeTimeout,
    #[error("bridge.max_frame_len must be at least 64, got {0}")]
    FrameLimitTooSmall(usize),
    #[error("notify.ping_text must not be empty when notify.ping_when_empty is set")]
    EmptyPingText,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.store.path.trim().is_empty() {
        errors.push(ValidationError::EmptyStorePath);
    }
    if config.store.flush_interval_secs == 0 {
        errors.push(ValidationError::ZeroFlushInterval);
    }
    if config.bridge.send_timeout_ms == 0 {
        errors.push(ValidationError::ZeroSendTimeout);
    }
    if config.bridge.handshake_timeout_ms == 0 {
        errors.push(ValidationError::ZeroHandshakeTimeout);
    }
    if config.bridge.max_frame_len < 64 {
        errors.push(ValidationError::FrameLimitTooSmall(config.bridge.max_frame_len));
    }
    // An empty message with no addressees would be rejected by the platform.
    if config.notify.ping_when_empty && config.notify.ping_text.trim().is_empty() {
        errors.push(ValidationError::EmptyPingText);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = Config::default();
        config.store.path = "  ".into();
        config.bridge.send_timeout_ms = 0;
        config.bridge.handshake_timeout_ms = 0;
        config.bridge.max_frame_len = 8;

        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyStorePath,
                ValidationError::ZeroSendTimeout,
                ValidationError::ZeroHandshakeTimeout,
                ValidationError::FrameLimitTooSmall(8),
            ]
        );
    }

    #[test]
    fn empty_ping_text_is_fine_when_empty_pings_are_off() {
        let mut config = Config::default();
        config.notify.ping_text.clear();
        assert_eq!(
            validate(&config).unwrap_err(),
            vec![ValidationError::EmptyPingText]
        );

        config.notify.ping_when_empty = false;
        assert!(validate(&config).is_ok());
    }
}
