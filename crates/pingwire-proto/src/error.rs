//! Error types for the pingwire wire protocol.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while framing or decoding bridge traffic.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Underlying transport I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame exceeded the configured maximum length.
    #[error("frame too long: {actual} bytes (limit {limit})")]
    FrameTooLong {
        /// Observed length so far.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A frame was not valid UTF-8.
    #[error("invalid utf-8 at byte {byte_pos}")]
    InvalidUtf8 {
        /// Offset of the first invalid byte.
        byte_pos: usize,
    },

    /// A frame was not a JSON value of the expected shape.
    #[error("malformed frame {line:?}: {source}")]
    Malformed {
        /// The offending line, without its terminator.
        line: String,
        /// What serde_json rejected.
        #[source]
        source: serde_json::Error,
    },

    /// A frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Whether the stream can keep going after this error.
    ///
    /// Malformed frames are skipped; everything else ends the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::InvalidUtf8 { .. })
    }
}
