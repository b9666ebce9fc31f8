//! Unified error handling for pingwired.
//!
//! Each layer gets its own error enum; `anyhow` is only used at the top of
//! the binary.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Persistence Errors
// ============================================================================

/// A persisted record that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct CodecError {
    /// 1-based line number in the target list file.
    pub line: usize,
    pub reason: String,
}

impl CodecError {
    pub(crate) fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors loading or saving the target store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt target list {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Corrupt { .. } => "corrupt",
            Self::Write { .. } => "write",
        }
    }
}

// ============================================================================
// Delivery Errors (transport sends)
// ============================================================================

/// Why an outbound message did not reach its channel.
///
/// None of these are fatal: handlers log them and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("missing permission: {0}")]
    Forbidden(String),

    #[error("delivery failed: {0}")]
    Failed(String),

    #[error("bridge did not answer in time")]
    TimedOut,

    #[error("bridge session closed")]
    Closed,
}

impl DeliveryError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "forbidden",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed_out",
            Self::Closed => "closed",
        }
    }
}
