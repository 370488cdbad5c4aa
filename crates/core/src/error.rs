//! Core error types for Reel operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

use crate::operation::TextRange;

/// Core error type for edit inversion, indexing and protocol parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Unsupported input
    #[error("unsupported edit batch: expected exactly one operation, got {count}")]
    UnsupportedBatch { count: usize },

    #[error("multi-line deletion from line {start_line} to line {end_line} cannot be inverted")]
    MultiLineDeletion { start_line: u32, end_line: u32 },

    #[error("invalid range {range}: {reason}")]
    InvalidRange { range: TextRange, reason: String },

    // Malformed logs
    #[error(
        "change log is not sorted: record {position} has timestamp {timestamp} after {previous}"
    )]
    UnsortedLog {
        position: usize,
        previous: u64,
        timestamp: u64,
    },

    #[error("timestamp {timestamp}ms is past the longest supported timeline of {max}ms")]
    TimelineTooLong { timestamp: u64, max: u64 },

    // Parsing errors
    #[error("malformed frame '{frame}': {reason}")]
    MalformedFrame { frame: String, reason: String },

    #[error("invalid session id '{value}': {reason}")]
    InvalidSessionId { value: String, reason: String },

    #[error("JSON parse error: {reason}")]
    JsonParseFailed { reason: String },
}

impl Error {
    /// Create an invalid range error.
    pub fn invalid_range(range: TextRange, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            range,
            reason: reason.into(),
        }
    }

    /// Create a malformed frame error.
    pub fn malformed_frame(frame: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            frame: frame.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse_failed(reason: impl Into<String>) -> Self {
        Self::JsonParseFailed {
            reason: reason.into(),
        }
    }

    /// Whether the error comes from input the inverter deliberately does not handle.
    pub const fn is_unsupported_input(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedBatch { .. } | Self::MultiLineDeletion { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::json_parse_failed(err.to_string())
    }
}
