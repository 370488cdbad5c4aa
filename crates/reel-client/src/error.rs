//! Client-side error type.

use std::time::Duration;

use thiserror::Error;

/// Recorder, channel and playback failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server did not acknowledge in time. The caller may retry the
    /// whole recording attempt on a fresh connection.
    #[error("no '{expected}' acknowledgment within {timeout:?}")]
    AckTimeout {
        expected: &'static str,
        timeout: Duration,
    },

    #[error("cannot {operation} while the recorder is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// The server reported a protocol violation.
    #[error("server rejected the session: {0}")]
    Rejected(String),

    #[error("channel closed by the server")]
    ChannelClosed,

    #[error("channel error: {0}")]
    Channel(String),

    #[error("session fetch failed with status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("video element failed: {0}")]
    Video(String),

    #[error(transparent)]
    Core(#[from] reel_core::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Channel(err.to_string())
    }
}

impl ClientError {
    /// Whether retrying the operation may succeed.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::AckTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
