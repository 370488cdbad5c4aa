//! Session channel frames.
//!
//! Frames are text messages made of a command word optionally followed by a
//! single space and a payload:
//!
//! | Direction | Frame | Payload |
//! |---|---|---|
//! | client -> server | `start` | none |
//! | server -> client | `start <id>` | session id |
//! | client -> server | `change <json>` | one [`ChangeRecord`] |
//! | server -> client | `change` | none |
//! | client -> server | `duration <ms>` | integer |
//! | server -> client | `duration` | none |
//! | server -> client | `ready` | none, sent on connect |
//! | server -> client | `error <message>` | reason before a protocol-violation close |
//! | either | `ping` / `pong` | none |
//!
//! The video channel opens with the text frame `start <id>` (see
//! [`parse_media_start`]) and then carries opaque binary chunks.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::record::{ChangeRecord, SessionId};
use crate::result::Result;

/// Frames sent by a recorder to the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Start,
    Change(ChangeRecord),
    Duration(u64),
    Ping,
    Pong,
}

/// Frames sent by the session store to a recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Ready,
    Start(SessionId),
    Change,
    Duration,
    Ping,
    Pong,
    Error(String),
}

impl ClientFrame {
    /// Render the frame as wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParseFailed`] if a change record cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Self::Start => "start".to_string(),
            Self::Change(record) => format!("change {}", serde_json::to_string(record)?),
            Self::Duration(ms) => format!("duration {ms}"),
            Self::Ping => "ping".to_string(),
            Self::Pong => "pong".to_string(),
        })
    }
}

impl FromStr for ClientFrame {
    type Err = Error;

    fn from_str(frame: &str) -> std::result::Result<Self, Self::Err> {
        match split_frame(frame) {
            ("start", None) => Ok(Self::Start),
            ("change", Some(json)) => serde_json::from_str::<ChangeRecord>(json)
                .map(Self::Change)
                .map_err(|e| Error::malformed_frame(frame, e.to_string())),
            ("duration", Some(ms)) => ms
                .parse::<u64>()
                .map(Self::Duration)
                .map_err(|e| Error::malformed_frame(frame, e.to_string())),
            ("ping", None) => Ok(Self::Ping),
            ("pong", None) => Ok(Self::Pong),
            (command, _) => Err(Error::malformed_frame(
                frame,
                format!("unexpected command '{command}'"),
            )),
        }
    }
}

impl fmt::Display for ServerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Start(id) => write!(f, "start {id}"),
            Self::Change => write!(f, "change"),
            Self::Duration => write!(f, "duration"),
            Self::Ping => write!(f, "ping"),
            Self::Pong => write!(f, "pong"),
            Self::Error(message) => write!(f, "error {message}"),
        }
    }
}

impl FromStr for ServerFrame {
    type Err = Error;

    fn from_str(frame: &str) -> std::result::Result<Self, Self::Err> {
        match split_frame(frame) {
            ("ready", None) => Ok(Self::Ready),
            ("start", Some(id)) => id.parse().map(Self::Start),
            ("change", None) => Ok(Self::Change),
            ("duration", None) => Ok(Self::Duration),
            ("ping", None) => Ok(Self::Ping),
            ("pong", None) => Ok(Self::Pong),
            ("error", message) => Ok(Self::Error(message.unwrap_or_default().to_string())),
            (command, _) => Err(Error::malformed_frame(
                frame,
                format!("unexpected command '{command}'"),
            )),
        }
    }
}

/// The text frame that opens a video channel for `id`.
pub fn media_start(id: SessionId) -> String {
    format!("start {id}")
}

/// Parse the opening frame of a video channel.
///
/// # Errors
///
/// Returns [`Error::MalformedFrame`] unless the frame is `start <id>`, and
/// [`Error::InvalidSessionId`] if the id does not parse.
pub fn parse_media_start(frame: &str) -> Result<SessionId> {
    match split_frame(frame) {
        ("start", Some(id)) => id.parse(),
        _ => Err(Error::malformed_frame(
            frame,
            "video channel must open with 'start <session id>'",
        )),
    }
}

fn split_frame(frame: &str) -> (&str, Option<&str>) {
    match frame.split_once(' ') {
        Some((command, payload)) => (command, Some(payload)),
        None => (frame, None),
    }
}
