//! Change records, sessions and session identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::Error;
use crate::index::check_timeline;
use crate::invert::invert;
use crate::operation::EditOperation;
use crate::result::Result;

/// One timestamped, invertible edit.
///
/// `timestamp` is milliseconds since the recording started. `changes` and
/// `inverted_changes` each hold exactly one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub timestamp: u64,
    pub changes: Vec<EditOperation>,
    pub inverted_changes: Vec<EditOperation>,
}

impl ChangeRecord {
    /// Capture `op`, applied to `prior_content`, at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns the inverter's error when `op` cannot be inverted.
    pub fn capture(timestamp: u64, op: EditOperation, prior_content: &str) -> Result<Self> {
        let inverted = invert(&op, prior_content)?;
        Ok(Self {
            timestamp,
            changes: vec![op],
            inverted_changes: vec![inverted],
        })
    }

    /// The synthetic first record of a session: the whole document inserted
    /// at the origin, so rewinding to zero always yields an empty document.
    ///
    /// # Errors
    ///
    /// Never fails for valid UTF-8 content; the signature follows [`Self::capture`].
    pub fn initial(content: &str) -> Result<Self> {
        Self::capture(0, EditOperation::insert(1, 1, content), "")
    }

    /// Check the one-operation-per-array invariant and the timeline bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBatch`] naming the offending array length
    /// and [`Error::TimelineTooLong`] for timestamps no index can cover.
    pub fn validate(&self) -> Result<()> {
        [self.changes.len(), self.inverted_changes.len()]
            .into_iter()
            .find(|count| *count != 1)
            .map_or(Ok(()), |count| Err(Error::UnsupportedBatch { count }))?;
        check_timeline(self.timestamp)
    }
}

/// Opaque session identifier (a ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Ulid);

impl SessionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidSessionId {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

/// One recorded editing sequence.
///
/// `duration` stays `None` while recording and seals the session once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub duration: Option<u64>,
    pub changes: Vec<ChangeRecord>,
}

impl Session {
    pub const fn new(id: SessionId) -> Self {
        Self {
            id,
            duration: None,
            changes: Vec::new(),
        }
    }

    pub const fn is_sealed(&self) -> bool {
        self.duration.is_some()
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.changes.last().map(|record| record.timestamp)
    }

    /// Length of the playback timeline: the recorded duration, or the last
    /// change for sessions that were never sealed.
    pub fn timeline_duration(&self) -> u64 {
        self.duration
            .or_else(|| self.last_timestamp())
            .unwrap_or_default()
    }
}
