//! Session channel protocol, independent of the socket transport.
//!
//! Each connection owns one [`SessionHandle`] and passes it to
//! [`handle_frame`] for every parsed frame.

use reel_core::{ClientFrame, ServerFrame, SessionId};
use thiserror::Error;

use crate::repository::{RepositoryError, SessionRepository};

/// Violations that end a session or video connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("'{command}' received before 'start'")]
    OutOfOrder { command: &'static str },

    #[error("session {session_id} already started on this connection")]
    AlreadyStarted { session_id: SessionId },

    #[error("{0}")]
    Malformed(#[from] reel_core::Error),

    #[error("binary frames are not accepted on the session channel")]
    UnexpectedBinary,

    #[error("video channel must open with 'start <session id>'")]
    MissingMediaStart,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("media write failed: {0}")]
    Media(#[from] std::io::Error),
}

/// Per-connection protocol state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionHandle {
    session_id: Option<SessionId>,
}

impl SessionHandle {
    pub const fn new() -> Self {
        Self { session_id: None }
    }

    pub const fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    fn require_started(&self, command: &'static str) -> Result<SessionId, ProtocolError> {
        self.session_id.ok_or(ProtocolError::OutOfOrder { command })
    }
}

/// Apply one client frame and produce the reply.
///
/// Returns `Ok(None)` for frames that need no reply.
///
/// # Errors
///
/// Returns a [`ProtocolError`] for out-of-order commands and rejected writes.
/// The connection should be closed afterwards.
pub async fn handle_frame(
    handle: &mut SessionHandle,
    frame: ClientFrame,
    repository: &dyn SessionRepository,
) -> Result<Option<ServerFrame>, ProtocolError> {
    match frame {
        ClientFrame::Start => {
            if let Some(session_id) = handle.session_id {
                return Err(ProtocolError::AlreadyStarted { session_id });
            }
            let session_id = repository.create_session().await?;
            handle.session_id = Some(session_id);
            tracing::info!(session_id = %session_id, "Session started");
            Ok(Some(ServerFrame::Start(session_id)))
        }
        ClientFrame::Change(record) => {
            let session_id = handle.require_started("change")?;
            let timestamp = record.timestamp;
            repository.append_change(session_id, record).await?;
            tracing::debug!(session_id = %session_id, timestamp, "Change stored");
            Ok(Some(ServerFrame::Change))
        }
        ClientFrame::Duration(duration) => {
            let session_id = handle.require_started("duration")?;
            repository.set_duration(session_id, duration).await?;
            tracing::info!(session_id = %session_id, duration, "Session sealed");
            Ok(Some(ServerFrame::Duration))
        }
        ClientFrame::Ping => Ok(Some(ServerFrame::Pong)),
        ClientFrame::Pong => Ok(None),
    }
}
