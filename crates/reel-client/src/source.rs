//! Where playback loads recorded sessions from.

use std::collections::HashMap;

use async_trait::async_trait;
use reel_core::{Session, SessionId};
use url::Url;

use crate::error::{ClientError, Result};

/// Read access to recorded sessions.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Fetch a session with its full change log.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or cannot be fetched.
    async fn fetch_session(&self, session_id: SessionId) -> Result<Session>;
}

/// Fetches sessions from the store's read API.
#[derive(Debug, Clone)]
pub struct HttpSessionSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSessionSource {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn session_url(&self, session_id: SessionId) -> Result<Url> {
        Ok(self.base.join(&format!("api/editor/sessions/{session_id}"))?)
    }
}

#[async_trait]
impl SessionSource for HttpSessionSource {
    async fn fetch_session(&self, session_id: SessionId) -> Result<Session> {
        let url = self.session_url(session_id)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            // Problem documents carry the reason in `detail`.
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("detail")
                        .and_then(serde_json::Value::as_str)
                        .map(ToString::to_string)
                })
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let session: Session = response.json().await?;
        tracing::debug!(
            session_id = %session_id,
            changes = session.changes.len(),
            duration = ?session.duration,
            "Fetched session"
        );
        Ok(session)
    }
}

/// Sessions held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionSource {
    sessions: HashMap<SessionId, Session>,
}

impl InMemorySessionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }
}

#[async_trait]
impl SessionSource for InMemorySessionSource {
    async fn fetch_session(&self, session_id: SessionId) -> Result<Session> {
        self.sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                status: 404,
                detail: format!("Session not found: {session_id}"),
            })
    }
}
