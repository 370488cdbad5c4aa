//! Session repository layer.
//!
//! Owns the persisted change logs. One stored row per session: id, creation
//! time, nullable duration and the append-only array of change records.
//!
//! # Architecture
//!
//! - `SessionRepository`: trait the socket handlers and the read API depend on
//! - `InMemorySessionRepository`: process-local storage for development and tests
//! - `FileSessionRepository`: one JSON document per session, rewritten on
//!   every acknowledged write (last acknowledged write wins)

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reel_core::{ChangeRecord, Session, SessionId, check_timeline};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Stored form of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub duration: Option<u64>,
    pub changes: Vec<ChangeRecord>,
}

impl StoredSession {
    /// Creates an empty, open session.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            duration: None,
            changes: Vec::new(),
        }
    }

    /// Appends a record to an open session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is sealed, the record holds a batch or
    /// lies past the supported timeline, or its timestamp precedes the last
    /// stored record.
    pub fn append(&mut self, record: ChangeRecord) -> Result<(), RepositoryError> {
        if self.duration.is_some() {
            return Err(RepositoryError::SessionSealed { session_id: self.id });
        }

        record.validate()?;

        if let Some(previous) = self
            .changes
            .last()
            .map(|last| last.timestamp)
            .filter(|previous| record.timestamp < *previous)
        {
            return Err(RepositoryError::TimestampRegression {
                session_id: self.id,
                previous,
                timestamp: record.timestamp,
            });
        }

        self.changes.push(record);
        Ok(())
    }

    /// Sets the duration, sealing the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is already sealed, or the duration
    /// ends before the last stored record or past the supported timeline.
    pub fn seal(&mut self, duration: u64) -> Result<(), RepositoryError> {
        if self.duration.is_some() {
            return Err(RepositoryError::SessionSealed { session_id: self.id });
        }

        if let Some(last) = self
            .changes
            .last()
            .map(|last| last.timestamp)
            .filter(|last| duration < *last)
        {
            return Err(RepositoryError::InvalidDuration {
                session_id: self.id,
                duration,
                reason: format!("ends before the change at {last}ms"),
            });
        }
        check_timeline(duration).map_err(|e| RepositoryError::InvalidDuration {
            session_id: self.id,
            duration,
            reason: e.to_string(),
        })?;

        self.duration = Some(duration);
        Ok(())
    }

    /// The playback view of this session.
    #[must_use]
    pub fn to_session(&self) -> Session {
        Session {
            id: self.id,
            duration: self.duration,
            changes: self.changes.clone(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            created_at: self.created_at,
            duration: self.duration,
            change_count: self.changes.len(),
        }
    }
}

/// Listing entry for a stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub duration: Option<u64>,
    pub change_count: usize,
}

/// Repository errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Session not found.
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: SessionId },

    /// Session already has a duration.
    #[error("Session is sealed: {session_id}")]
    SessionSealed { session_id: SessionId },

    /// Record out of timestamp order.
    #[error(
        "Session {session_id}: change at {timestamp}ms arrived after a change at {previous}ms"
    )]
    TimestampRegression {
        session_id: SessionId,
        previous: u64,
        timestamp: u64,
    },

    /// Duration does not cover the stored records.
    #[error("Session {session_id}: invalid duration {duration}ms: {reason}")]
    InvalidDuration {
        session_id: SessionId,
        duration: u64,
        reason: String,
    },

    /// Record violates the one-operation invariant or the timeline bound.
    #[error("Invalid change record: {reason}")]
    InvalidRecord { reason: String },

    /// Backend failure.
    #[error("Storage {operation} failed: {reason}")]
    Storage { operation: String, reason: String },
}

impl RepositoryError {
    fn storage(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Storage {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<reel_core::Error> for RepositoryError {
    fn from(err: reel_core::Error) -> Self {
        Self::InvalidRecord {
            reason: err.to_string(),
        }
    }
}

/// Repository trait for session data access.
#[async_trait::async_trait]
pub trait SessionRepository: Send + Sync {
    /// Allocates a new, empty session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    async fn create_session(&self) -> Result<SessionId, RepositoryError>;

    /// Appends a change record to an open session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or sealed, or the record is rejected.
    async fn append_change(
        &self,
        session_id: SessionId,
        record: ChangeRecord,
    ) -> Result<(), RepositoryError>;

    /// Sets the session duration, sealing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or already sealed, or the
    /// duration is rejected.
    async fn set_duration(&self, session_id: SessionId, duration: u64)
    -> Result<(), RepositoryError>;

    /// Gets a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the id is unknown.
    async fn get_session(&self, session_id: SessionId) -> Result<StoredSession, RepositoryError>;

    /// Lists all sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, RepositoryError>;
}

/// In-memory implementation of the session repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<SessionId, StoredSession>>>,
}

impl InMemorySessionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn update(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&mut StoredSession) -> Result<(), RepositoryError> + Send,
    ) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(RepositoryError::SessionNotFound { session_id })?;
        f(session)
    }
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create_session(&self) -> Result<SessionId, RepositoryError> {
        let session = StoredSession::new(SessionId::new());
        let id = session.id;
        self.sessions.write().await.insert(id, session);
        Ok(id)
    }

    async fn append_change(
        &self,
        session_id: SessionId,
        record: ChangeRecord,
    ) -> Result<(), RepositoryError> {
        self.update(session_id, |session| session.append(record))
            .await
    }

    async fn set_duration(
        &self,
        session_id: SessionId,
        duration: u64,
    ) -> Result<(), RepositoryError> {
        self.update(session_id, |session| session.seal(duration))
            .await
    }

    async fn get_session(&self, session_id: SessionId) -> Result<StoredSession, RepositoryError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(RepositoryError::SessionNotFound { session_id })
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> =
            sessions.values().map(StoredSession::summary).collect();
        summaries.sort_by_key(|summary| (summary.created_at, summary.id));
        Ok(summaries)
    }
}

/// File-backed repository: `<dir>/<session id>.json` per session.
///
/// Writes go to a temporary file that is then renamed over the document, so
/// a crash leaves either the previous or the new acknowledged state.
#[derive(Debug, Clone)]
pub struct FileSessionRepository {
    dir: PathBuf,
    // Serializes read-modify-write cycles; the single writer per session
    // still gets its writes persisted in order.
    write_lock: Arc<Mutex<()>>,
}

impl FileSessionRepository {
    /// Opens (and creates if needed) a repository rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| RepositoryError::storage(format!("create {}", dir.display()), e))?;
        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: SessionId) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    async fn load(&self, session_id: SessionId) -> Result<StoredSession, RepositoryError> {
        let path = self.path_for(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::SessionNotFound { session_id });
            }
            Err(e) => return Err(RepositoryError::storage(format!("read {}", path.display()), e)),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| RepositoryError::storage(format!("decode {}", path.display()), e))
    }

    async fn store(&self, session: &StoredSession) -> Result<(), RepositoryError> {
        let path = self.path_for(session.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(session)
            .map_err(|e| RepositoryError::storage("encode session", e))?;

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| RepositoryError::storage(format!("write {}", tmp.display()), e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| RepositoryError::storage(format!("rename {}", path.display()), e))
    }

    async fn update(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&mut StoredSession) -> Result<(), RepositoryError> + Send,
    ) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(session_id).await?;
        f(&mut session)?;
        self.store(&session).await
    }
}

#[async_trait::async_trait]
impl SessionRepository for FileSessionRepository {
    async fn create_session(&self) -> Result<SessionId, RepositoryError> {
        let session = StoredSession::new(SessionId::new());
        let _guard = self.write_lock.lock().await;
        self.store(&session).await?;
        tracing::debug!(session_id = %session.id, dir = %self.dir.display(), "Created session file");
        Ok(session.id)
    }

    async fn append_change(
        &self,
        session_id: SessionId,
        record: ChangeRecord,
    ) -> Result<(), RepositoryError> {
        self.update(session_id, |session| session.append(record))
            .await
    }

    async fn set_duration(
        &self,
        session_id: SessionId,
        duration: u64,
    ) -> Result<(), RepositoryError> {
        self.update(session_id, |session| session.seal(duration))
            .await
    }

    async fn get_session(&self, session_id: SessionId) -> Result<StoredSession, RepositoryError> {
        self.load(session_id).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| RepositoryError::storage(format!("list {}", self.dir.display()), e))?;

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepositoryError::storage(format!("list {}", self.dir.display()), e))?
        {
            let path = entry.path();
            let session_id = path
                .extension()
                .filter(|ext| *ext == "json")
                .and_then(|_| path.file_stem())
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<SessionId>().ok());

            match session_id {
                Some(session_id) => summaries.push(self.load(session_id).await?.summary()),
                None => tracing::trace!(path = %path.display(), "Skipping non-session file"),
            }
        }

        summaries.sort_by_key(|summary| (summary.created_at, summary.id));
        Ok(summaries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use reel_core::EditOperation;

    fn record(timestamp: u64) -> ChangeRecord {
        ChangeRecord::capture(timestamp, EditOperation::insert(1, 1, "x"), "").unwrap()
    }

    async fn exercise(repo: &dyn SessionRepository) {
        let id = repo.create_session().await.unwrap();
        repo.append_change(id, record(0)).await.unwrap();
        repo.append_change(id, record(1200)).await.unwrap();

        let stored = repo.get_session(id).await.unwrap();
        assert_eq!(stored.changes.len(), 2);
        assert_eq!(stored.duration, None);

        repo.set_duration(id, 3000).await.unwrap();
        let stored = repo.get_session(id).await.unwrap();
        assert_eq!(stored.duration, Some(3000));
        assert_eq!(
            stored.changes.iter().map(|c| c.timestamp).collect::<Vec<_>>(),
            vec![0, 1200]
        );

        assert_eq!(
            repo.append_change(id, record(3100)).await,
            Err(RepositoryError::SessionSealed { session_id: id })
        );
        assert_eq!(
            repo.set_duration(id, 4000).await,
            Err(RepositoryError::SessionSealed { session_id: id })
        );

        let listed = repo.list_sessions().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].change_count, 2);
    }

    #[tokio::test]
    async fn test_in_memory_repository_lifecycle() {
        exercise(&InMemorySessionRepository::new()).await;
    }

    #[tokio::test]
    async fn test_file_repository_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileSessionRepository::open(dir.path()).await.unwrap();
        exercise(&repo).await;
    }

    #[tokio::test]
    async fn test_file_repository_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = {
            let repo = FileSessionRepository::open(dir.path()).await.unwrap();
            let id = repo.create_session().await.unwrap();
            repo.append_change(id, record(10)).await.unwrap();
            id
        };

        let reopened = FileSessionRepository::open(dir.path()).await.unwrap();
        let stored = reopened.get_session(id).await.unwrap();
        assert_eq!(stored.changes, vec![record(10)]);
    }

    #[tokio::test]
    async fn test_file_document_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileSessionRepository::open(dir.path()).await.unwrap();
        let id = repo.create_session().await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(format!("{id}.json"))).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["id"], id.to_string());
        assert!(json["createdAt"].is_string());
        assert!(json["duration"].is_null());
        assert_eq!(json["changes"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let repo = InMemorySessionRepository::new();
        let id = SessionId::new();
        assert_eq!(
            repo.get_session(id).await,
            Err(RepositoryError::SessionNotFound { session_id: id })
        );
        assert_eq!(
            repo.append_change(id, record(0)).await,
            Err(RepositoryError::SessionNotFound { session_id: id })
        );
    }

    #[tokio::test]
    async fn test_rejects_timestamp_regression_and_batches() {
        let repo = InMemorySessionRepository::new();
        let id = repo.create_session().await.unwrap();
        repo.append_change(id, record(500)).await.unwrap();

        assert_eq!(
            repo.append_change(id, record(400)).await,
            Err(RepositoryError::TimestampRegression {
                session_id: id,
                previous: 500,
                timestamp: 400
            })
        );

        let mut batch = record(600);
        batch.changes.push(EditOperation::insert(1, 1, "y"));
        assert!(matches!(
            repo.append_change(id, batch).await,
            Err(RepositoryError::InvalidRecord { .. })
        ));
        assert_eq!(repo.get_session(id).await.unwrap().changes.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_timestamp_past_timeline() {
        let repo = InMemorySessionRepository::new();
        let id = repo.create_session().await.unwrap();
        repo.append_change(id, record(0)).await.unwrap();

        assert!(matches!(
            repo.append_change(id, record(u64::MAX)).await,
            Err(RepositoryError::InvalidRecord { .. })
        ));
        assert_eq!(repo.get_session(id).await.unwrap().changes.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_duration_before_last_change() {
        let repo = InMemorySessionRepository::new();
        let id = repo.create_session().await.unwrap();
        repo.append_change(id, record(2500)).await.unwrap();

        assert!(matches!(
            repo.set_duration(id, 2000).await,
            Err(RepositoryError::InvalidDuration { duration: 2000, .. })
        ));
        assert!(matches!(
            repo.set_duration(id, u64::MAX).await,
            Err(RepositoryError::InvalidDuration { .. })
        ));
        assert_eq!(repo.get_session(id).await.unwrap().duration, None);

        repo.set_duration(id, 2500).await.unwrap();
        assert_eq!(repo.get_session(id).await.unwrap().duration, Some(2500));
    }
}
