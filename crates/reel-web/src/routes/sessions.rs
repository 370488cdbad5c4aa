//! Session read API: GET /api/editor/sessions, GET /api/editor/sessions/{id}

use axum::{
    extract::{Path, State},
    response::Json,
};
use reel_core::{Session, SessionId};

use crate::error::{AppError, Result};
use crate::repository::SessionSummary;
use crate::state::AppState;

/// GET /api/editor/sessions/{id} - Session with its full change log
///
/// A session that is still recording is returned with a `null` duration.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>> {
    let session_id: SessionId = id
        .parse()
        .map_err(|e: reel_core::Error| AppError::BadRequest(e.to_string()))?;

    let stored = state.repository.get_session(session_id).await?;
    tracing::debug!(
        session_id = %session_id,
        changes = stored.changes.len(),
        "Serving session"
    );
    Ok(Json(stored.to_session()))
}

/// GET /api/editor/sessions - Summaries of all stored sessions
pub async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<SessionSummary>>> {
    let sessions = state.repository.list_sessions().await?;
    Ok(Json(sessions))
}
