//! HTTP and socket routes
//!
//! ## Route Structure
//!
//! - `GET /health` - Liveness probe
//! - `GET /api/editor/sessions` - List stored sessions
//! - `GET /api/editor/sessions/{id}` - Fetch one session with its change log
//! - `GET /editor/ws` - Session channel (text frames)
//! - `GET /editor/video/ws` - Video channel (`start <id>` then binary chunks)

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod editor_ws;
pub mod health;
pub mod sessions;
pub mod video_ws;

/// Path of the session channel.
pub const SESSION_SOCKET_PATH: &str = "/editor/ws";

/// Path of the video channel.
pub const VIDEO_SOCKET_PATH: &str = "/editor/video/ws";

/// Create the application router.
///
/// Middleware and static media serving are layered on in `server.rs`.
pub fn create_router() -> Router<AppState> {
    let api_routes = Router::new()
        .route("/editor/sessions", get(sessions::list_sessions))
        .route("/editor/sessions/{id}", get(sessions::get_session));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .route(SESSION_SOCKET_PATH, get(editor_ws::session_socket_handler))
        .route(VIDEO_SOCKET_PATH, get(video_ws::video_socket_handler))
}
