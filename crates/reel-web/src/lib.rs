//! Reel session store
//!
//! Accepts recordings over two WebSocket channels and serves them back:
//!
//! - `/editor/ws`: text session protocol (`start`, `change <json>`, `duration <ms>`)
//! - `/editor/video/ws`: `start <id>` followed by opaque binary video chunks
//! - `/api/editor/sessions/{id}`: the recorded change log as JSON
//!
//! HTTP errors are rendered as RFC 7807 problem details.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod error;
pub mod media;
pub mod repository;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;

pub use config::{ConfigError, ServerConfig, StorageKind};
pub use error::{AppError, ErrorResponse};
pub use media::{MEDIA_EXTENSION, MediaStore, MediaWriter};
pub use repository::{
    FileSessionRepository, InMemorySessionRepository, RepositoryError, SessionRepository,
    SessionSummary, StoredSession,
};
pub use routes::{SESSION_SOCKET_PATH, VIDEO_SOCKET_PATH};
pub use server::{create_app, run_server};
pub use session::{ProtocolError, SessionHandle, handle_frame};
pub use state::AppState;

/// Web server errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] ::axum::http::header::InvalidHeaderValue),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] ::axum::http::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage error
    #[error("Storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::convert::Infallible> for Error {
    fn from(value: std::convert::Infallible) -> Self {
        match value {}
    }
}

impl From<axum::Error> for Error {
    fn from(value: axum::Error) -> Self {
        Self::Io(std::io::Error::other(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use reel_core::{ChangeRecord, EditOperation, SessionId};
    use tower::ServiceExt;

    /// Helper to build a test request with proper error handling.
    fn build_test_request(
        uri: &str,
        method: Option<Method>,
        headers: Vec<(&str, &str)>,
    ) -> Result<Request<Body>, Error> {
        let mut builder = Request::builder();
        if let Some(m) = method {
            builder = builder.method(m);
        }
        builder = builder.uri(uri);
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder.body(Body::empty()).map_err(Error::from)
    }

    fn test_app(state: AppState) -> Result<Router, Error> {
        create_app(&ServerConfig::default(), state)
    }

    async fn body_json(response: axum::response::Response) -> Result<serde_json::Value, Error> {
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn test_health_check_endpoint() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let router = test_app(AppState::in_memory(dir.path()))?;

        let response = router
            .oneshot(build_test_request("/health", None, Vec::new())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await?.to_bytes();
        assert_eq!(&body[..], b"OK");
        Ok(())
    }

    #[test]
    fn test_create_app_with_invalid_origin() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            cors_origin: "invalid\0origin".to_string(),
            ..ServerConfig::default()
        };
        let result = create_app(&config, AppState::in_memory(dir.path()));
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_cors_headers_present() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let router = test_app(AppState::in_memory(dir.path()))?;

        let request = build_test_request(
            "/health",
            Some(Method::OPTIONS),
            vec![
                ("Origin", "http://localhost:5173"),
                ("Access-Control-Request-Method", "GET"),
            ],
        )?;
        let response = router.oneshot(request).await?;

        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin"),
            "CORS origin header should be present"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_get_session_returns_change_log() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let state = AppState::in_memory(dir.path());
        let id = state.repository.create_session().await?;
        state
            .repository
            .append_change(id, ChangeRecord::initial("hi").map_err(RepositoryError::from)?)
            .await?;
        state
            .repository
            .append_change(
                id,
                ChangeRecord::capture(250, EditOperation::insert(1, 3, "!"), "hi")
                    .map_err(RepositoryError::from)?,
            )
            .await?;
        state.repository.set_duration(id, 1200).await?;

        let response = test_app(state)?
            .oneshot(build_test_request(
                &format!("/api/editor/sessions/{id}"),
                None,
                Vec::new(),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await?;
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["duration"], 1200);
        assert_eq!(json["changes"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["changes"][1]["timestamp"], 250);
        assert_eq!(json["changes"][1]["changes"][0]["text"], "!");
        assert_eq!(
            json["changes"][1]["invertedChanges"][0]["range"]["endColumn"],
            4
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unsealed_session_has_null_duration() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let state = AppState::in_memory(dir.path());
        let id = state.repository.create_session().await?;

        let response = test_app(state)?
            .oneshot(build_test_request(
                &format!("/api/editor/sessions/{id}"),
                None,
                Vec::new(),
            )?)
            .await?;

        let json = body_json(response).await?;
        assert!(json["duration"].is_null());
        assert_eq!(json["changes"], serde_json::json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_session_is_problem_document() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let router = test_app(AppState::in_memory(dir.path()))?;

        let response = router
            .oneshot(build_test_request(
                &format!("/api/editor/sessions/{}", SessionId::new()),
                None,
                Vec::new(),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await?;
        assert_eq!(json["status"], 404);
        assert_eq!(json["title"], "Not Found");
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_session_id_is_bad_request() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let router = test_app(AppState::in_memory(dir.path()))?;

        let response = router
            .oneshot(build_test_request(
                "/api/editor/sessions/not-a-ulid",
                None,
                Vec::new(),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_sessions() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let state = AppState::in_memory(dir.path());
        let first = state.repository.create_session().await?;
        let second = state.repository.create_session().await?;
        state.repository.set_duration(first, 10).await?;

        let response = test_app(state)?
            .oneshot(build_test_request("/api/editor/sessions", None, Vec::new())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await?;
        let ids: Vec<String> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.to_string()));
        assert!(ids.contains(&second.to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_media_is_served() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let state = AppState::in_memory(dir.path());
        let id = state.repository.create_session().await?;
        let mut writer = state.media.open_writer(id).await?;
        writer.append(b"webm-bytes").await?;
        writer.finish().await?;

        let response = test_app(state)?
            .oneshot(build_test_request(
                &format!("/media/{id}.webm"),
                None,
                Vec::new(),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await?.to_bytes();
        assert_eq!(&body[..], b"webm-bytes");
        Ok(())
    }

    #[tokio::test]
    async fn test_router_not_found() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let router = test_app(AppState::in_memory(dir.path()))?;

        let response = router
            .oneshot(build_test_request("/nonexistent", None, Vec::new())?)
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
